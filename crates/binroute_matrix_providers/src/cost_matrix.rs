use serde::{Deserialize, Serialize};

/// Travel cost between two locations, in meters.
pub type Cost = i64;

/// Cost used when a provider knows no route between two locations.
/// Large enough to make the arc undesirable, small enough to keep sums bounded.
pub const NO_ROUTE_COST: Cost = 999_999_999;

/// Square cost matrix stored as a flat row-major vector.
/// The cost of `from -> to` lives at `from * num_locations + to`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "RawCostMatrix")]
pub struct CostMatrix {
    costs: Vec<Cost>,
    num_locations: usize,
}

#[derive(Deserialize)]
struct RawCostMatrix {
    costs: Vec<Cost>,
    num_locations: usize,
}

impl TryFrom<RawCostMatrix> for CostMatrix {
    type Error = String;

    fn try_from(raw: RawCostMatrix) -> Result<Self, Self::Error> {
        check_flat(&raw.costs, raw.num_locations)?;
        Ok(CostMatrix {
            costs: raw.costs,
            num_locations: raw.num_locations,
        })
    }
}

fn check_flat(costs: &[Cost], num_locations: usize) -> Result<(), String> {
    if costs.len() != num_locations * num_locations {
        return Err(format!(
            "cost matrix has {} entries, expected {}x{}",
            costs.len(),
            num_locations,
            num_locations
        ));
    }

    for from in 0..num_locations {
        for to in 0..num_locations {
            let cost = costs[from * num_locations + to];
            if cost < 0 {
                return Err(format!("negative cost {cost} from {from} to {to}"));
            }

            if from == to && cost != 0 {
                return Err(format!("non-zero diagonal cost {cost} at {from}"));
            }
        }
    }

    Ok(())
}

impl CostMatrix {
    /// Builds a matrix from rows.
    ///
    /// Panics when the rows are not square, contain a negative cost or have a
    /// non-zero diagonal: providers must never produce such a matrix.
    pub fn from_rows(rows: Vec<Vec<Cost>>) -> Self {
        let num_locations = rows.len();
        assert!(
            rows.iter().all(|row| row.len() == num_locations),
            "cost matrix must be square"
        );

        Self::from_flat(rows.into_iter().flatten().collect(), num_locations)
    }

    /// Fallible version of [`CostMatrix::from_rows`] for matrices coming from user input.
    pub fn try_from_rows(rows: Vec<Vec<Cost>>) -> Result<Self, String> {
        let num_locations = rows.len();
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_locations)
        {
            return Err(format!(
                "row {index} has {} entries, expected {num_locations}",
                row.len()
            ));
        }

        let costs: Vec<Cost> = rows.into_iter().flatten().collect();
        check_flat(&costs, num_locations)?;

        Ok(CostMatrix {
            costs,
            num_locations,
        })
    }

    /// Builds a matrix from a flat row-major vector. Same panics as [`CostMatrix::from_rows`].
    pub fn from_flat(costs: Vec<Cost>, num_locations: usize) -> Self {
        if let Err(message) = check_flat(&costs, num_locations) {
            panic!("invalid cost matrix: {message}");
        }

        CostMatrix {
            costs,
            num_locations,
        }
    }

    pub fn empty() -> Self {
        CostMatrix {
            costs: Vec::new(),
            num_locations: 0,
        }
    }

    #[inline(always)]
    pub fn cost(&self, from: usize, to: usize) -> Cost {
        self.costs[from * self.num_locations + to]
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.num_locations)
            .all(|i| (i + 1..self.num_locations).all(|j| self.cost(i, j) == self.cost(j, i)))
    }

    pub fn has_missing_routes(&self) -> bool {
        self.costs.contains(&NO_ROUTE_COST)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cost]> {
        self.costs.chunks(self.num_locations.max(1))
    }
}
