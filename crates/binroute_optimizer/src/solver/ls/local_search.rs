use binroute_matrix_providers::cost_matrix::Cost;
use rand::{Rng, seq::SliceRandom};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::solver::{
    ls::{
        insert_unassigned::InsertUnassignedOperator,
        inter_relocate::InterRelocateOperator,
        inter_swap::InterSwapOperator,
        r#move::{ArcCost, LocalSearchMove, LocalSearchOperator},
        relocate::RelocateOperator,
        two_opt::TwoOptOperator,
    },
    score::RUN_SCORE_ASSERTIONS,
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

type RoutePair = (RouteIdx, RouteIdx);

/// Best candidates found for one route pair.
#[derive(Default)]
struct PairMoves {
    /// Cheapest feasible insertion of an unassigned pickup, whatever its cost
    insertion: Option<(Cost, LocalSearchMove)>,
    /// Best feasible move with a strictly negative delta
    improvement: Option<(Cost, LocalSearchMove)>,
}

/// Best-improvement local search over every ordered pair of routes.
///
/// The best move of each pair is kept until one of the two routes changes, so an iteration
/// only rescans the pairs touched by the previous move.
pub struct LocalSearch {
    pairs: Vec<RoutePair>,
    best_moves: Vec<Option<PairMoves>>,
}

impl LocalSearch {
    /// `rng` shuffles the scan order, which decides between moves of equal delta.
    pub fn new(num_routes: usize, rng: &mut impl Rng) -> Self {
        let mut pairs = RouteIdx::range(num_routes)
            .flat_map(|r1| RouteIdx::range(num_routes).map(move |r2| (r1, r2)))
            .collect::<Vec<_>>();
        pairs.shuffle(rng);

        let best_moves = pairs.iter().map(|_| None).collect();

        LocalSearch { pairs, best_moves }
    }

    /// Forgets every cached move, needed whenever the arc costs change.
    pub fn invalidate_all(&mut self) {
        self.best_moves.iter_mut().for_each(|best| *best = None);
    }

    fn invalidate_routes(&mut self, routes: &[RouteIdx]) {
        for (&(r1, r2), best) in self.pairs.iter().zip(self.best_moves.iter_mut()) {
            if routes.contains(&r1) || routes.contains(&r2) {
                *best = None;
            }
        }
    }

    /// Applies the best move of the neighborhood and returns it, `None` at a local optimum.
    ///
    /// Inserting an unassigned pickup always wins over cost moves, the cheapest insertion
    /// is applied even when it increases the cost.
    #[instrument(skip_all, level = "debug")]
    pub fn run_iteration<A>(
        &mut self,
        solution: &mut WorkingSolution,
        costs: &A,
    ) -> Option<LocalSearchMove>
    where
        A: ArcCost,
    {
        self.refresh_best_moves(solution, costs);

        let index = self
            .select_insertion()
            .or_else(|| self.select_improvement())?;

        let best = self.best_moves[index].take()?;
        let (delta, op) = match best {
            PairMoves {
                insertion: Some(insertion),
                ..
            } => insertion,
            PairMoves {
                improvement: Some(improvement),
                ..
            } => improvement,
            _ => return None,
        };

        debug!(
            "Apply {} {:?} (d={}) {:?}",
            op.operator_name(),
            self.pairs[index],
            delta,
            op
        );

        if RUN_SCORE_ASSERTIONS {
            if !op.is_valid(solution) {
                tracing::error!(?op, "Operator {} is not valid", op.operator_name());
                panic!("Stored operator is not valid")
            }

            let cost_before = solution.total_cost();
            let real_delta = op.cost_delta(solution, solution.problem());

            op.apply(solution);

            assert_eq!(
                cost_before + real_delta,
                solution.total_cost(),
                "Cost deviation detected for operator {}, delta does not match the cost after apply",
                op.operator_name(),
            );

            for route in solution.routes() {
                assert!(
                    route.load().fits_within(route.capacity()),
                    "Operator {} overloaded vehicle {}",
                    op.operator_name(),
                    route.vehicle_id()
                );
            }
        } else {
            op.apply(solution);
        }

        if op.is_insertion() {
            // The unassigned set changed, every cached insertion is stale
            self.invalidate_all();
        } else {
            self.invalidate_routes(&op.updated_routes());
        }

        Some(op)
    }

    fn refresh_best_moves<A>(&mut self, solution: &WorkingSolution, costs: &A)
    where
        A: ArcCost,
    {
        let stale = self
            .best_moves
            .iter()
            .enumerate()
            .filter(|(_, best)| best.is_none())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if stale.is_empty() {
            return;
        }

        let results = stale
            .par_iter()
            .map(|&index| (index, find_pair_moves(solution, costs, self.pairs[index])))
            .collect::<Vec<_>>();

        for (index, moves) in results {
            self.best_moves[index] = Some(moves);
        }
    }

    fn select_insertion(&self) -> Option<usize> {
        self.select(|moves| moves.insertion.as_ref().map(|(delta, _)| *delta))
    }

    fn select_improvement(&self) -> Option<usize> {
        self.select(|moves| moves.improvement.as_ref().map(|(delta, _)| *delta))
    }

    /// Index of the pair with the smallest delta, the first one in scan order on ties.
    fn select<F>(&self, delta: F) -> Option<usize>
    where
        F: Fn(&PairMoves) -> Option<Cost>,
    {
        let mut best: Option<(usize, Cost)> = None;

        for (index, moves) in self.best_moves.iter().enumerate() {
            let Some(candidate) = moves.as_ref().and_then(|moves| delta(moves)) else {
                continue;
            };

            if best.is_none_or(|(_, best_delta)| candidate < best_delta) {
                best = Some((index, candidate));
            }
        }

        best.map(|(index, _)| index)
    }
}

fn find_pair_moves<A>(solution: &WorkingSolution, costs: &A, pair: RoutePair) -> PairMoves
where
    A: ArcCost,
{
    let mut moves = PairMoves::default();

    let mut best_insertion = Cost::MAX;
    InsertUnassignedOperator::generate_moves(solution, pair, |op| {
        let delta = op.cost_delta(solution, costs);
        if delta < best_insertion && op.is_valid(solution) {
            best_insertion = delta;
            moves.insertion = Some((delta, LocalSearchMove::InsertUnassigned(op)));
        }
    });

    let mut best_delta: Cost = 0;

    RelocateOperator::generate_moves(solution, pair, |op| {
        let delta = op.cost_delta(solution, costs);
        if delta < best_delta && op.is_valid(solution) {
            best_delta = delta;
            moves.improvement = Some((delta, LocalSearchMove::Relocate(op)));
        }
    });

    TwoOptOperator::generate_moves(solution, pair, |op| {
        let delta = op.cost_delta(solution, costs);
        if delta < best_delta && op.is_valid(solution) {
            best_delta = delta;
            moves.improvement = Some((delta, LocalSearchMove::TwoOpt(op)));
        }
    });

    InterRelocateOperator::generate_moves(solution, pair, |op| {
        let delta = op.cost_delta(solution, costs);
        if delta < best_delta && op.is_valid(solution) {
            best_delta = delta;
            moves.improvement = Some((delta, LocalSearchMove::InterRelocate(op)));
        }
    });

    InterSwapOperator::generate_moves(solution, pair, |op| {
        let delta = op.cost_delta(solution, costs);
        if delta < best_delta && op.is_valid(solution) {
            best_delta = delta;
            moves.improvement = Some((delta, LocalSearchMove::InterSwap(op)));
        }
    });

    moves
}
