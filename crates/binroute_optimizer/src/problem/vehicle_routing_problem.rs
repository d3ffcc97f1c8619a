use binroute_matrix_providers::cost_matrix::{Cost, CostMatrix};
use fxhash::FxHashSet;

use crate::error::InputError;

use super::{
    amount::{Amount, MAX_AMOUNT},
    location::{DEPOT, Location, LocationIdx, is_valid_coordinates},
    vehicle::{Vehicle, VehicleIdx},
};

/// Normalized input of a single solve. Location 0 is the depot, locations `1..n` are
/// the pickups in input order.
pub struct VehicleRoutingProblem {
    locations: Vec<Location>,
    vehicles: Vec<Vehicle>,
    travel_costs: CostMatrix,
    symmetric: bool,
    max_capacity: Amount,
}

impl VehicleRoutingProblem {
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, location_id: LocationIdx) -> &Location {
        &self.locations[location_id]
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn depot(&self) -> LocationIdx {
        DEPOT
    }

    pub fn pickups_iter(&self) -> impl DoubleEndedIterator<Item = LocationIdx> + Clone {
        LocationIdx::range(self.locations.len()).skip(1)
    }

    pub fn num_pickups(&self) -> usize {
        self.locations.len().saturating_sub(1)
    }

    pub fn demand(&self, location_id: LocationIdx) -> Amount {
        self.locations[location_id].demand()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn max_capacity(&self) -> Amount {
        self.max_capacity
    }

    #[inline(always)]
    pub fn travel_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost {
        self.travel_costs.cost(from.get(), to.get())
    }

    pub fn travel_costs(&self) -> &CostMatrix {
        &self.travel_costs
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Cost of `depot -> stops... -> depot`, zero for an empty route.
    pub fn route_cost(&self, stops: &[LocationIdx]) -> Cost {
        let (Some(&first), Some(&last)) = (stops.first(), stops.last()) else {
            return 0;
        };

        self.travel_cost(DEPOT, first)
            + stops
                .windows(2)
                .map(|pair| self.travel_cost(pair[0], pair[1]))
                .sum::<Cost>()
            + self.travel_cost(last, DEPOT)
    }
}

struct PickupInput {
    id: String,
    lat: f64,
    lon: f64,
    demand: f64,
}

struct VehicleInput {
    id: String,
    capacity: f64,
}

/// Collects raw pickups and vehicles and validates them into a [`VehicleRoutingProblem`].
///
/// [`VehicleRoutingProblemBuilder::check_input`] validates everything but the cost matrix,
/// so callers can reject a request before paying for a matrix.
#[derive(Default)]
pub struct VehicleRoutingProblemBuilder {
    depot: Option<(f64, f64)>,
    pickups: Vec<PickupInput>,
    vehicles: Vec<VehicleInput>,
    travel_costs: Option<CostMatrix>,
}

impl VehicleRoutingProblemBuilder {
    pub fn set_depot(&mut self, lat: f64, lon: f64) -> &mut VehicleRoutingProblemBuilder {
        self.depot = Some((lat, lon));
        self
    }

    pub fn add_pickup(
        &mut self,
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        demand: f64,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.pickups.push(PickupInput {
            id: id.into(),
            lat,
            lon,
            demand,
        });
        self
    }

    pub fn add_vehicle(
        &mut self,
        id: impl Into<String>,
        capacity: f64,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.vehicles.push(VehicleInput {
            id: id.into(),
            capacity,
        });
        self
    }

    pub fn set_travel_costs(
        &mut self,
        travel_costs: CostMatrix,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.travel_costs = Some(travel_costs);
        self
    }

    pub fn num_pickups(&self) -> usize {
        self.pickups.len()
    }

    /// Validated locations, the depot first and then the pickups in input order.
    pub fn locations(&self) -> Result<Vec<Location>, InputError> {
        self.check_input()?;

        let (depot_lat, depot_lon) = self.depot.ok_or(InputError::MissingDepot)?;

        let mut locations = Vec::with_capacity(self.pickups.len() + 1);
        locations.push(Location::depot(depot_lat, depot_lon));

        for pickup in &self.pickups {
            let demand = Amount::from_demand(pickup.demand).ok_or(InputError::InvalidDemand {
                id: pickup.id.clone(),
                demand: pickup.demand,
            })?;

            locations.push(Location::new(
                pickup.id.clone(),
                pickup.lat,
                pickup.lon,
                pickup.demand,
                demand,
            ));
        }

        Ok(locations)
    }

    pub fn check_input(&self) -> Result<(), InputError> {
        let (lat, lon) = self.depot.ok_or(InputError::MissingDepot)?;
        if !is_valid_coordinates(lat, lon) {
            return Err(InputError::InvalidCoordinates {
                id: "depot".to_owned(),
                latitude: lat,
                longitude: lon,
            });
        }

        let mut ids = FxHashSet::default();
        for pickup in &self.pickups {
            if !is_valid_coordinates(pickup.lat, pickup.lon) {
                return Err(InputError::InvalidCoordinates {
                    id: pickup.id.clone(),
                    latitude: pickup.lat,
                    longitude: pickup.lon,
                });
            }

            check_amount_range(&pickup.id, pickup.demand)?;
            if Amount::from_demand(pickup.demand).is_none() {
                return Err(InputError::InvalidDemand {
                    id: pickup.id.clone(),
                    demand: pickup.demand,
                });
            }

            if !ids.insert(pickup.id.as_str()) {
                return Err(InputError::DuplicatePickupId {
                    id: pickup.id.clone(),
                });
            }
        }

        if self.vehicles.is_empty() {
            return Err(InputError::NoVehicles);
        }

        let mut max_capacity = Amount::ZERO;
        let mut max_raw_capacity = 0.0_f64;
        for vehicle in &self.vehicles {
            check_amount_range(&vehicle.id, vehicle.capacity)?;
            let capacity =
                Amount::from_capacity(vehicle.capacity).ok_or_else(|| InputError::InvalidCapacity {
                    id: vehicle.id.clone(),
                    capacity: vehicle.capacity,
                })?;

            max_capacity = max_capacity.max(capacity);
            max_raw_capacity = max_raw_capacity.max(vehicle.capacity);
        }

        // Checked against the largest vehicle: a pickup no vehicle can carry alone
        // can never be served.
        for pickup in &self.pickups {
            if let Some(demand) = Amount::from_demand(pickup.demand)
                && !demand.fits_within(max_capacity)
            {
                return Err(InputError::DemandExceedsCapacity {
                    id: pickup.id.clone(),
                    demand: pickup.demand,
                    max_capacity: max_raw_capacity,
                });
            }
        }

        Ok(())
    }

    pub fn build(self) -> Result<VehicleRoutingProblem, InputError> {
        let locations = self.locations()?;

        let travel_costs = self
            .travel_costs
            .ok_or(InputError::MatrixDimensionMismatch {
                expected: locations.len(),
                actual: 0,
            })?;

        if travel_costs.num_locations() != locations.len() {
            return Err(InputError::MatrixDimensionMismatch {
                expected: locations.len(),
                actual: travel_costs.num_locations(),
            });
        }

        let vehicles = self
            .vehicles
            .into_iter()
            .map(|vehicle| {
                let capacity = Amount::from_capacity(vehicle.capacity).ok_or_else(|| {
                    InputError::InvalidCapacity {
                        id: vehicle.id.clone(),
                        capacity: vehicle.capacity,
                    }
                })?;

                Ok::<_, InputError>(Vehicle::new(vehicle.id, capacity))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let max_capacity = vehicles
            .iter()
            .map(|vehicle| vehicle.capacity())
            .max()
            .unwrap_or(Amount::ZERO);

        Ok(VehicleRoutingProblem {
            locations,
            vehicles,
            symmetric: travel_costs.is_symmetric(),
            travel_costs,
            max_capacity,
        })
    }
}

fn check_amount_range(id: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value > MAX_AMOUNT {
        return Err(InputError::AmountOutOfRange {
            id: id.to_owned(),
            value,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> VehicleRoutingProblemBuilder {
        let mut builder = VehicleRoutingProblemBuilder::default();
        builder
            .set_depot(5.6, -0.18)
            .add_pickup("bin-1", 5.61, -0.18, 40.0)
            .add_pickup("bin-2", 5.62, -0.18, 12.5)
            .add_vehicle("truck-1", 100.0)
            .add_vehicle("truck-2", 50.0);
        builder
    }

    fn matrix(n: usize) -> CostMatrix {
        CostMatrix::from_flat(
            (0..n * n)
                .map(|i| if i / n == i % n { 0 } else { 10 })
                .collect(),
            n,
        )
    }

    #[test]
    fn test_build_problem() {
        let mut builder = builder();
        builder.set_travel_costs(matrix(3));
        let problem = builder.build().unwrap();

        assert_eq!(problem.num_locations(), 3);
        assert_eq!(problem.num_pickups(), 2);
        assert_eq!(problem.demand(DEPOT), Amount::ZERO);
        assert_eq!(problem.demand(LocationIdx::new(2)), Amount::from_units(12_500));
        assert_eq!(problem.max_capacity(), Amount::from_units(100_000));
        assert_eq!(problem.location(LocationIdx::new(1)).external_id(), "bin-1");
        assert_eq!(
            problem.pickups_iter().collect::<Vec<_>>(),
            vec![LocationIdx::new(1), LocationIdx::new(2)]
        );
        assert_eq!(
            problem.route_cost(&[LocationIdx::new(1), LocationIdx::new(2)]),
            30
        );
        assert_eq!(problem.route_cost(&[]), 0);
    }

    #[test]
    fn test_locations_start_with_depot() {
        let locations = builder().locations().unwrap();

        assert_eq!(locations.len(), 3);
        assert_eq!(geo::Point::from(&locations[0]), geo::Point::new(-0.18, 5.6));
        assert_eq!(locations[0].demand(), Amount::ZERO);
        assert_eq!(locations[2].raw_demand(), 12.5);
    }

    #[test]
    fn test_no_vehicles() {
        let mut builder = VehicleRoutingProblemBuilder::default();
        builder.set_depot(0.0, 0.0).add_pickup("a", 0.0, 0.1, 1.0);

        assert_eq!(builder.check_input(), Err(InputError::NoVehicles));
    }

    #[test]
    fn test_demand_checked_against_largest_vehicle() {
        let mut builder = builder();
        builder.add_pickup("big", 5.6, -0.2, 75.0);
        assert!(builder.check_input().is_ok());

        builder.add_pickup("huge", 5.6, -0.2, 100.5);
        assert_eq!(
            builder.check_input(),
            Err(InputError::DemandExceedsCapacity {
                id: "huge".to_owned(),
                demand: 100.5,
                max_capacity: 100.0
            })
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let mut negative = builder();
        negative.add_pickup("neg", 5.6, -0.2, -1.0);
        assert!(matches!(
            negative.check_input(),
            Err(InputError::InvalidDemand { .. })
        ));

        let mut capacity = builder();
        capacity.add_vehicle("empty", 0.0);
        assert!(matches!(
            capacity.check_input(),
            Err(InputError::InvalidCapacity { .. })
        ));

        let mut coordinates = builder();
        coordinates.add_pickup("far", 95.0, 0.0, 1.0);
        assert!(matches!(
            coordinates.check_input(),
            Err(InputError::InvalidCoordinates { .. })
        ));

        let mut duplicate = builder();
        duplicate.add_pickup("bin-1", 5.6, -0.2, 1.0);
        assert!(matches!(
            duplicate.check_input(),
            Err(InputError::DuplicatePickupId { .. })
        ));

        assert_eq!(
            VehicleRoutingProblemBuilder::default().check_input(),
            Err(InputError::MissingDepot)
        );
    }

    #[test]
    fn test_huge_amounts_are_rejected() {
        let mut builder = VehicleRoutingProblemBuilder::default();
        builder
            .set_depot(0.0, 0.0)
            .add_pickup("a", 0.0, 0.1, 1e16)
            .add_pickup("b", 0.0, 0.2, 1e16)
            .add_pickup("c", 0.0, 0.3, 1e16)
            .add_vehicle("truck", 1e17);

        assert_eq!(
            builder.check_input(),
            Err(InputError::AmountOutOfRange {
                id: "a".to_owned(),
                value: 1e16,
                max: MAX_AMOUNT
            })
        );

        let mut capacity = VehicleRoutingProblemBuilder::default();
        capacity
            .set_depot(0.0, 0.0)
            .add_pickup("a", 0.0, 0.1, 10.0)
            .add_vehicle("truck", 1e17);
        assert!(matches!(
            capacity.check_input(),
            Err(InputError::AmountOutOfRange { ref id, .. }) if id == "truck"
        ));
    }

    #[test]
    fn test_matrix_dimension_mismatch() {
        let mut builder = builder();
        builder.set_travel_costs(matrix(2));

        assert!(matches!(
            builder.build(),
            Err(InputError::MatrixDimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
