use binroute_matrix_providers::cost_matrix::Cost;
use fixedbitset::FixedBitSet;
use tracing::error;

use crate::{
    error::InvariantViolation,
    problem::{
        amount::Amount, location::LocationIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::solution::working_solution::WorkingSolution,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRoute {
    pub vehicle_id: VehicleIdx,
    pub stops: Vec<LocationIdx>,
    pub load: Amount,
    pub cost: Cost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSolution {
    /// Non-empty routes only, in vehicle order
    pub routes: Vec<ExtractedRoute>,
    pub unassigned: Vec<LocationIdx>,
    pub total_cost: Cost,
}

impl ExtractedSolution {
    pub fn is_partial(&self) -> bool {
        !self.unassigned.is_empty()
    }
}

/// Checks the routing invariants from scratch, without trusting the cached route loads.
///
/// Every pickup is either routed exactly once or unassigned, the depot is never a stop,
/// and no vehicle carries more than its capacity.
pub fn validate_solution(solution: &WorkingSolution) -> Result<(), InvariantViolation> {
    let problem = solution.problem();
    let result = check_invariants(problem, solution);

    if let Err(violation) = &result {
        error!(%violation, "Solution failed validation");
    }

    result
}

fn check_invariants(
    problem: &VehicleRoutingProblem,
    solution: &WorkingSolution,
) -> Result<(), InvariantViolation> {
    let mut seen = FixedBitSet::with_capacity(problem.num_locations());

    for route in solution.routes() {
        let mut load = Amount::ZERO;

        for &location in route.stops() {
            if location == problem.depot() {
                return Err(InvariantViolation::DepotAsStop {
                    vehicle: route.vehicle_id(),
                });
            }

            if location.get() >= problem.num_locations() {
                return Err(InvariantViolation::UnknownLocation {
                    vehicle: route.vehicle_id(),
                    location,
                });
            }

            if seen.put(location.get()) || solution.is_unassigned(location) {
                return Err(InvariantViolation::DuplicateStop { location });
            }

            load += problem.demand(location);
        }

        let capacity = problem.vehicle(route.vehicle_id()).capacity();
        if !load.fits_within(capacity) {
            return Err(InvariantViolation::CapacityExceeded {
                vehicle: route.vehicle_id(),
                load,
                capacity,
            });
        }
    }

    for location in problem.pickups_iter() {
        if !seen.contains(location.get()) && !solution.is_unassigned(location) {
            return Err(InvariantViolation::MissingLocation { location });
        }
    }

    Ok(())
}

/// Validates the solution and converts it to its final shape.
pub fn extract_solution(solution: &WorkingSolution) -> Result<ExtractedSolution, InvariantViolation> {
    validate_solution(solution)?;

    let routes = solution
        .non_empty_routes_iter()
        .map(|route| ExtractedRoute {
            vehicle_id: route.vehicle_id(),
            stops: route.stops().to_vec(),
            load: route.load(),
            cost: route.cost(),
        })
        .collect::<Vec<_>>();

    Ok(ExtractedSolution {
        total_cost: routes.iter().map(|route| route.cost).sum(),
        unassigned: solution.unassigned_iter().collect(),
        routes,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        error::InvariantViolation,
        problem::{
            amount::Amount, location::LocationIdx, vehicle::VehicleIdx,
            vehicle_routing_problem::VehicleRoutingProblem,
        },
        solver::{
            extract::{extract_solution, validate_solution},
            solution::route_id::RouteIdx,
        },
        test_utils::{self, TestRoute, location_ids},
    };

    fn problem() -> Arc<VehicleRoutingProblem> {
        Arc::new(test_utils::create_line_problem(
            &[10, 20, 30],
            &[40.0, 40.0, 40.0],
            &[100.0, 100.0],
        ))
    }

    #[test]
    fn test_extract_partial_solution() {
        let problem = problem();
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 1,
                stops: vec![1, 2],
            }],
        );

        let extracted = extract_solution(&solution).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        assert_eq!(extracted.routes[0].vehicle_id, VehicleIdx::new(1));
        assert_eq!(extracted.routes[0].stops, location_ids(&[1, 2]));
        assert_eq!(extracted.routes[0].load, Amount::from_units(80_000));
        assert_eq!(extracted.unassigned, location_ids(&[3]));
        assert_eq!(extracted.total_cost, 40);
        assert!(extracted.is_partial());
    }

    #[test]
    fn test_depot_as_stop() {
        let problem = problem();
        let mut solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1],
            }],
        );
        solution.update_route(RouteIdx::new(0), |problem, route| {
            route.push(problem, LocationIdx::new(0))
        });

        assert_eq!(
            validate_solution(&solution),
            Err(InvariantViolation::DepotAsStop {
                vehicle: VehicleIdx::new(0)
            })
        );
    }

    #[test]
    fn test_duplicate_stop() {
        let problem = problem();
        let mut solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1],
            }],
        );
        solution.update_route(RouteIdx::new(1), |problem, route| {
            route.push(problem, LocationIdx::new(1))
        });

        assert_eq!(
            validate_solution(&solution),
            Err(InvariantViolation::DuplicateStop {
                location: LocationIdx::new(1)
            })
        );
    }

    #[test]
    fn test_routed_and_unassigned() {
        let problem = problem();
        let mut solution = test_utils::create_test_working_solution(&problem, vec![]);
        solution.update_route(RouteIdx::new(0), |problem, route| {
            route.push(problem, LocationIdx::new(2))
        });

        assert_eq!(
            validate_solution(&solution),
            Err(InvariantViolation::DuplicateStop {
                location: LocationIdx::new(2)
            })
        );
    }

    #[test]
    fn test_capacity_exceeded() {
        let problem = problem();
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1, 2, 3],
            }],
        );

        assert!(matches!(
            validate_solution(&solution),
            Err(InvariantViolation::CapacityExceeded { .. })
        ));
    }
}
