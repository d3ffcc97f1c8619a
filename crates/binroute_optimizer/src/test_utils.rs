use std::sync::Arc;

use binroute_matrix_providers::cost_matrix::{Cost, CostMatrix};

use crate::{
    problem::{
        location::LocationIdx,
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

pub fn location_ids(ids: &[usize]) -> Vec<LocationIdx> {
    ids.iter().map(|&id| LocationIdx::new(id)).collect()
}

/// Pickups on a line, the depot sits at position 0 and the cost between two locations
/// is the difference of their positions.
pub fn create_line_problem(
    positions: &[Cost],
    demands: &[f64],
    capacities: &[f64],
) -> VehicleRoutingProblem {
    let all_positions = std::iter::once(0)
        .chain(positions.iter().copied())
        .collect::<Vec<_>>();

    let rows = all_positions
        .iter()
        .map(|from| all_positions.iter().map(|to| (from - to).abs()).collect())
        .collect();

    create_matrix_problem(rows, demands, capacities)
}

pub fn create_matrix_problem(
    rows: Vec<Vec<Cost>>,
    demands: &[f64],
    capacities: &[f64],
) -> VehicleRoutingProblem {
    assert_eq!(rows.len(), demands.len() + 1);

    let mut builder = VehicleRoutingProblemBuilder::default();
    builder.set_depot(0.0, 0.0);

    for (index, &demand) in demands.iter().enumerate() {
        builder.add_pickup(
            format!("pickup-{}", index + 1),
            0.0,
            0.001 * (index + 1) as f64,
            demand,
        );
    }

    for (index, &capacity) in capacities.iter().enumerate() {
        builder.add_vehicle(format!("vehicle-{index}"), capacity);
    }

    builder.set_travel_costs(CostMatrix::from_rows(rows));
    builder.build().unwrap()
}

pub struct TestRoute {
    pub vehicle_id: usize,
    pub stops: Vec<usize>,
}

pub fn create_test_working_solution(
    problem: &Arc<VehicleRoutingProblem>,
    routes: Vec<TestRoute>,
) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));

    for route in routes {
        for stop in route.stops {
            solution.push(RouteIdx::new(route.vehicle_id), LocationIdx::new(stop));
        }
    }

    solution
}
