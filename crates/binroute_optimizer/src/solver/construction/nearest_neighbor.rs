use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    problem::{
        location::LocationIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// Nearest-neighbour construction with a capacity cut-off.
///
/// Vehicles are extended in input order, each one from its current tail towards the
/// cheapest unassigned pickup (lowest index on ties). A vehicle stops for the pass as
/// soon as that pickup does not fit. Passes repeat until a pass assigns nothing, so a
/// vehicle blocked by a large pickup can still take smaller ones left over by the others.
/// Whatever remains is reported as unassigned.
#[instrument(skip_all, level = "debug")]
pub fn construct_solution(problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));

    let mut pass = 0;
    loop {
        pass += 1;
        let mut assigned_in_pass = 0;

        for vehicle_id in VehicleIdx::range(problem.vehicles().len()) {
            let route_id = RouteIdx::from(vehicle_id);

            while let Some(next) =
                nearest_unassigned(&solution, solution.route(route_id).last_location())
            {
                if !solution.route(route_id).can_carry(problem.demand(next)) {
                    break;
                }

                solution.push(route_id, next);
                assigned_in_pass += 1;
            }
        }

        debug!(
            "Construction pass {}: assigned {} pickups, {} left",
            pass,
            assigned_in_pass,
            solution.unassigned_count()
        );

        if assigned_in_pass == 0 || !solution.has_unassigned() {
            break;
        }
    }

    solution
}

fn nearest_unassigned(solution: &WorkingSolution, from: LocationIdx) -> Option<LocationIdx> {
    // `min_by_key` keeps the first minimum and unassigned pickups come in increasing order
    solution
        .unassigned_iter()
        .min_by_key(|&to| solution.problem().travel_cost(from, to))
}
