use binroute_matrix_providers::cost_matrix::Cost;

use crate::{
    problem::location::LocationIdx,
    solver::{
        ls::r#move::{ArcCost, LocalSearchOperator},
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Insert Unassigned**
///
/// Inserts a pickup that no route serves before the stop at `position`.
///
/// ```text
/// BEFORE:
///    Route: (X) -> (Y)
///
/// AFTER:
///    Route: (X) -> [location] -> (Y)
///
/// Edges Removed: (X->Y)
/// Edges Added:   (X->location), (location->Y)
/// ```
#[derive(Debug)]
pub struct InsertUnassignedOperator {
    params: InsertUnassignedParams,
}

#[derive(Debug)]
pub struct InsertUnassignedParams {
    pub route_id: RouteIdx,
    pub position: usize,
    pub location_id: LocationIdx,
}

impl InsertUnassignedOperator {
    pub fn new(params: InsertUnassignedParams) -> Self {
        InsertUnassignedOperator { params }
    }

    pub fn location_id(&self) -> LocationIdx {
        self.params.location_id
    }
}

impl LocalSearchOperator for InsertUnassignedOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 != r2 || !solution.has_unassigned() {
            return;
        }

        let route = solution.route(r1);
        let problem = solution.problem();

        for location_id in solution.unassigned_iter() {
            if !route.can_carry(problem.demand(location_id)) {
                continue;
            }

            for position in 0..=route.len() {
                consumer(InsertUnassignedOperator::new(InsertUnassignedParams {
                    route_id: r1,
                    position,
                    location_id,
                }));
            }
        }
    }

    fn cost_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        let route = solution.route(self.params.route_id);
        let location_id = self.params.location_id;

        let x = route.previous_location(self.params.position);
        let y = route.location_or_depot(self.params.position);

        costs.arc_cost(x, location_id) + costs.arc_cost(location_id, y) - costs.arc_cost(x, y)
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        solution.is_unassigned(self.params.location_id)
            && solution
                .route(self.params.route_id)
                .can_carry(solution.problem().demand(self.params.location_id))
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        solution.insert(
            self.params.route_id,
            self.params.position,
            self.params.location_id,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
