use binroute_matrix_providers::cost_matrix::Cost;

use crate::solver::{
    ls::r#move::{ArcCost, LocalSearchOperator},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Inter-Route Relocate**
///
/// Moves the stop at `from` in `from_route_id` before the stop at `to` in `to_route_id`.
///
/// ```text
/// BEFORE:
///    R1: (A) -> [from] -> (B)
///    R2: (X) -> (Y)
///
/// AFTER:
///    R1: (A) -> (B)
///    R2: (X) -> [from] -> (Y)
///
/// Edges Removed: (A->from), (from->B), (X->Y)
/// Edges Added:   (A->B),    (X->from), (from->Y)
/// ```
#[derive(Debug)]
pub struct InterRelocateOperator {
    params: InterRelocateParams,
}

#[derive(Debug)]
pub struct InterRelocateParams {
    pub from_route_id: RouteIdx,
    pub to_route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl InterRelocateOperator {
    pub fn new(params: InterRelocateParams) -> Self {
        if params.from_route_id == params.to_route_id {
            panic!("InterRelocateOperator requires two different routes");
        }

        InterRelocateOperator { params }
    }
}

impl LocalSearchOperator for InterRelocateOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 == r2 {
            return;
        }

        let from_route = solution.route(r1);
        let to_route = solution.route(r2);
        let problem = solution.problem();

        for from in 0..from_route.len() {
            if !to_route.can_carry(problem.demand(from_route.stop(from))) {
                continue;
            }

            for to in 0..=to_route.len() {
                consumer(InterRelocateOperator::new(InterRelocateParams {
                    from_route_id: r1,
                    to_route_id: r2,
                    from,
                    to,
                }));
            }
        }
    }

    fn cost_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        let from_route = solution.route(self.params.from_route_id);
        let to_route = solution.route(self.params.to_route_id);

        let a = from_route.previous_location(self.params.from);
        let from = from_route.stop(self.params.from);
        let b = from_route.next_location(self.params.from);

        let x = to_route.previous_location(self.params.to);
        let y = to_route.location_or_depot(self.params.to);

        let removal = costs.arc_cost(a, b) - costs.arc_cost(a, from) - costs.arc_cost(from, b);
        let insertion = costs.arc_cost(x, from) + costs.arc_cost(from, y) - costs.arc_cost(x, y);

        removal + insertion
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let location_id = solution
            .route(self.params.from_route_id)
            .stop(self.params.from);

        solution
            .route(self.params.to_route_id)
            .can_carry(solution.problem().demand(location_id))
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let InterRelocateParams {
            from_route_id,
            to_route_id,
            from,
            to,
        } = self.params;

        solution.update_route_pair((from_route_id, to_route_id), |problem, from_route, to_route| {
            let location_id = from_route.remove(problem, from);
            to_route.insert(problem, to, location_id);
        });
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.from_route_id, self.params.to_route_id]
    }
}
