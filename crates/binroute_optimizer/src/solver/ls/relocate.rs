use binroute_matrix_providers::cost_matrix::Cost;

use crate::solver::{
    ls::r#move::{ArcCost, LocalSearchOperator},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Intra-Route Relocate**
///
/// Moves the stop at `from` so that it is visited right before the stop currently at `to`.
/// `to == len` moves the stop to the end of the route.
///
/// ```text
/// BEFORE:
///    Route: (A) -> [from] -> (C) ... (X) -> (Y)
///
/// AFTER:
///    Route: (A) -> (C) ... (X) -> [from] -> (Y)
///
/// Edges Removed: (A->from), (from->C), (X->Y)
/// Edges Added:   (A->C),    (X->from), (from->Y)
/// ```
#[derive(Debug)]
pub struct RelocateOperator {
    params: RelocateOperatorParams,
}

#[derive(Debug)]
pub struct RelocateOperatorParams {
    pub route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl RelocateOperator {
    pub fn new(params: RelocateOperatorParams) -> Self {
        if params.from == params.to || params.from + 1 == params.to {
            panic!("RelocateOperator: moving {} to {} is a no-op", params.from, params.to);
        }

        Self { params }
    }
}

impl LocalSearchOperator for RelocateOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 != r2 {
            return;
        }

        let route = solution.route(r1);
        if route.len() < 2 {
            return;
        }

        for from in 0..route.len() {
            for to in 0..=route.len() {
                if to == from || to == from + 1 {
                    continue;
                }

                consumer(RelocateOperator::new(RelocateOperatorParams {
                    route_id: r1,
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
        let route = solution.route(self.params.route_id);

        let a = route.previous_location(self.params.from);
        let from = route.stop(self.params.from);
        let c = route.next_location(self.params.from);

        let x = route.previous_location(self.params.to);
        let y = route.location_or_depot(self.params.to);

        let current_cost = costs.arc_cost(a, from) + costs.arc_cost(from, c) + costs.arc_cost(x, y);
        let new_cost = costs.arc_cost(a, c) + costs.arc_cost(x, from) + costs.arc_cost(from, y);

        new_cost - current_cost
    }

    fn is_valid(&self, _solution: &WorkingSolution) -> bool {
        // Same stops, same load
        true
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let RelocateOperatorParams { route_id, from, to } = self.params;

        // `to` is an index of the route before the removal
        let target = if to > from { to - 1 } else { to };
        solution.update_route(route_id, |problem, route| route.relocate(problem, from, target));
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
