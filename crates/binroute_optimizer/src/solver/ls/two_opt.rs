use binroute_matrix_providers::cost_matrix::Cost;

use crate::solver::{
    ls::r#move::{ArcCost, LocalSearchOperator},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Intra-Route 2-Opt**
///
/// Reverses the stops between `from` and `to` (inclusive), removing crossing edges.
///
/// ```text
/// BEFORE:
///    (prev) --x--> [from] -> ... -> [to] --x--> (next)
///      A             B               C            D
///
/// AFTER:
///    (prev) -----> [to] -> ... -> [from] -----> (next)
///      A             C               B            D
///
/// Edges Removed: (prev->from), (to->next)
/// Edges Added:   (prev->to),   (from->next)
/// ```
///
/// With asymmetric costs every arc between `from` and `to` is traversed the other way
/// around as well, and is part of the delta.
#[derive(Debug)]
pub struct TwoOptOperator {
    params: TwoOptParams,
}

#[derive(Debug)]
pub struct TwoOptParams {
    pub route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl TwoOptOperator {
    pub fn new(params: TwoOptParams) -> Self {
        if params.from >= params.to {
            panic!("TwoOpt: cannot have from >= to")
        }

        TwoOptOperator { params }
    }

    fn boundary_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        let route = solution.route(self.params.route_id);

        let prev = route.previous_location(self.params.from);
        let from = route.stop(self.params.from);
        let to = route.stop(self.params.to);
        let next = route.next_location(self.params.to);

        let current_cost = costs.arc_cost(prev, from) + costs.arc_cost(to, next);
        let new_cost = costs.arc_cost(prev, to) + costs.arc_cost(from, next);

        new_cost - current_cost
    }

    fn reversed_segment_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        let stops = &solution.route(self.params.route_id).stops()[self.params.from..=self.params.to];

        stops
            .windows(2)
            .map(|pair| costs.arc_cost(pair[1], pair[0]) - costs.arc_cost(pair[0], pair[1]))
            .sum()
    }
}

impl LocalSearchOperator for TwoOptOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        if r1 != r2 {
            return;
        }

        let route = solution.route(r1);

        for from in 0..route.len() {
            for to in (from + 1)..route.len() {
                consumer(TwoOptOperator::new(TwoOptParams {
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
        if costs.is_symmetric() {
            self.boundary_delta(solution, costs)
        } else {
            self.boundary_delta(solution, costs) + self.reversed_segment_delta(solution, costs)
        }
    }

    fn is_valid(&self, _solution: &WorkingSolution) -> bool {
        true
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let TwoOptParams { route_id, from, to } = self.params;
        solution.update_route(route_id, |problem, route| route.reverse(problem, from, to));
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        solver::{
            ls::{
                r#move::LocalSearchOperator,
                two_opt::{TwoOptOperator, TwoOptParams},
            },
            solution::route_id::RouteIdx,
        },
        test_utils::{self, TestRoute, location_ids},
    };

    #[test]
    fn test_two_opt() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[10, 20, 30, 40],
            &[1.0; 4],
            &[100.0],
        ));
        let mut solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1, 3, 2, 4],
            }],
        );

        let operator = TwoOptOperator::new(TwoOptParams {
            route_id: RouteIdx::new(0),
            from: 1,
            to: 2,
        });

        let cost = solution.total_cost();
        let delta = operator.cost_delta(&solution, problem.as_ref());
        assert_eq!(delta, -20);

        operator.apply(&mut solution);
        assert_eq!(solution.route(RouteIdx::new(0)).stops(), location_ids(&[1, 2, 3, 4]));
        assert_eq!(solution.total_cost(), cost + delta);
    }

    #[test]
    fn test_two_opt_asymmetric() {
        let problem = Arc::new(test_utils::create_matrix_problem(
            vec![
                vec![0, 1, 5, 9],
                vec![1, 0, 1, 7],
                vec![5, 8, 0, 1],
                vec![1, 6, 9, 0],
            ],
            &[1.0; 3],
            &[100.0],
        ));
        let mut solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1, 2, 3],
            }],
        );

        let operator = TwoOptOperator::new(TwoOptParams {
            route_id: RouteIdx::new(0),
            from: 0,
            to: 2,
        });

        let cost = solution.total_cost();
        let delta = operator.cost_delta(&solution, problem.as_ref());
        operator.apply(&mut solution);

        assert_eq!(solution.route(RouteIdx::new(0)).stops(), location_ids(&[3, 2, 1]));
        assert_eq!(solution.total_cost(), cost + delta);
    }
}
