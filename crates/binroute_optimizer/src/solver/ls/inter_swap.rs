use binroute_matrix_providers::cost_matrix::Cost;

use crate::solver::{
    ls::r#move::{ArcCost, LocalSearchOperator},
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Inter-Route Swap**
///
/// Exchanges the stop `first` of `first_route_id` with the stop `second` of `second_route_id`.
///
/// ```text
/// BEFORE:
///    R1: (A) -> [first] -> (B)
///    R2: (X) -> [second] -> (Y)
///
/// AFTER:
///    R1: (A) -> [second] -> (B)
///    R2: (X) -> [first] -> (Y)
/// ```
#[derive(Debug)]
pub struct InterSwapOperator {
    params: InterSwapOperatorParams,
}

#[derive(Debug)]
pub struct InterSwapOperatorParams {
    pub first_route_id: RouteIdx,
    pub second_route_id: RouteIdx,
    pub first: usize,
    pub second: usize,
}

impl InterSwapOperator {
    pub fn new(params: InterSwapOperatorParams) -> Self {
        if params.first_route_id == params.second_route_id {
            panic!("InterSwapOperator requires two different route IDs.");
        }

        InterSwapOperator { params }
    }
}

impl LocalSearchOperator for InterSwapOperator {
    fn generate_moves<C>(solution: &WorkingSolution, (r1, r2): (RouteIdx, RouteIdx), mut consumer: C)
    where
        C: FnMut(Self),
    {
        // The move is symmetric, (r2, r1) would produce the same moves
        if r1 >= r2 {
            return;
        }

        let first_route = solution.route(r1);
        let second_route = solution.route(r2);

        for first in 0..first_route.len() {
            for second in 0..second_route.len() {
                consumer(InterSwapOperator::new(InterSwapOperatorParams {
                    first_route_id: r1,
                    second_route_id: r2,
                    first,
                    second,
                }));
            }
        }
    }

    fn cost_delta<A>(&self, solution: &WorkingSolution, costs: &A) -> Cost
    where
        A: ArcCost + ?Sized,
    {
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);

        let a = first_route.previous_location(self.params.first);
        let first = first_route.stop(self.params.first);
        let b = first_route.next_location(self.params.first);

        let x = second_route.previous_location(self.params.second);
        let second = second_route.stop(self.params.second);
        let y = second_route.next_location(self.params.second);

        let current_cost = costs.arc_cost(a, first)
            + costs.arc_cost(first, b)
            + costs.arc_cost(x, second)
            + costs.arc_cost(second, y);

        let new_cost = costs.arc_cost(a, second)
            + costs.arc_cost(second, b)
            + costs.arc_cost(x, first)
            + costs.arc_cost(first, y);

        new_cost - current_cost
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);

        let first_demand = problem.demand(first_route.stop(self.params.first));
        let second_demand = problem.demand(second_route.stop(self.params.second));

        (first_route.load() - first_demand + second_demand).fits_within(first_route.capacity())
            && (second_route.load() - second_demand + first_demand)
                .fits_within(second_route.capacity())
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let InterSwapOperatorParams {
            first_route_id,
            second_route_id,
            first,
            second,
        } = self.params;

        solution.update_route_pair(
            (first_route_id, second_route_id),
            |problem, first_route, second_route| {
                let second_location = second_route.stop(second);
                let first_location = first_route.replace(problem, first, second_location);
                second_route.replace(problem, second, first_location);
            },
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.first_route_id, self.params.second_route_id]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        solver::{
            ls::{
                inter_swap::{InterSwapOperator, InterSwapOperatorParams},
                r#move::LocalSearchOperator,
            },
            solution::route_id::RouteIdx,
        },
        test_utils::{self, TestRoute, location_ids},
    };

    #[test]
    fn test_inter_swap() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[10, 20, 30, 40],
            &[10.0; 4],
            &[100.0, 100.0],
        ));
        let mut solution = test_utils::create_test_working_solution(
            &problem,
            vec![
                TestRoute {
                    vehicle_id: 0,
                    stops: vec![1, 4],
                },
                TestRoute {
                    vehicle_id: 1,
                    stops: vec![3, 2],
                },
            ],
        );

        let operator = InterSwapOperator::new(InterSwapOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first: 1,
            second: 1,
        });

        let cost = solution.total_cost();
        let delta = operator.cost_delta(&solution, problem.as_ref());
        assert!(operator.is_valid(&solution));
        operator.apply(&mut solution);

        assert_eq!(solution.route(RouteIdx::new(0)).stops(), location_ids(&[1, 2]));
        assert_eq!(solution.route(RouteIdx::new(1)).stops(), location_ids(&[3, 4]));
        assert_eq!(solution.total_cost(), cost + delta);
        assert!(delta < 0);
    }

    #[test]
    fn test_inter_swap_capacity() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[10, 20, 30],
            &[50.0, 40.0, 70.0],
            &[100.0, 80.0],
        ));
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![
                TestRoute {
                    vehicle_id: 0,
                    stops: vec![1, 2],
                },
                TestRoute {
                    vehicle_id: 1,
                    stops: vec![3],
                },
            ],
        );

        // 40 out and 70 in brings the first route to 120
        let swap_first = InterSwapOperator::new(InterSwapOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first: 1,
            second: 0,
        });
        assert!(!swap_first.is_valid(&solution));

        // 50 out and 70 in gives 110
        let swap_second = InterSwapOperator::new(InterSwapOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first: 0,
            second: 0,
        });
        assert!(!swap_second.is_valid(&solution));

        let mut count = 0;
        InterSwapOperator::generate_moves(&solution, (RouteIdx::new(1), RouteIdx::new(0)), |_| {
            count += 1
        });
        assert_eq!(count, 0);
    }
}
