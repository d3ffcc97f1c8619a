use std::sync::Arc;

use binroute_matrix_providers::cost_matrix::{Cost, NO_ROUTE_COST};
use jiff::{SignedDuration, Timestamp};
use rand::{SeedableRng, rngs::SmallRng};
use tracing::{debug, info, instrument, warn};

use crate::{
    problem::{location::LocationIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::{
        ls::{local_search::LocalSearch, r#move::ArcCost},
        score::Score,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
        solver_params::SolverParams,
    },
    utils::cancellation::CancellationToken,
};

/// Why an improvement run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// No improving move left and the penalty rounds stopped producing new bests
    LocalOptimum,
    TimeBudgetReached,
    Cancelled,
    /// The iteration safety bound ran out, the result is the best found so far
    IterationLimitReached,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SearchOutcome::IterationLimitReached)
    }
}

pub struct SearchResult {
    pub solution: WorkingSolution,
    pub score: Score,
    pub iterations: usize,
    pub outcome: SearchOutcome,
}

/// Shared state of one improvement run.
#[derive(Clone)]
pub struct SearchContext {
    pub start: Timestamp,
    pub time_budget: SignedDuration,
    pub cancellation: CancellationToken,
    pub seed: u64,
    pub thread: usize,
}

impl SearchContext {
    pub fn is_time_budget_reached(&self) -> bool {
        Timestamp::now().duration_since(self.start) > self.time_budget
    }
}

#[inline(always)]
fn flatten_index(from: LocationIdx, to: LocationIdx, num_locations: usize) -> usize {
    from.get() * num_locations + to.get()
}

/// Penalty and usage counters for every arc, stored row-major like the cost matrix.
#[derive(Debug, Clone)]
pub struct ArcPenalties {
    penalties: Vec<u32>,
    usage: Vec<u32>,
    num_locations: usize,
    symmetric: bool,
}

impl ArcPenalties {
    pub fn new(problem: &VehicleRoutingProblem) -> Self {
        let size = problem.num_locations() * problem.num_locations();

        ArcPenalties {
            penalties: vec![0; size],
            usage: vec![0; size],
            num_locations: problem.num_locations(),
            symmetric: problem.is_symmetric(),
        }
    }

    #[inline(always)]
    pub fn penalty(&self, from: LocationIdx, to: LocationIdx) -> u32 {
        self.penalties[flatten_index(from, to, self.num_locations)]
    }

    pub fn usage(&self, from: LocationIdx, to: LocationIdx) -> u32 {
        self.usage[flatten_index(from, to, self.num_locations)]
    }

    /// Counts the arcs of the given routes as used once more.
    pub fn record_usage(&mut self, solution: &WorkingSolution, routes: &[RouteIdx]) {
        for &route_id in routes {
            for (from, to) in solution.route(route_id).arcs() {
                let index = flatten_index(from, to, self.num_locations);
                self.usage[index] = self.usage[index].saturating_add(1);
            }
        }
    }

    /// Increments the penalty of the arcs of `solution` with the highest utility
    /// `cost * (1 + usage) / (1 + penalty)` and returns how many were penalized.
    pub fn penalize(&mut self, problem: &VehicleRoutingProblem, solution: &WorkingSolution) -> usize {
        let utility = |from: LocationIdx, to: LocationIdx| {
            let index = flatten_index(from, to, self.num_locations);
            let cost = problem.travel_cost(from, to) as f64;

            cost * (1.0 + self.usage[index] as f64) / (1.0 + self.penalties[index] as f64)
        };

        let max_utility = solution
            .non_empty_routes_iter()
            .flat_map(|route| route.arcs())
            .map(|(from, to)| utility(from, to))
            .fold(0.0_f64, f64::max);

        if max_utility <= 0.0 {
            return 0;
        }

        let selected = solution
            .non_empty_routes_iter()
            .flat_map(|route| route.arcs())
            .filter(|&(from, to)| utility(from, to) >= max_utility)
            .collect::<Vec<_>>();

        for &(from, to) in &selected {
            self.increment(from, to);
            if self.symmetric && from != to {
                self.increment(to, from);
            }
        }

        selected.len()
    }

    fn increment(&mut self, from: LocationIdx, to: LocationIdx) {
        let index = flatten_index(from, to, self.num_locations);
        self.penalties[index] = self.penalties[index].saturating_add(1);
    }
}

/// Travel costs augmented with `λ * penalty(arc)`.
pub struct PenalizedCosts<'a> {
    problem: &'a VehicleRoutingProblem,
    penalties: &'a ArcPenalties,
    lambda: Cost,
}

impl<'a> PenalizedCosts<'a> {
    pub fn new(
        problem: &'a VehicleRoutingProblem,
        penalties: &'a ArcPenalties,
        lambda: Cost,
    ) -> Self {
        PenalizedCosts {
            problem,
            penalties,
            lambda,
        }
    }
}

impl ArcCost for PenalizedCosts<'_> {
    #[inline(always)]
    fn arc_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost {
        let penalty = self.penalties.penalty(from, to) as Cost;
        self.problem
            .travel_cost(from, to)
            .saturating_add(self.lambda.saturating_mul(penalty))
    }

    fn is_symmetric(&self) -> bool {
        self.penalties.symmetric
    }
}

/// `λ = lambda_factor * average arc cost`, at least 1. Arcs without a known route are ignored.
pub fn penalty_lambda(solution: &WorkingSolution, lambda_factor: f64) -> Cost {
    let (total, count) = solution
        .non_empty_routes_iter()
        .flat_map(|route| route.arcs())
        .map(|(from, to)| solution.problem().travel_cost(from, to))
        .filter(|&cost| cost < NO_ROUTE_COST)
        .fold((0 as Cost, 0usize), |(total, count), cost| {
            (total + cost, count + 1)
        });

    if count == 0 {
        return 1;
    }

    let average = total as f64 / count as f64;
    ((lambda_factor * average).round() as Cost).max(1)
}

/// Guided local search starting from `solution`.
///
/// Runs the local search on penalized costs and keeps the solution with the best real score.
/// At every local optimum the arcs with maximal utility are penalized, which pushes the search
/// out of it.
#[instrument(skip_all, level = "debug", fields(thread = context.thread))]
pub fn run_guided_local_search(
    mut solution: WorkingSolution,
    params: &SolverParams,
    context: &SearchContext,
) -> SearchResult {
    let problem: Arc<VehicleRoutingProblem> = Arc::clone(solution.shared_problem());
    let mut rng = SmallRng::seed_from_u64(context.seed);
    let mut local_search = LocalSearch::new(solution.routes().len(), &mut rng);

    let mut penalties = ArcPenalties::new(&problem);
    let lambda = penalty_lambda(&solution, params.gls_lambda_factor);

    let mut best_score = solution.score();
    let mut best_solution = solution.clone();

    let mut remaining_iterations = params.max_iterations;
    let mut iterations = 0;
    let mut stagnant_rounds = 0;

    let outcome = loop {
        if context.cancellation.is_cancelled() {
            break SearchOutcome::Cancelled;
        }

        if context.is_time_budget_reached() {
            break SearchOutcome::TimeBudgetReached;
        }

        if remaining_iterations == 0 {
            warn!(
                thread = context.thread,
                iterations, "Search stopped after reaching the iteration limit, returning best so far"
            );
            break SearchOutcome::IterationLimitReached;
        }

        remaining_iterations -= 1;
        iterations += 1;

        let costs = PenalizedCosts::new(&problem, &penalties, lambda);
        match local_search.run_iteration(&mut solution, &costs) {
            Some(applied) => {
                penalties.record_usage(&solution, &applied.updated_routes());

                let score = solution.score();
                if score < best_score {
                    debug!(thread = context.thread, iterations, "New best {score}");
                    best_score = score;
                    best_solution = solution.clone();
                    stagnant_rounds = 0;
                }
            }
            None => {
                if stagnant_rounds >= params.max_stagnant_penalty_rounds {
                    break SearchOutcome::LocalOptimum;
                }

                let penalized = penalties.penalize(&problem, &solution);
                if penalized == 0 {
                    break SearchOutcome::LocalOptimum;
                }

                local_search.invalidate_all();
                stagnant_rounds += 1;

                debug!(
                    thread = context.thread,
                    stagnant_rounds, penalized, "Penalized arcs at local optimum"
                );
            }
        }
    };

    info!(
        thread = context.thread,
        iterations,
        ?outcome,
        "Search finished with {best_score}"
    );

    SearchResult {
        solution: best_solution,
        score: best_score,
        iterations,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::{SignedDuration, Timestamp};

    use crate::{
        problem::location::LocationIdx,
        solver::{
            construction::nearest_neighbor::construct_solution,
            ls::r#move::ArcCost,
            solution::route_id::RouteIdx,
            solver_params::SolverParams,
        },
        test_utils::{self, TestRoute},
        utils::cancellation::CancellationToken,
    };

    use super::*;

    fn context(time_budget: SignedDuration) -> SearchContext {
        SearchContext {
            start: Timestamp::now(),
            time_budget,
            cancellation: CancellationToken::new(),
            seed: 42,
            thread: 0,
        }
    }

    #[test]
    fn test_penalize_highest_utility_arc() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[10, 20, 100],
            &[1.0; 3],
            &[100.0],
        ));
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1, 2, 3],
            }],
        );

        let mut penalties = ArcPenalties::new(&problem);
        assert_eq!(penalties.penalize(&problem, &solution), 1);

        // 3 -> depot costs 100, more than any other arc
        let far = LocationIdx::new(3);
        assert_eq!(penalties.penalty(far, problem.depot()), 1);
        assert_eq!(penalties.penalty(problem.depot(), far), 1);
        assert_eq!(penalties.penalty(LocationIdx::new(2), far), 0);

        let costs = PenalizedCosts::new(&problem, &penalties, 7);
        assert_eq!(costs.arc_cost(far, problem.depot()), 107);
        assert!(costs.is_symmetric());

        // Utility of 3 -> depot halves, 2 -> 3 (80) wins next
        penalties.penalize(&problem, &solution);
        assert_eq!(penalties.penalty(LocationIdx::new(2), far), 1);
        assert_eq!(penalties.penalty(far, problem.depot()), 1);
    }

    #[test]
    fn test_usage_increases_utility() {
        let problem = Arc::new(test_utils::create_line_problem(&[10, 20], &[1.0; 2], &[100.0]));
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![1, 2],
            }],
        );

        let mut penalties = ArcPenalties::new(&problem);
        penalties.record_usage(&solution, &[RouteIdx::new(0)]);
        assert_eq!(penalties.usage(problem.depot(), LocationIdx::new(1)), 1);
        assert_eq!(penalties.usage(LocationIdx::new(1), problem.depot()), 0);
    }

    #[test]
    fn test_lambda_ignores_missing_routes() {
        let problem = Arc::new(test_utils::create_matrix_problem(
            vec![
                vec![0, 100, NO_ROUTE_COST],
                vec![100, 0, 300],
                vec![200, 300, 0],
            ],
            &[1.0; 2],
            &[100.0],
        ));
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![TestRoute {
                vehicle_id: 0,
                stops: vec![2, 1],
            }],
        );

        // Arcs 0->2 (no route), 2->1 (300), 1->0 (100)
        assert_eq!(penalty_lambda(&solution, 0.1), 20);
        assert_eq!(penalty_lambda(&solution, 0.0), 1);
    }

    #[test]
    fn test_search_improves_initial_solution() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[10, 20, 30, 40, 50, 60],
            &[10.0; 6],
            &[40.0, 40.0],
        ));
        let solution = test_utils::create_test_working_solution(
            &problem,
            vec![
                TestRoute {
                    vehicle_id: 0,
                    stops: vec![6, 1, 4],
                },
                TestRoute {
                    vehicle_id: 1,
                    stops: vec![2, 5, 3],
                },
            ],
        );
        let initial_score = solution.score();

        let params = SolverParams {
            max_stagnant_penalty_rounds: 20,
            ..SolverParams::default()
        };
        let result = run_guided_local_search(solution, &params, &context(SignedDuration::from_secs(10)));

        assert!(result.score < initial_score);
        assert_eq!(result.score, result.solution.score());
        assert_eq!(result.outcome, SearchOutcome::LocalOptimum);
        for route in result.solution.routes() {
            assert!(route.load().fits_within(route.capacity()));
        }
    }

    #[test]
    fn test_iteration_limit_returns_best_so_far() {
        let problem = Arc::new(test_utils::create_line_problem(
            &[30, 10, 20],
            &[1.0; 3],
            &[100.0],
        ));
        let solution = construct_solution(&problem);

        let params = SolverParams {
            max_iterations: 1,
            ..SolverParams::default()
        };
        let result =
            run_guided_local_search(solution.clone(), &params, &context(SignedDuration::from_secs(10)));

        assert_eq!(result.iterations, 1);
        assert_eq!(result.outcome, SearchOutcome::IterationLimitReached);
        assert!(result.outcome.is_degraded());
        assert!(result.score <= solution.score());
    }

    #[test]
    fn test_cancelled_search_returns_initial_solution() {
        let problem = Arc::new(test_utils::create_line_problem(&[10, 20], &[1.0; 2], &[100.0]));
        let solution = construct_solution(&problem);
        let context = context(SignedDuration::from_secs(10));
        context.cancellation.cancel();

        let result = run_guided_local_search(solution.clone(), &SolverParams::default(), &context);

        assert_eq!(result.outcome, SearchOutcome::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.score, solution.score());
    }

    #[test]
    fn test_zero_time_budget() {
        let problem = Arc::new(test_utils::create_line_problem(&[10, 20], &[1.0; 2], &[100.0]));
        let solution = construct_solution(&problem);
        let context = SearchContext {
            start: Timestamp::now() - SignedDuration::from_secs(1),
            ..context(SignedDuration::ZERO)
        };

        let result = run_guided_local_search(solution, &SolverParams::default(), &context);
        assert_eq!(result.outcome, SearchOutcome::TimeBudgetReached);
    }
}
