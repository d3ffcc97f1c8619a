use std::{sync::Arc, thread};

use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::InvariantViolation,
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        construction::nearest_neighbor::construct_solution,
        extract::validate_solution,
        guided_local_search::{SearchContext, SearchOutcome, SearchResult, run_guided_local_search},
        score::Score,
        solution::working_solution::WorkingSolution,
        solver_params::SolverParams,
    },
    timer_debug,
    utils::cancellation::CancellationToken,
};

/// Construction and improvement strategy used by [`Solver`].
///
/// `improve` runs concurrently on several threads, each with its own context.
pub trait RoutingBackend: Sync {
    fn construct(&self, problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution;

    fn improve(&self, solution: WorkingSolution, context: &SearchContext) -> SearchResult;
}

/// Nearest-neighbour construction followed by guided local search.
pub struct HeuristicBackend {
    params: SolverParams,
}

impl HeuristicBackend {
    pub fn new(params: SolverParams) -> Self {
        HeuristicBackend { params }
    }
}

impl RoutingBackend for HeuristicBackend {
    fn construct(&self, problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
        construct_solution(problem)
    }

    fn improve(&self, solution: WorkingSolution, context: &SearchContext) -> SearchResult {
        run_guided_local_search(solution, &self.params, context)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub enum SolverStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

pub struct SolverOutput {
    pub solution: WorkingSolution,
    pub score: Score,
    /// Local search iterations summed over every thread
    pub iterations: usize,
    /// Outcome of the winning thread, `None` when nothing needed improving
    pub outcome: Option<SearchOutcome>,
    pub best_thread: Option<usize>,
    pub duration: SignedDuration,
}

pub struct Solver<B = HeuristicBackend> {
    problem: Arc<VehicleRoutingProblem>,
    params: SolverParams,
    backend: B,
    cancellation: CancellationToken,
    status: RwLock<SolverStatus>,
    created_at: Timestamp,
}

impl Solver<HeuristicBackend> {
    pub fn new(problem: Arc<VehicleRoutingProblem>, params: SolverParams) -> Self {
        let backend = HeuristicBackend::new(params.clone());
        Solver::with_backend(problem, params, backend)
    }
}

impl<B> Solver<B>
where
    B: RoutingBackend,
{
    pub fn with_backend(problem: Arc<VehicleRoutingProblem>, params: SolverParams, backend: B) -> Self {
        Solver {
            problem,
            params,
            backend,
            cancellation: CancellationToken::new(),
            status: RwLock::new(SolverStatus::Pending),
            created_at: Timestamp::now(),
        }
    }

    /// Shares an external token, cancelling it stops the search at the next iteration.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn problem(&self) -> &Arc<VehicleRoutingProblem> {
        &self.problem
    }

    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    pub fn status(&self) -> SolverStatus {
        *self.status.read()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Constructs a solution, improves it on `search_threads` threads and returns the best.
    ///
    /// Threads differ only by their seed. The best score wins, ties go to the lowest thread.
    #[instrument(skip_all, level = "debug")]
    pub fn solve(&self) -> Result<SolverOutput, InvariantViolation> {
        *self.status.write() = SolverStatus::Running;
        let result = self.run();
        *self.status.write() = if result.is_ok() {
            SolverStatus::Completed
        } else {
            SolverStatus::Failed
        };
        result
    }

    fn run(&self) -> Result<SolverOutput, InvariantViolation> {
        let start = Timestamp::now();

        let initial = timer_debug!("Construction", self.backend.construct(&self.problem));
        validate_solution(&initial)?;

        info!(
            routes = initial.non_empty_routes_iter().count(),
            unassigned = initial.unassigned_count(),
            "Constructed initial solution with {}",
            initial.score()
        );

        if self.problem.num_pickups() == 0 {
            return Ok(SolverOutput {
                score: initial.score(),
                solution: initial,
                iterations: 0,
                outcome: None,
                best_thread: None,
                duration: Timestamp::now().duration_since(start),
            });
        }

        let results = timer_debug!("Improvement", self.improve_on_threads(&initial, start));

        let mut best: Option<(usize, SearchResult)> = None;
        let mut iterations = 0;
        for (thread_index, result) in results {
            iterations += result.iterations;

            debug!(
                thread = thread_index,
                outcome = ?result.outcome,
                "Thread finished with {}",
                result.score
            );

            // Results come in thread order, strict comparison keeps the lowest thread on ties
            let is_better = best
                .as_ref()
                .is_none_or(|(_, best_result)| result.score < best_result.score);
            if is_better {
                best = Some((thread_index, result));
            }
        }

        let (solution, score, outcome, best_thread) = match best {
            Some((thread_index, result)) if result.score <= initial.score() => (
                result.solution,
                result.score,
                Some(result.outcome),
                Some(thread_index),
            ),
            _ => {
                let score = initial.score();
                (initial, score, None, None)
            }
        };

        validate_solution(&solution)?;

        let duration = Timestamp::now().duration_since(start);
        info!(
            iterations,
            ?outcome,
            ?best_thread,
            "Solved in {:.3}s with {}",
            duration.as_secs_f64(),
            score
        );

        Ok(SolverOutput {
            solution,
            score,
            iterations,
            outcome,
            best_thread,
            duration,
        })
    }

    fn improve_on_threads(
        &self,
        initial: &WorkingSolution,
        start: Timestamp,
    ) -> Vec<(usize, SearchResult)> {
        let num_threads = self.params.search_threads.number_of_threads();
        let backend = &self.backend;

        debug!("Running search on {} threads", num_threads);

        thread::scope(|s| {
            let handles = (0..num_threads)
                .filter_map(|thread_index| {
                    let context = SearchContext {
                        start,
                        time_budget: self.params.time_budget,
                        cancellation: self.cancellation.clone(),
                        seed: self.params.seed.wrapping_add(thread_index as u64),
                        thread: thread_index,
                    };
                    let solution = initial.clone();

                    let builder = thread::Builder::new().name(format!("search-{thread_index}"));
                    match builder.spawn_scoped(s, move || backend.improve(solution, &context)) {
                        Ok(handle) => Some((thread_index, handle)),
                        Err(error) => {
                            warn!(thread = thread_index, %error, "Failed to spawn search thread");
                            None
                        }
                    }
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|(thread_index, handle)| match handle.join() {
                    Ok(result) => (thread_index, result),
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
