use jiff::SignedDuration;

#[derive(Clone, Debug)]
pub struct SolverParams {
    /// Wall-clock budget of the improvement phase, checked at every iteration boundary
    pub time_budget: SignedDuration,
    pub search_threads: Threads,

    /// Upper bound on local search iterations per thread. Reaching it stops the search early
    /// and is reported as a degraded outcome.
    pub max_iterations: usize,

    /// Scales the average arc cost of the initial solution into the penalty weight λ
    pub gls_lambda_factor: f64,

    /// Penalty rounds in a row without a new best before the search is considered converged
    pub max_stagnant_penalty_rounds: usize,

    pub seed: u64,
}

#[derive(Clone, Debug)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_budget: SignedDuration::from_secs(5),
            search_threads: Threads::Single,
            max_iterations: 1_000_000,
            gls_lambda_factor: 0.1,
            max_stagnant_penalty_rounds: 100,
            seed: 2427121,
        }
    }
}
