use binroute_matrix_providers::cost_matrix::Cost;
use schemars::JsonSchema;
use serde::Serialize;

/// Recompute route costs after every applied move and compare them with the move delta.
pub const RUN_SCORE_ASSERTIONS: bool = cfg!(debug_assertions);

/// Solution quality, lower is better. Serving one more pickup always beats any cost saving.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
pub struct Score {
    pub unassigned: usize,
    pub cost: Cost,
}

impl Score {
    pub const MAX: Score = Score {
        unassigned: usize::MAX,
        cost: Cost::MAX,
    };

    pub fn new(unassigned: usize, cost: Cost) -> Self {
        Score { unassigned, cost }
    }

    pub fn is_complete(&self) -> bool {
        self.unassigned == 0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} unassigned, cost {}", self.unassigned, self.cost)
    }
}
