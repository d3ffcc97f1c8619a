use serde::{Deserialize, Serialize};

use crate::cost_matrix::CostMatrix;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TravelMatrixProvider {
    /// Great-circle distance, always available
    Geodesic,
    /// Road distances from a Distance Matrix endpoint.
    /// `region` overrides the configured region bias.
    DistanceMatrixApi {
        region: Option<String>,
    },
    Custom {
        matrix: CostMatrix,
    },
}

impl TravelMatrixProvider {
    pub fn is_remote(&self) -> bool {
        matches!(self, TravelMatrixProvider::DistanceMatrixApi { .. })
    }
}
