use thiserror::Error;

/// Failure of a distance-matrix source. The whole matrix is unusable when one is returned.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Missing API key, set {0}")]
    MissingApiKey(&'static str),
}

impl ProviderError {
    /// Whether calling the provider again (or falling back to another strategy) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request(_)
            | ProviderError::Status { .. }
            | ProviderError::Malformed(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::MissingApiKey(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(
            ProviderError::Status {
                status: "OVER_QUERY_LIMIT".to_owned(),
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            ProviderError::Api {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::Api {
                status: 403,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!ProviderError::MissingApiKey("DISTANCE_MATRIX_API_KEY").is_retryable());
    }
}
