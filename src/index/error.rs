use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Index request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl IndexError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            // Connection refused, reset or closed mid-request; malformed
            // requests and undecodable bodies fail the same way every time
            Self::Network(e) => {
                e.is_connect()
                    || e.is_timeout()
                    || (e.is_request() && !e.is_builder() && !e.is_decode())
            }
            Self::Unavailable(_) | Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::NotFound(_) | Self::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IndexError::Unavailable("503".to_string()), true)]
    #[case(IndexError::RateLimited { retry_after_secs: None }, true)]
    #[case(IndexError::Timeout { millis: 10 }, true)]
    #[case(IndexError::NotFound("requests".to_string()), false)]
    #[case(IndexError::InvalidResponse("bad json".to_string()), false)]
    fn is_transient_returns_expected(#[case] error: IndexError, #[case] expected: bool) {
        assert_eq!(error.is_transient(), expected);
    }
}
