//! Repository query error types.

use std::sync::Arc;

/// Errors from a repository query client.
///
/// `Malformed` covers queries the service refused to interpret; every other
/// variant is a transport or response failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// Query rejected as malformed, locally or by the service.
    #[error("malformed query: {0}")]
    Malformed(String),

    /// Authentication failed (invalid token).
    #[error("authentication failed: invalid token")]
    Auth,

    /// Rate limited by the service.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl QueryError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, QueryError::Malformed(_))
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { QueryError::Timeout } else { QueryError::Network(Arc::new(err)) }
    }
}
