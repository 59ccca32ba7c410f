//! Unified error types for rebrowse.
//!
//! Every variant carries owned strings so a single failure can be fanned out
//! to all requesters waiting on the same resource.

/// Unified error type shared by the fetch, query and navigation layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid user input (e.g., an empty or blank search query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid resource URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// HTTP error response or network failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Response body could not be decoded.
    #[error("DECODE_FAILED: {0}")]
    Decode(String),

    /// A programming defect, such as a coordinator owned by two parents or a
    /// fetch task that died without a result.
    #[error("INVARIANT_VIOLATION: {0}")]
    InvariantViolation(String),
}
