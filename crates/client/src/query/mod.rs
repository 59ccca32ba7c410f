//! Repository query boundary.
//!
//! Controllers depend on [`RepositoryQueryClient`] only; the GitHub client
//! and the static client used for tests and offline runs both implement it.

pub mod error;

pub use error::QueryError;

use async_trait::async_trait;
use rebrowse_core::ResultRecord;

/// Turns a query string into decoded result records.
///
/// Calls are idempotent and have no side effects beyond network I/O.
#[async_trait]
pub trait RepositoryQueryClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ResultRecord>, QueryError>;
}

/// Query client that answers every search with the same outcome.
#[derive(Debug, Clone)]
pub struct StaticQueryClient {
    result: Result<Vec<ResultRecord>, QueryError>,
}

impl StaticQueryClient {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self { result: Ok(records) }
    }

    pub fn failing(error: QueryError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl RepositoryQueryClient for StaticQueryClient {
    async fn search(&self, query: &str) -> Result<Vec<ResultRecord>, QueryError> {
        tracing::debug!("static search: query={}", query);
        self.result.clone()
    }
}
