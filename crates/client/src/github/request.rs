//! GitHub repository search request types and validation.

use serde::{Deserialize, Serialize};

use crate::query::QueryError;

/// Longest query the search endpoint accepts.
const MAX_QUERY_CHARS: usize = 256;

/// Search request parameters for the GitHub repository search API.
///
/// Based on the REST documentation for `GET /search/repositories`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchRequest {
    /// Search keywords and qualifiers (required, max 256 chars).
    pub q: String,

    /// Results per page (1-100, default 30).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u8>,

    /// Sort field; best match when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKey>,

    /// Sort direction, only meaningful with `sort`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

/// Fields the repository search can sort by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Stars,
    Forks,
    HelpWantedIssues,
    Updated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SearchRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), ..Default::default() }
    }

    /// Validate the search request parameters.
    ///
    /// Returns `QueryError::Malformed` if any parameter is out of range.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.q.trim().is_empty() {
            return Err(QueryError::Malformed("query cannot be empty".to_string()));
        }

        let chars = self.q.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(QueryError::Malformed(format!(
                "query too long: {} chars (max {})",
                chars, MAX_QUERY_CHARS
            )));
        }

        if let Some(per_page) = self.per_page
            && !(1..=100).contains(&per_page)
        {
            return Err(QueryError::Malformed("per_page must be 1-100".to_string()));
        }

        if self.order.is_some() && self.sort.is_none() {
            return Err(QueryError::Malformed("order requires sort".to_string()));
        }

        Ok(())
    }

    /// Get the effective page size (default 30).
    pub fn get_per_page(&self) -> u8 {
        self.per_page.unwrap_or(30)
    }
}
