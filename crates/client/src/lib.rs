//! Client code for rebrowse.
//!
//! This crate provides the image transport, the single-flight image cache,
//! and the repository query clients consumed by the app controllers.

pub mod cache;
pub mod fetch;
pub mod github;
pub mod query;

pub use cache::{CacheConfig, CacheStats, EntryStatus, FetchCache, FetchHandle, FetchOutcome, RequestTicket};
pub use fetch::{FetchClient, FetchConfig, Transport};
pub use github::{GithubClient, GithubConfig, SearchRequest};
pub use query::{QueryError, RepositoryQueryClient, StaticQueryClient};
