//! GitHub repository search client.
//!
//! ### Behavior
//!
//! - **Endpoint**: `{api_base_url}/search/repositories`
//! - **Authentication**: optional bearer token.
//! - **Rate Limiting**:
//!   - Spaces requests at least 2s apart with a token, 6s without
//!     (the search API allows 30 and 10 requests per minute).
//!   - 429, and 403 with `x-ratelimit-remaining: 0`, map to `RateLimited`.
//! - **Normalization**: converts repository items into `ResultRecord`s.

pub mod request;
pub mod response;

pub use request::{SearchRequest, SortKey, SortOrder};
pub use response::{SearchApiResponse, SearchResponse};

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use rebrowse_core::{AppConfig, ResultRecord};

use crate::query::{QueryError, RepositoryQueryClient};

/// Default base URL for the GitHub REST API.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent. GitHub rejects requests without one.
const DEFAULT_USER_AGENT: &str = "rebrowse/0.1";

const AUTHENTICATED_INTERVAL: Duration = Duration::from_secs(2);
const ANONYMOUS_INTERVAL: Duration = Duration::from_secs(6);

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Base URL (default: https://api.github.com).
    pub base_url: String,
    /// Optional API token.
    pub token: Option<String>,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: rebrowse/0.1).
    pub user_agent: String,
    /// Results per page for trait-level searches (default: 30).
    pub per_page: u8,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            per_page: 30,
        }
    }
}

impl From<&AppConfig> for GithubConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone().filter(|t| !t.trim().is_empty()),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            per_page: config.per_page,
        }
    }
}

impl GithubConfig {
    fn min_interval(&self) -> Duration {
        if self.token.is_some() { AUTHENTICATED_INTERVAL } else { ANONYMOUS_INTERVAL }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Map a non-success status to a query error.
fn classify_status(status: StatusCode, ratelimit_remaining: Option<&str>) -> QueryError {
    match status.as_u16() {
        401 => QueryError::Auth,
        403 if ratelimit_remaining == Some("0") => QueryError::RateLimited,
        403 => QueryError::Auth,
        429 => QueryError::RateLimited,
        422 => QueryError::Malformed("rejected by the search service".to_string()),
        code => QueryError::Http { status: code },
    }
}

/// GitHub repository search client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl GithubClient {
    /// Create a new GitHub client with the given configuration.
    pub fn new(config: GithubConfig) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| QueryError::Network(Arc::new(e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_interval()));
        Ok(Self { http, config, rate_limiter })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Execute a repository search.
    ///
    /// Handles rate limiting, request validation, and response normalization.
    pub async fn search_repositories(&self, req: SearchRequest) -> Result<SearchResponse, QueryError> {
        req.validate()?;

        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/search/repositories", self.config.base_url);

        tracing::debug!("searching repositories: query={}", req.q);

        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .query(&req);

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let http_response = request.send().await?;

        let status = http_response.status();
        tracing::debug!("search response status: {}", status);

        if !status.is_success() {
            let remaining = http_response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            return Err(classify_status(status, remaining));
        }

        let bytes = http_response.bytes().await?;
        let api_response: SearchApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| QueryError::Parse(e.to_string()))?;

        tracing::debug!(
            "search completed in {:?}, {} of {} results",
            start.elapsed(),
            api_response.items.len(),
            api_response.total_count
        );

        Ok(SearchResponse::from(api_response))
    }
}

#[async_trait]
impl RepositoryQueryClient for GithubClient {
    async fn search(&self, query: &str) -> Result<Vec<ResultRecord>, QueryError> {
        let req = SearchRequest { q: query.trim().to_string(), per_page: Some(self.config.per_page), ..Default::default() };
        self.search_repositories(req).await.map(|response| response.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            api_base_url: "https://ghe.example.com/api/v3/".into(),
            github_token: Some("  ".into()),
            per_page: 50,
            ..Default::default()
        };
        let config = GithubConfig::from(&app);
        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
        assert!(config.token.is_none());
        assert_eq!(config.per_page, 50);
        assert_eq!(config.min_interval(), ANONYMOUS_INTERVAL);
    }

    #[test]
    fn test_min_interval_with_token() {
        let config = GithubConfig { token: Some("ghp_test".into()), ..Default::default() };
        assert_eq!(config.min_interval(), AUTHENTICATED_INTERVAL);
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED, None), QueryError::Auth));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, Some("0")), QueryError::RateLimited));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, Some("12")), QueryError::Auth));
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, None), QueryError::RateLimited));
        assert!(classify_status(StatusCode::UNPROCESSABLE_ENTITY, None).is_malformed());
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, None),
            QueryError::Http { status: 503 }
        ));
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_network() {
        let client = GithubClient::new(GithubConfig::default()).unwrap();
        let result = client.search("   ").await;
        assert!(matches!(result, Err(QueryError::Malformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
