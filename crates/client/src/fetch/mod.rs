//! HTTP transport for remote byte payloads.
//!
//! - Only canonical `http`/`https` locators reach the network.
//! - Non-2xx responses and bodies larger than `max_bytes` are failures.
//! - Timeouts come from the underlying reqwest client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

use rebrowse_core::{AppConfig, Error, ResourceLocator};

/// Fetches the raw bytes behind a locator.
///
/// Implementations must be safe to call concurrently for different locators
/// and idempotent when called repeatedly for the same one.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_bytes(&self, locator: &ResourceLocator) -> Result<Bytes, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "rebrowse/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "rebrowse/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client for image payloads.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn check_size(&self, len: usize) -> Result<(), Error> {
        if len > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for FetchClient {
    async fn fetch_bytes(&self, locator: &ResourceLocator) -> Result<Bytes, Error> {
        let start = Instant::now();
        let url = locator.to_url()?;

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(e.to_string())
                } else {
                    Error::HttpError(format!("network error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(e.to_string())
            } else {
                Error::HttpError(format!("failed to read response: {}", e))
            }
        })?;

        self.check_size(bytes.len())?;

        tracing::debug!("fetched {} in {}ms ({} bytes)", locator, start.elapsed().as_millis(), bytes.len());

        Ok(bytes)
    }
}
