//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (REBROWSE_*)
//! 2. TOML config file (if REBROWSE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REBROWSE_*)
/// 2. TOML config file (if REBROWSE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the repository search API.
    ///
    /// Set via REBROWSE_API_BASE_URL environment variable.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Optional API token sent as a bearer credential.
    ///
    /// Set via REBROWSE_GITHUB_TOKEN environment variable.
    #[serde(default)]
    pub github_token: Option<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via REBROWSE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REBROWSE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per image.
    ///
    /// Set via REBROWSE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Number of search results requested per query.
    ///
    /// Set via REBROWSE_PER_PAGE environment variable.
    #[serde(default = "default_per_page")]
    pub per_page: u8,

    /// Maximum number of resolved payloads kept in the image cache.
    ///
    /// Set via REBROWSE_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Maximum total size of resolved payloads kept in the image cache.
    ///
    /// Set via REBROWSE_CACHE_MAX_BYTES environment variable.
    #[serde(default = "default_cache_max_bytes")]
    pub cache_max_bytes: usize,
}

fn default_api_base_url() -> String {
    "https://api.github.com".into()
}

fn default_user_agent() -> String {
    "rebrowse/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_per_page() -> u8 {
    30
}

fn default_cache_max_entries() -> usize {
    200
}

fn default_cache_max_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            github_token: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            per_page: default_per_page(),
            cache_max_entries: default_cache_max_entries(),
            cache_max_bytes: default_cache_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REBROWSE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REBROWSE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an already-layered figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
