//! Resource locators used as image cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Opaque, canonical identifier for a remote resource.
///
/// Two locators compare equal when their canonical URLs are equal, so
/// `HTTPS://Example.com/a.png#x` and `https://example.com/a.png` share a
/// cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceLocator(String);

impl ResourceLocator {
    /// Parse and canonicalize a locator.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Default scheme to https:// if missing
    /// 3. Lowercase the host
    /// 4. Remove fragment (#...)
    /// 5. Keep query string intact (do not reorder)
    pub fn parse(input: &str) -> Result<Self, Error> {
        canonicalize(input).map(|url| Self(url.into()))
    }

    /// The canonical URL string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical URL, re-parsed for transport use.
    pub fn to_url(&self) -> Result<Url, Error> {
        Url::parse(&self.0).map_err(|e| Error::InvalidUrl(e.to_string()))
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceLocator {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceLocator> for String {
    fn from(locator: ResourceLocator) -> Self {
        locator.0
    }
}

fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
