//! Result records produced by repository search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, ResourceLocator};

/// One repository returned by a search query.
///
/// Records have no identity beyond structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    /// Owner-qualified name, e.g. `rust-lang/rust`.
    pub full_name: String,
    pub owner_avatar_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    pub stars: u64,
    pub watchers: u64,
    pub forks: u64,
    pub open_issues: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    /// Locator of the record's primary image (the owner avatar).
    pub fn image_locator(&self) -> Result<ResourceLocator, Error> {
        ResourceLocator::parse(&self.owner_avatar_url)
    }

    /// Owner login, taken from the owner-qualified name.
    pub fn owner(&self) -> &str {
        self.full_name.split_once('/').map(|(owner, _)| owner).unwrap_or(&self.full_name)
    }
}
