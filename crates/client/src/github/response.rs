//! GitHub repository search response types and normalization.

use chrono::{DateTime, Utc};
use rebrowse_core::ResultRecord;
use serde::Deserialize;

/// Raw response from the repository search API.
#[derive(Debug, Deserialize)]
pub struct SearchApiResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RepositoryItem>,
}

/// One repository as returned by the API.
#[derive(Debug, Deserialize)]
pub struct RepositoryItem {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    #[serde(default)]
    pub description: Option<String>,
    pub stargazers_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct Owner {
    pub login: Option<String>,
    pub avatar_url: String,
}

/// Normalized search response for internal use.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub records: Vec<ResultRecord>,
    pub total_count: u64,
    pub incomplete_results: bool,
}

impl From<RepositoryItem> for ResultRecord {
    fn from(item: RepositoryItem) -> Self {
        ResultRecord {
            name: item.name,
            full_name: item.full_name,
            owner_avatar_url: item.owner.avatar_url,
            description: item.description.unwrap_or_default(),
            language: item.language.unwrap_or_default(),
            stars: item.stargazers_count,
            watchers: item.watchers,
            forks: item.forks,
            open_issues: item.open_issues,
            html_url: item.html_url,
            updated_at: item.updated_at,
        }
    }
}

impl From<SearchApiResponse> for SearchResponse {
    fn from(raw: SearchApiResponse) -> Self {
        SearchResponse {
            records: raw.items.into_iter().map(ResultRecord::from).collect(),
            total_count: raw.total_count,
            incomplete_results: raw.incomplete_results,
        }
    }
}

impl SearchResponse {
    /// Whether the service reports more matches than were returned.
    pub fn has_more(&self) -> bool {
        self.total_count > self.records.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_JSON: &str = r#"{
        "total_count": 40,
        "incomplete_results": false,
        "items": [
            {
                "name": "rust",
                "full_name": "rust-lang/rust",
                "owner": {
                    "login": "rust-lang",
                    "avatar_url": "https://avatars.githubusercontent.com/u/5430905?v=4"
                },
                "description": "Empowering everyone to build reliable and efficient software.",
                "stargazers_count": 100000,
                "language": "Rust",
                "forks": 12000,
                "open_issues": 9000,
                "watchers": 100000,
                "html_url": "https://github.com/rust-lang/rust",
                "updated_at": "2025-03-25T08:00:00Z"
            },
            {
                "name": "nodesc",
                "full_name": "someone/nodesc",
                "owner": { "avatar_url": "https://avatars.githubusercontent.com/u/1?v=4" },
                "description": null,
                "stargazers_count": 1,
                "language": null,
                "forks": 0,
                "open_issues": 0,
                "watchers": 1
            }
        ]
    }"#;

    #[test]
    fn test_deserialize_search_response() {
        let response: SearchApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        assert_eq!(response.total_count, 40);
        assert!(!response.incomplete_results);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].owner.login.as_deref(), Some("rust-lang"));
    }

    #[test]
    fn test_normalize_to_records() {
        let raw: SearchApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        let normalized: SearchResponse = raw.into();

        let first = &normalized.records[0];
        assert_eq!(first.name, "rust");
        assert_eq!(first.full_name, "rust-lang/rust");
        assert_eq!(first.owner_avatar_url, "https://avatars.githubusercontent.com/u/5430905?v=4");
        assert_eq!(first.stars, 100_000);
        assert_eq!(first.open_issues, 9000);
        assert!(first.updated_at.is_some());

        let second = &normalized.records[1];
        assert_eq!(second.description, "");
        assert_eq!(second.language, "");
        assert!(second.html_url.is_none());
    }

    #[test]
    fn test_has_more() {
        let raw: SearchApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        let response: SearchResponse = raw.into();
        assert!(response.has_more());

        let json = r#"{"total_count": 0, "items": []}"#;
        let empty: SearchResponse = serde_json::from_str::<SearchApiResponse>(json).unwrap().into();
        assert!(empty.records.is_empty());
        assert!(!empty.has_more());
    }
}
