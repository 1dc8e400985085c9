//! Catalog configuration and wire types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Most search results considered when picking a track
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Search endpoint, queried as `{search_url}?q={query}`
    pub search_url: String,
    /// Optional download proxy, queried as `{download_proxy}?url={link}`
    pub download_proxy: Option<String>,
    /// Per-request timeout
    #[serde(with = "secs")]
    pub timeout: Duration,
}

impl CatalogConfig {
    /// Create a config with no download proxy.
    pub fn new(search_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
            download_proxy: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Route downloads through a proxy endpoint.
    #[must_use]
    pub fn with_download_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.download_proxy = Some(proxy.into());
        self
    }
}

/// Search endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub song_page_url: String,
    #[serde(default)]
    pub id: String,
    /// Direct audio link; absent when the page had none
    #[serde(default)]
    pub download_link: Option<String>,
}

impl SearchResult {
    /// "Title - Artist", or just the title when the artist is unknown
    pub fn display_name(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, artist)
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
