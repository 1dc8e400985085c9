//! HTTP track catalog for Lofi Player.
//!
//! [`HttpCatalogProvider`] implements [`lofi_core::CatalogProvider`]: a
//! direct `http(s)` URL is downloaded as-is, anything else is sent to a
//! search endpoint and the first result with a download link is fetched.
//!
//! The search endpoint answers `GET {search_url}?q={query}` with
//!
//! ```json
//! { "query": "rain", "results": [
//!   { "title": "Rain", "artist": "Someone", "songPageUrl": "...",
//!     "id": "song-0", "downloadLink": "https://.../rain.mp3" } ] }
//! ```

mod client;
mod error;
mod types;

pub use client::HttpCatalogProvider;
pub use error::{CatalogError, Result};
pub use types::{CatalogConfig, SearchResponse, SearchResult, MAX_SEARCH_RESULTS};
