//! HTTP catalog client.

use crate::error::{CatalogError, Result};
use crate::types::{CatalogConfig, SearchResponse, SearchResult, MAX_SEARCH_RESULTS};
use async_trait::async_trait;
use lofi_core::{CatalogProvider, FetchedTrack};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Fetches tracks by direct URL or by searching a catalog endpoint.
///
/// # Example
///
/// ```ignore
/// use lofi_catalog::{CatalogConfig, HttpCatalogProvider};
/// use lofi_core::CatalogProvider;
///
/// let catalog = HttpCatalogProvider::new(CatalogConfig::new("http://localhost:3000/api/search-song"))?;
/// let track = catalog.fetch_track("rainy day").await?;
/// println!("{} ({} bytes)", track.name, track.bytes.len());
/// ```
#[derive(Debug, Clone)]
pub struct HttpCatalogProvider {
    http: Client,
    search_url: Url,
    download_proxy: Option<Url>,
}

impl HttpCatalogProvider {
    /// Create a provider for the given catalog.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let search_url = parse_http_url(&config.search_url)?;
        let download_proxy = config
            .download_proxy
            .as_deref()
            .map(parse_http_url)
            .transpose()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("LofiPlayer/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            search_url,
            download_proxy,
        })
    }

    /// Search the catalog.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("q", query);
        debug!(url = %url, "Searching catalog");

        let response = check_status(self.http.get(url).send().await?).await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("Invalid search response: {e}")))?;

        Ok(body.results)
    }

    /// Download raw bytes from a direct link.
    pub async fn download(&self, link: &str) -> Result<Vec<u8>> {
        let url = match &self.download_proxy {
            Some(proxy) => {
                let mut url = proxy.clone();
                url.query_pairs_mut().append_pair("url", link);
                url
            }
            None => parse_http_url(link)?,
        };
        debug!(url = %url, "Downloading track");

        let response = check_status(self.http.get(url).send().await?).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(CatalogError::EmptyDownload(link.to_string()));
        }
        Ok(bytes.to_vec())
    }

    async fn fetch(&self, query_or_url: &str) -> Result<FetchedTrack> {
        let query_or_url = query_or_url.trim();
        if query_or_url.is_empty() {
            return Err(CatalogError::NotFound(String::new()));
        }

        if let Some(url) = direct_url(query_or_url) {
            let bytes = self.download(url.as_str()).await?;
            let name = file_name(&url).unwrap_or_else(|| url.to_string());
            info!(name = %name, bytes = bytes.len(), "Fetched track by URL");
            return Ok(FetchedTrack {
                bytes,
                name,
                locator: url.to_string(),
            });
        }

        let results = self.search(query_or_url).await?;
        let hit = results
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .find_map(|result| {
                let link = result.download_link.clone()?;
                Some((result, link))
            });
        let Some((result, link)) = hit else {
            return Err(CatalogError::NotFound(query_or_url.to_string()));
        };

        let bytes = self.download(&link).await?;
        let name = result.display_name();
        info!(query = %query_or_url, name = %name, bytes = bytes.len(), "Fetched track from search");
        Ok(FetchedTrack {
            bytes,
            name,
            locator: link,
        })
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalogProvider {
    async fn fetch_track(&self, query_or_url: &str) -> lofi_core::Result<FetchedTrack> {
        Ok(self.fetch(query_or_url).await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(CatalogError::ServerError {
        status: status.as_u16(),
        message,
    })
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| CatalogError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::InvalidUrl(format!(
            "{raw}: URL must start with http:// or https://"
        )));
    }
    Ok(url)
}

/// The input as a URL if it is one, else `None` (treat as a search query)
fn direct_url(input: &str) -> Option<Url> {
    parse_http_url(input).ok().filter(|url| url.host().is_some())
}

/// Decoded last path segment
fn file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = url::form_urlencoded::parse(segment.as_bytes())
        .map(|(key, value)| {
            if value.is_empty() {
                key.into_owned()
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_are_not_urls() {
        assert!(direct_url("rainy day").is_none());
        assert!(direct_url("ftp://host/file.mp3").is_none());
        assert!(direct_url("https://cdn.example/a.mp3").is_some());
    }

    #[test]
    fn file_name_is_last_segment() {
        let url = Url::parse("https://cdn.example/music/Rainy%20Day.mp3").unwrap();
        assert_eq!(file_name(&url).as_deref(), Some("Rainy Day.mp3"));

        let root = Url::parse("https://cdn.example/").unwrap();
        assert_eq!(file_name(&root), None);
    }

    #[test]
    fn rejects_bad_search_url() {
        assert!(matches!(
            HttpCatalogProvider::new(CatalogConfig::new("not a url")),
            Err(CatalogError::InvalidUrl(_))
        ));
    }
}
