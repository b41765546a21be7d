//! Wiki JSON API: response shapes, the [`WikiApi`] seam and its HTTP client.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::MirrorConfig;
use crate::error::{ConfigError, FetchError, ListingError};
use crate::throttle::RequestThrottle;

/// Page identifiers offered by the listing endpoint, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageListing {
    pub kind: String,
    pub pages: Vec<String>,
}

/// Decoded `data` object of a single wiki page response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub revision_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_md: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_html: String,
    /// Only present on removed pages.
    #[serde(default)]
    pub reason: Option<Value>,
}

pub trait WikiApi {
    fn list_pages(&mut self, community: &str) -> Result<PageListing, ListingError>;
    fn get_page(&mut self, community: &str, page: &str) -> Result<PageContent, FetchError>;
    fn request_count(&self) -> usize;
}

pub struct RedditWikiClient {
    client: Client,
    config: MirrorConfig,
    throttle: RequestThrottle,
    request_count: usize,
}

impl RedditWikiClient {
    pub fn new(config: MirrorConfig) -> Result<Self, ConfigError> {
        Self::with_throttle(config, RequestThrottle::default())
    }

    pub(crate) fn with_throttle(
        config: MirrorConfig,
        throttle: RequestThrottle,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            config,
            throttle,
            request_count: 0,
        })
    }

    fn listing_url(&self, community: &str) -> String {
        format!("{}pages.json", self.config.wiki_root(community))
    }

    fn page_url(&self, community: &str, page: &str) -> String {
        format!("{}{page}.json", self.config.wiki_root(community))
    }

    /// Issue one throttled GET and read the whole body.
    fn get_text(&mut self, url: &str) -> Result<(StatusCode, String), reqwest::Error> {
        self.throttle.wait();
        self.request_count += 1;
        log::debug!("GET {url}");
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;
        Ok((status, body))
    }
}

impl WikiApi for RedditWikiClient {
    fn list_pages(&mut self, community: &str) -> Result<PageListing, ListingError> {
        let url = self.listing_url(community);
        let (status, body) = self
            .get_text(&url)
            .map_err(|source| ListingError::Network {
                url: url.clone(),
                source,
            })?;
        if !status.is_success() {
            return Err(ListingError::Status {
                url,
                status: status.as_u16(),
            });
        }
        parse_listing(&body).map_err(|source| ListingError::Parse { url, source })
    }

    fn get_page(&mut self, community: &str, page: &str) -> Result<PageContent, FetchError> {
        let url = self.page_url(community, page);
        let (status, body) = self.get_text(&url).map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        classify_status(&url, status)?;
        parse_page(&body).map_err(|source| FetchError::Parse { url, source })
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// 200 proceeds, 429 is the distinguished rate-limit signal, anything else
/// is a hard failure.
fn classify_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
            url: url.to_string(),
        }),
        other => Err(FetchError::Status {
            url: url.to_string(),
            status: other.as_u16(),
        }),
    }
}

pub fn parse_listing(body: &str) -> Result<PageListing, serde_json::Error> {
    let response: ListingResponse = serde_json::from_str(body)?;
    Ok(PageListing {
        kind: response.kind,
        pages: response.data,
    })
}

pub fn parse_page(body: &str) -> Result<PageContent, serde_json::Error> {
    let response: PageResponse = serde_json::from_str(body)?;
    Ok(response.data)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    kind: String,
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    data: PageContent,
}
