//! Error taxonomy for listing and page retrieval.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while retrieving the page listing. Any of these aborts a run.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not parse the list of wiki pages from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while retrieving or persisting a single page.
///
/// Only [`FetchError::RateLimited`] is retried by the mirror driver; every
/// other variant is treated as a hard failure for that page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} was rate limited")]
    RateLimited { url: String },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not parse the JSON from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no markdown content found for {page}")]
    EmptyContent { page: String },
    #[error("invalid page identifier {page:?}: {reason}")]
    InvalidIdentifier { page: String, reason: &'static str },
    #[error("{action} '{}' failed: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Failure that stops a whole mirror run before any page is fetched.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Listing(#[from] ListingError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("community name must not be empty")]
    EmptyCommunity,
    #[error("invalid community name {0:?}")]
    InvalidCommunity(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
