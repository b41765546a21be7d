pub mod api;
pub mod config;
pub mod error;
pub mod layout;
pub mod mirror;
pub mod throttle;

pub use api::{PageContent, PageListing, RedditWikiClient, WikiApi};
pub use config::MirrorConfig;
pub use error::{ConfigError, FetchError, ListingError, MirrorError};
pub use layout::{WriteAction, WrittenPage, page_destination};
pub use mirror::{MirrorReport, PageReport, PageStatus, mirror_wiki, mirror_wiki_with_api};
