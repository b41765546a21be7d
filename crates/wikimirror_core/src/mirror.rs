//! Sequential mirror driver: list pages, then fetch and write each one with
//! bounded retry on rate limiting.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::api::{PageListing, RedditWikiClient, WikiApi};
use crate::config::{MirrorConfig, validate_community};
use crate::error::{FetchError, MirrorError};
use crate::layout::{WriteAction, WrittenPage, validate_page_identifier, write_page};

/// Root page of every wiki. The listing endpoint never enumerates it.
pub const INDEX_PAGE: &str = "index";
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Succeeded,
    GaveUp,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page: String,
    pub status: PageStatus,
    pub attempts: usize,
    pub path: Option<PathBuf>,
    pub action: Option<WriteAction>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    pub community: String,
    pub output_dir: PathBuf,
    pub listing_kind: String,
    pub requested_pages: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pages: Vec<PageReport>,
    pub request_count: usize,
}

pub fn mirror_wiki(
    config: MirrorConfig,
    community: &str,
    output_root: &Path,
) -> Result<MirrorReport, MirrorError> {
    let mut client = RedditWikiClient::new(config)?;
    mirror_wiki_with_api(&mut client, community, output_root)
}

/// Run a full mirror against `api`. Listing failures abort the run; page
/// failures are logged and recorded in the report.
pub fn mirror_wiki_with_api<A: WikiApi>(
    api: &mut A,
    community: &str,
    output_root: &Path,
) -> Result<MirrorReport, MirrorError> {
    validate_community(community)?;
    let listing = api.list_pages(community)?;
    log::info!(
        "Found {} wiki pages for r/{community} (kind {:?})",
        listing.pages.len(),
        listing.kind
    );

    let sequence = fetch_sequence(&listing);
    let mut report = MirrorReport {
        community: community.to_string(),
        output_dir: output_root.to_path_buf(),
        listing_kind: listing.kind,
        requested_pages: sequence.len(),
        succeeded: 0,
        failed: 0,
        pages: Vec::with_capacity(sequence.len()),
        request_count: 0,
    };

    for page in &sequence {
        let page_report = mirror_page(api, community, page, output_root);
        match page_report.status {
            PageStatus::Succeeded => report.succeeded += 1,
            PageStatus::GaveUp => report.failed += 1,
        }
        report.pages.push(page_report);
    }

    report.request_count = api.request_count();
    Ok(report)
}

/// `index` first, then the listed pages in listing order.
pub fn fetch_sequence(listing: &PageListing) -> Vec<String> {
    let mut sequence = Vec::with_capacity(listing.pages.len() + 1);
    sequence.push(INDEX_PAGE.to_string());
    sequence.extend(
        listing
            .pages
            .iter()
            .filter(|page| page.as_str() != INDEX_PAGE)
            .cloned(),
    );
    sequence
}

/// One attempt: fetch the page and write its markdown under `output_root`.
pub fn fetch_page<A: WikiApi>(
    api: &mut A,
    community: &str,
    page: &str,
    output_root: &Path,
) -> Result<WrittenPage, FetchError> {
    validate_page_identifier(page)?;
    let content = api.get_page(community, page)?;
    if content.content_md.is_empty() {
        return Err(FetchError::EmptyContent {
            page: wiki_page_name(community, page),
        });
    }
    write_page(output_root, page, &content.content_md)
}

fn mirror_page<A: WikiApi>(
    api: &mut A,
    community: &str,
    page: &str,
    output_root: &Path,
) -> PageReport {
    let wiki_page = wiki_page_name(community, page);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match fetch_page(api, community, page, output_root) {
            Ok(written) => {
                log::info!(
                    "Successfully downloaded {wiki_page} to {}",
                    written.path.display()
                );
                return PageReport {
                    page: page.to_string(),
                    status: PageStatus::Succeeded,
                    attempts,
                    path: Some(written.path),
                    action: Some(written.action),
                    detail: None,
                };
            }
            Err(error) if error.is_rate_limited() && attempts < MAX_ATTEMPTS => {
                log::warn!("Attempt {attempts} to request {wiki_page} was rate limited");
            }
            Err(error) => {
                log::error!("Could not get {wiki_page} (attempt {attempts}): {error}");
                return PageReport {
                    page: page.to_string(),
                    status: PageStatus::GaveUp,
                    attempts,
                    path: None,
                    action: None,
                    detail: Some(error.to_string()),
                };
            }
        }
    }
}

fn wiki_page_name(community: &str, page: &str) -> String {
    format!("r/{community}/wiki/{page}")
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::fs;

    use tempfile::tempdir;

    use super::{INDEX_PAGE, MAX_ATTEMPTS, PageStatus, fetch_sequence, mirror_wiki_with_api};
    use crate::api::{PageContent, PageListing, WikiApi};
    use crate::error::{FetchError, ListingError, MirrorError};
    use crate::layout::WriteAction;

    #[derive(Debug, Clone)]
    enum Scripted {
        Markdown(&'static str),
        RateLimited,
        Status(u16),
    }

    #[derive(Default)]
    struct MockApi {
        listing: Option<Vec<String>>,
        responses: BTreeMap<String, VecDeque<Scripted>>,
        page_calls: Vec<String>,
        request_count: usize,
    }

    impl MockApi {
        fn with_listing(pages: &[&str]) -> Self {
            Self {
                listing: Some(pages.iter().map(|page| page.to_string()).collect()),
                ..Self::default()
            }
        }

        fn script(mut self, page: &str, responses: &[Scripted]) -> Self {
            self.responses
                .insert(page.to_string(), responses.iter().cloned().collect());
            self
        }

        fn calls_for(&self, page: &str) -> usize {
            self.page_calls.iter().filter(|call| *call == page).count()
        }
    }

    impl WikiApi for MockApi {
        fn list_pages(&mut self, community: &str) -> Result<PageListing, ListingError> {
            self.request_count += 1;
            let url = format!("https://example.test/r/{community}/wiki/pages.json");
            match &self.listing {
                Some(pages) => Ok(PageListing {
                    kind: "Listing".to_string(),
                    pages: pages.clone(),
                }),
                None => Err(ListingError::Parse {
                    url,
                    source: serde_json::from_str::<serde_json::Value>("{malformed")
                        .expect_err("malformed json"),
                }),
            }
        }

        fn get_page(&mut self, community: &str, page: &str) -> Result<PageContent, FetchError> {
            self.request_count += 1;
            self.page_calls.push(page.to_string());
            let url = format!("https://example.test/r/{community}/wiki/{page}.json");
            let next = self
                .responses
                .get_mut(page)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Scripted::Markdown("default body"));
            match next {
                Scripted::Markdown(markdown) => Ok(PageContent {
                    revision_id: "rev".to_string(),
                    content_md: markdown.to_string(),
                    ..PageContent::default()
                }),
                Scripted::RateLimited => Err(FetchError::RateLimited { url }),
                Scripted::Status(status) => Err(FetchError::Status { url, status }),
            }
        }

        fn request_count(&self) -> usize {
            self.request_count
        }
    }

    #[test]
    fn mirrors_index_and_listed_pages_in_order() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["faq", "rules/posting"])
            .script("index", &[Scripted::Markdown("# Welcome\n")])
            .script("faq", &[Scripted::Markdown("# FAQ\n")])
            .script("rules/posting", &[Scripted::Markdown("# Posting\n")]);

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.page_calls, vec!["index", "faq", "rules/posting"]);
        assert_eq!(report.requested_pages, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.request_count, 4);
        assert_eq!(report.listing_kind, "Listing");
        assert_eq!(
            fs::read_to_string(temp.path().join("index.md")).expect("index"),
            "# Welcome\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("faq.md")).expect("faq"),
            "# FAQ\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("rules").join("posting.md")).expect("posting"),
            "# Posting\n"
        );
    }

    #[test]
    fn rate_limited_page_succeeds_on_third_attempt() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["faq"]).script(
            "faq",
            &[
                Scripted::RateLimited,
                Scripted::RateLimited,
                Scripted::Markdown("# FAQ\n"),
                Scripted::Markdown("never requested"),
            ],
        );

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.calls_for("faq"), 3);
        let faq = &report.pages[1];
        assert_eq!(faq.page, "faq");
        assert_eq!(faq.status, PageStatus::Succeeded);
        assert_eq!(faq.attempts, 3);
        assert_eq!(
            fs::read_to_string(temp.path().join("faq.md")).expect("faq"),
            "# FAQ\n"
        );
    }

    #[test]
    fn rate_limited_page_is_abandoned_after_max_attempts() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["faq", "wiki/rules"]).script(
            "faq",
            &[
                Scripted::RateLimited,
                Scripted::RateLimited,
                Scripted::RateLimited,
                Scripted::Markdown("never requested"),
            ],
        );

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.calls_for("faq"), MAX_ATTEMPTS);
        assert_eq!(report.pages[1].status, PageStatus::GaveUp);
        assert_eq!(report.pages[1].attempts, MAX_ATTEMPTS);
        assert!(!temp.path().join("faq.md").exists());
        assert_eq!(api.page_calls.last().map(String::as_str), Some("wiki/rules"));
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn hard_failure_is_not_retried() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["faq", "rules"])
            .script("faq", &[Scripted::Status(500), Scripted::Markdown("# FAQ\n")]);

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.page_calls, vec!["index", "faq", "rules"]);
        let faq = &report.pages[1];
        assert_eq!(faq.status, PageStatus::GaveUp);
        assert_eq!(faq.attempts, 1);
        assert!(
            faq.detail
                .as_deref()
                .is_some_and(|detail| detail.contains("HTTP 500"))
        );
        assert!(temp.path().join("rules.md").exists());
    }

    #[test]
    fn empty_markdown_is_a_failure_and_writes_nothing() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["blank"]).script("blank", &[Scripted::Markdown("")]);

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.calls_for("blank"), 1);
        assert_eq!(report.pages[1].status, PageStatus::GaveUp);
        assert!(
            report.pages[1]
                .detail
                .as_deref()
                .is_some_and(|detail| detail.contains("no markdown content found for r/test/wiki/blank")),
        );
        assert!(!temp.path().join("blank.md").exists());
    }

    #[test]
    fn malformed_listing_aborts_before_any_page_fetch() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::default();

        let error = mirror_wiki_with_api(&mut api, "test", temp.path()).expect_err("must fail");

        assert!(matches!(
            error,
            MirrorError::Listing(ListingError::Parse { .. })
        ));
        assert!(api.page_calls.is_empty());
        assert_eq!(fs::read_dir(temp.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn invalid_community_is_rejected_before_listing() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["faq"]);

        let error =
            mirror_wiki_with_api(&mut api, "not/valid", temp.path()).expect_err("must fail");

        assert!(matches!(error, MirrorError::Config(_)));
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn index_is_fetched_exactly_once_and_first() {
        let empty = PageListing {
            kind: "Listing".to_string(),
            pages: Vec::new(),
        };
        assert_eq!(fetch_sequence(&empty), vec![INDEX_PAGE]);

        let listed = PageListing {
            kind: "Listing".to_string(),
            pages: vec!["faq".to_string(), "index".to_string(), "rules".to_string()],
        };
        assert_eq!(fetch_sequence(&listed), vec!["index", "faq", "rules"]);
    }

    #[test]
    fn unsafe_identifier_fails_without_a_request() {
        let temp = tempdir().expect("tempdir");
        let mut api = MockApi::with_listing(&["../escape", "rules/", "faq"]);

        let report = mirror_wiki_with_api(&mut api, "test", temp.path()).expect("mirror");

        assert_eq!(api.page_calls, vec!["index", "faq"]);
        for rejected in &report.pages[1..3] {
            assert_eq!(rejected.status, PageStatus::GaveUp);
            assert_eq!(rejected.attempts, 1);
        }
        assert!(!temp.path().join("rules.md").exists());
        assert!(!temp.path().join("rules").exists());
    }

    #[test]
    fn second_run_produces_identical_files() {
        let temp = tempdir().expect("tempdir");
        let script = |api: MockApi| {
            api.script("index", &[Scripted::Markdown("# Welcome\n")])
                .script("rules/posting", &[Scripted::Markdown("# Posting\n")])
        };

        let mut first_api = script(MockApi::with_listing(&["rules/posting"]));
        let first = mirror_wiki_with_api(&mut first_api, "test", temp.path()).expect("first run");
        let posting = temp.path().join("rules").join("posting.md");
        let first_bytes = fs::read(&posting).expect("first read");

        let mut second_api = script(MockApi::with_listing(&["rules/posting"]));
        let second =
            mirror_wiki_with_api(&mut second_api, "test", temp.path()).expect("second run");

        assert_eq!(fs::read(&posting).expect("second read"), first_bytes);
        assert!(
            first
                .pages
                .iter()
                .all(|page| page.action == Some(WriteAction::Created))
        );
        assert!(
            second
                .pages
                .iter()
                .all(|page| page.action == Some(WriteAction::Unchanged))
        );
    }
}
