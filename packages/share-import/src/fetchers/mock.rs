//! Mock fetcher for testing.
//!
//! Provides a configurable mock implementation of the PageFetcher trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchedPage, PageFetcher};

/// Failure the mock reports for a URL instead of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Non-2xx response
    Status(u16),
    /// Deadline exceeded
    Timeout,
}

/// Mock fetcher for testing.
///
/// Unknown URLs answer with a 404, like an expired share link.
/// Clones share pages and call history.
///
/// # Example
///
/// ```rust
/// use share_import::fetchers::MockFetcher;
///
/// let mock = MockFetcher::new()
///     .with_html("https://chatgpt.com/share/abc", "<html>...</html>");
/// assert_eq!(mock.fetch_call_count(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Canned pages indexed by URL
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    failures: Arc<RwLock<HashMap<String, MockFailure>>>,
    /// Track calls for verification
    fetch_calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    /// Create a new empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page that will be returned by fetch.
    pub fn add_page(&self, page: FetchedPage) {
        let mut pages = self.pages.write().unwrap();
        pages.insert(page.url.clone(), page);
    }

    /// Make fetching `url` fail.
    pub fn add_failure(&self, url: impl Into<String>, failure: MockFailure) {
        self.failures.write().unwrap().insert(url.into(), failure);
    }

    /// Create a mock with a pre-configured page (builder pattern).
    pub fn with_page(self, page: FetchedPage) -> Self {
        self.add_page(page);
        self
    }

    /// Shorthand for a 200 page with the given body.
    pub fn with_html(self, url: &str, html: impl Into<String>) -> Self {
        self.with_page(FetchedPage::new(url, html))
    }

    /// Create a mock that fails for `url` (builder pattern).
    pub fn with_failure(self, url: impl Into<String>, failure: MockFailure) -> Self {
        self.add_failure(url, failure);
        self
    }

    /// Get the number of times fetch was called.
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }

    /// Get the URLs that were requested via fetch.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.read().unwrap().clone()
    }

    /// Clear all pages, failures and calls.
    pub fn reset(&self) {
        self.pages.write().unwrap().clear();
        self.failures.write().unwrap().clear();
        self.fetch_calls.write().unwrap().clear();
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.fetch_calls.write().unwrap().push(url.to_string());

        if let Some(failure) = self.failures.read().unwrap().get(url) {
            return Err(match failure {
                MockFailure::Status(status) => FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                },
                MockFailure::Timeout => FetchError::Timeout {
                    url: url.to_string(),
                    timeout: Duration::from_secs(15),
                },
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
