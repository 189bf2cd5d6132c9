//! Fetcher trait for retrieving share pages.
//!
//! The import pipeline never talks to the network directly. It asks a
//! [`PageFetcher`] for the HTML behind a share link, so tests can swap in
//! [`MockFetcher`](crate::fetchers::MockFetcher) and hosts can supply
//! their own transport.
//!
//! # Usage
//!
//! ```rust,ignore
//! use share_import::traits::fetcher::PageFetcher;
//!
//! let page = fetcher.fetch("https://chatgpt.com/share/abc").await?;
//! println!("{} bytes from {}", page.html.len(), page.final_url);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// Raw HTML of a share page, before any decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// HTTP status of the final response
    pub status: u16,

    /// Response body, decoded as text
    pub html: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// Create a 200 page with no redirect.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            html: html.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the post-redirect URL.
    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }

    /// Set the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Whether a redirect moved the request to another URL.
    pub fn was_redirected(&self) -> bool {
        self.url != self.final_url
    }

    /// Check if this page has content.
    pub fn has_content(&self) -> bool {
        !self.html.trim().is_empty()
    }
}

/// Retrieves the HTML behind a share link.
///
/// Implementations:
/// - `HttpFetcher` - reqwest with browser-like headers
/// - `MockFetcher` - canned pages for tests
///
/// A fetcher reports only transport failures. Interstitial pages (bot
/// challenges, consent walls) come back as ordinary pages; recognizing
/// them is the decoders' job.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL, following redirects.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
