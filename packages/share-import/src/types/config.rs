//! Configuration types for fetching and input validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Desktop Chrome user agent. Share pages serve degraded or empty markup
/// to unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Pre-seeded cookie that skips the Google consent interstitial.
pub const GOOGLE_CONSENT_COOKIE: &str =
    "CONSENT=PENDING+987; SOCS=CAESEwgDEgk2MjczOTEyOTYaAmVuIAEaBgiA_J-6Bg";

/// Configuration for the share-page fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whole-request deadline, including the body read.
    ///
    /// Default: 15 seconds.
    pub timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Accept header
    pub accept: String,

    /// Accept-Language header
    pub accept_language: String,

    /// Maximum redirects followed before giving up.
    ///
    /// Default: 10.
    pub max_redirects: usize,

    /// Cookie sent to Gemini hosts only. `None` disables it.
    pub consent_cookie: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            max_redirects: 10,
            consent_cookie: Some(GOOGLE_CONSENT_COOKIE.to_string()),
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the Accept-Language header.
    pub fn with_accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = value.into();
        self
    }

    /// Set the redirect limit.
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Don't send the consent cookie to Gemini.
    pub fn without_consent_cookie(mut self) -> Self {
        self.consent_cookie = None;
        self
    }
}

/// Input size limits applied before decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLimits {
    /// Largest export file accepted, in bytes. Default: 10 MB.
    pub max_export_bytes: usize,

    /// Longest paste accepted, in characters. Default: 500,000.
    pub max_paste_chars: usize,

    /// Shortest paste accepted after trimming. Default: 20.
    pub min_paste_chars: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_export_bytes: 10 * 1024 * 1024,
            max_paste_chars: 500_000,
            min_paste_chars: 20,
        }
    }
}

impl ImportLimits {
    /// No upper bounds; only the minimum paste length applies.
    pub fn unbounded() -> Self {
        Self {
            max_export_bytes: usize::MAX,
            max_paste_chars: usize::MAX,
            ..Default::default()
        }
    }

    pub fn with_max_export_bytes(mut self, bytes: usize) -> Self {
        self.max_export_bytes = bytes;
        self
    }

    pub fn with_max_paste_chars(mut self, chars: usize) -> Self {
        self.max_paste_chars = chars;
        self
    }

    /// Reject export contents over the byte limit.
    pub fn check_export(&self, content: &str) -> Result<()> {
        if content.len() > self.max_export_bytes {
            return Err(ImportError::invalid(format!(
                "export file is {} bytes, larger than the {} byte limit",
                content.len(),
                self.max_export_bytes
            )));
        }
        Ok(())
    }

    /// Reject pastes that are too short or too long.
    pub fn check_paste(&self, text: &str) -> Result<()> {
        let len = text.trim().chars().count();
        if len < self.min_paste_chars {
            return Err(ImportError::invalid(format!(
                "text is too short to be a conversation (minimum {} characters)",
                self.min_paste_chars
            )));
        }
        if len > self.max_paste_chars {
            return Err(ImportError::invalid(format!(
                "text is {len} characters, longer than the {} character limit",
                self.max_paste_chars
            )));
        }
        Ok(())
    }
}
