//! HTTP-based fetcher implementation.
//!
//! Requests share pages with desktop-browser headers so the vendors serve
//! the same server-rendered markup a person would see.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::pipeline::classify::classify_url;
use crate::traits::fetcher::{FetchedPage, PageFetcher};
use crate::types::config::FetchConfig;
use crate::types::conversation::Platform;

/// Fetcher that retrieves share pages over HTTP(S).
///
/// # Example
///
/// ```rust,ignore
/// use share_import::fetchers::HttpFetcher;
/// use share_import::FetchConfig;
///
/// let fetcher = HttpFetcher::new(FetchConfig::default())?;
/// let page = fetcher.fetch("https://claude.ai/share/abc").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Build a fetcher whose client carries the configured headers.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (ACCEPT, &config.accept),
            (ACCEPT_LANGUAGE, &config.accept_language),
        ] {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(e) => {
                    warn!(header = %name, error = %e, "Invalid header value in fetch config, header not sent");
                }
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, config })
    }

    /// Set a custom HTTP client. Header defaults then come from that client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if classify_url(url) == Platform::Gemini {
            if let Some(cookie) = &self.config.consent_cookie {
                request = request.header(COOKIE, cookie.as_str());
            }
        }
        // Per-request UA so with_client() callers still look like a browser
        request.header(USER_AGENT, self.config.user_agent.as_str())
    }

    async fn fetch_inner(&self, url: &str) -> FetchResult<FetchedPage> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Share page returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(url, e))?;

        Ok(FetchedPage::new(url, html)
            .with_final_url(final_url)
            .with_status(status.as_u16()))
    }

    fn map_reqwest_error(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout: self.config.timeout,
            };
        }
        warn!(url = %url, error = %error, "HTTP request failed");
        FetchError::Network {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, timeout_ms = self.config.timeout.as_millis() as u64, "HTTP fetch starting");

        // The deadline covers the body read, not just the headers
        let page = tokio::time::timeout(self.config.timeout, self.fetch_inner(url))
            .await
            .map_err(|_| {
                warn!(url = %url, "HTTP fetch timed out");
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.config.timeout,
                }
            })??;

        debug!(
            url = %url,
            final_url = %page.final_url,
            content_length = page.html.len(),
            "Share page fetched"
        );

        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builds_with_default_config() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        assert_eq!(fetcher.name(), "http");
        assert_eq!(fetcher.config().max_redirects, 10);
    }

    #[test]
    fn test_invalid_header_value_is_skipped() {
        let config = FetchConfig::default().with_accept_language("en-US\nX-Injected: 1");
        let fetcher = HttpFetcher::new(config).unwrap();
        assert_eq!(fetcher.name(), "http");
    }

    #[test]
    fn test_consent_cookie_only_for_gemini() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();

        let gemini = fetcher
            .request("https://gemini.google.com/share/abc")
            .build()
            .unwrap();
        assert!(gemini
            .headers()
            .get(COOKIE)
            .is_some_and(|v| v.to_str().unwrap().contains("CONSENT=")));

        let chatgpt = fetcher
            .request("https://chatgpt.com/share/abc")
            .build()
            .unwrap();
        assert!(chatgpt.headers().get(COOKIE).is_none());
    }

    #[test]
    fn test_consent_cookie_can_be_disabled() {
        let config = FetchConfig::default()
            .without_consent_cookie()
            .with_timeout(Duration::from_secs(1));
        let fetcher = HttpFetcher::new(config).unwrap();

        let request = fetcher
            .request("https://gemini.google.com/share/abc")
            .build()
            .unwrap();
        assert!(request.headers().get(COOKIE).is_none());
        assert!(request
            .headers()
            .get(USER_AGENT)
            .is_some_and(|v| v.to_str().unwrap().contains("Chrome/")));
    }
}
