//! Import entry points.
//!
//! [`Importer`] ties the pipeline together: share links are classified,
//! fetched through a [`PageFetcher`], decoded and turned into steps. Export
//! files and pasted text need no network and are passed straight through.

use tracing::{info, warn};
use url::Url;

use super::classify::{classify_url, is_share_url};
use super::paste::parse_pasted_text;
use super::steps::build_steps;
use crate::decoders::{decode_share_page, export};
use crate::error::{ImportError, Result};
use crate::fetchers::HttpFetcher;
use crate::traits::fetcher::PageFetcher;
use crate::types::config::FetchConfig;
use crate::types::conversation::{ParsedConversation, Platform};
use crate::types::step::{ExportImport, PasteImport, ShareImport};

/// Confidence assigned to structurally decoded share pages.
const SHARE_URL_CONFIDENCE: f32 = 0.9;

const SUPPORTED_LINKS: &str = "Unsupported link. Supported formats: chatgpt.com/share/..., \
chat.openai.com/share/..., claude.ai/share/..., gemini.google.com/share/..., g.co/gemini/share/...";

const NOT_A_SHARE_LINK: &str =
    "This doesn't look like a share link. Make sure the URL contains '/share/'.";

/// Conversation importer.
///
/// # Example
///
/// ```rust,ignore
/// use share_import::{FetchConfig, Importer};
///
/// let importer = Importer::with_http(FetchConfig::default())?;
/// let import = importer.import_from_url("https://chatgpt.com/share/abc").await?;
/// for step in &import.steps {
///     println!("{}", step.title);
/// }
/// ```
pub struct Importer<F: PageFetcher> {
    fetcher: F,
}

impl Importer<HttpFetcher> {
    /// Importer backed by the real HTTP fetcher.
    pub fn with_http(config: FetchConfig) -> Result<Self> {
        Ok(Self::new(HttpFetcher::new(config)?))
    }
}

impl<F: PageFetcher> Importer<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and decode a share link.
    pub async fn extract_from_url(&self, url: &str) -> Result<ParsedConversation> {
        let url = url.trim();
        let parsed = Url::parse(url).map_err(|e| ImportError::invalid(format!("not a valid URL: {e}")))?;

        let platform = classify_url(parsed.as_str());
        if platform == Platform::Unknown {
            return Err(ImportError::unsupported(SUPPORTED_LINKS));
        }
        if !is_share_url(parsed.as_str()) {
            return Err(ImportError::unsupported(NOT_A_SHARE_LINK));
        }

        let page = self.fetcher.fetch(url).await.map_err(|e| {
            warn!(url = %url, fetcher = self.fetcher.name(), error = %e, "Share page fetch failed");
            e
        })?;

        if page.was_redirected() {
            info!(url = %url, final_url = %page.final_url, "Share link redirected");
        }

        decode_share_page(platform, &page.html)
    }

    /// Fetch, decode and build steps for a share link.
    pub async fn import_from_url(&self, url: &str) -> Result<ShareImport> {
        let conversation = self.extract_from_url(url).await?;
        let platform = conversation.platform;

        let steps = build_steps(&conversation.dialogue());
        if steps.is_empty() {
            return Err(ImportError::EmptyConversation { platform });
        }

        info!(
            url = %url.trim(),
            platform = platform.as_str(),
            steps = steps.len(),
            "Share link imported"
        );

        Ok(ShareImport {
            title: conversation.title,
            description: format!(
                "Imported from {} shared link with {} steps.",
                platform.label(),
                steps.len()
            ),
            platform,
            source: format!("{}-share-url", platform.as_str()),
            confidence: SHARE_URL_CONFIDENCE,
            steps,
        })
    }

    /// Decode an uploaded export file.
    pub fn extract_from_export_file(&self, filename: &str, content: &str) -> Result<ExportImport> {
        export::extract_from_export_file(filename, content)
    }

    /// Parse pasted conversation text.
    pub fn extract_from_pasted_text(&self, text: &str) -> Result<PasteImport> {
        parse_pasted_text(text)
    }
}
