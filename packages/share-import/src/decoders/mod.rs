//! Decoders for share pages and export files.
//!
//! Each platform decoder is an ordered slice of named [`Strategy`]
//! functions. [`run_strategies`] tries them in order and keeps the first
//! one that yields messages; errors and empty results are logged and
//! skipped, so only the decoder's final outcome reaches the caller.
//!
//! # Available Decoders
//!
//! - `chatgpt` - streaming tuple payloads, `__NEXT_DATA__`, author-role markup
//! - `claude` - component-stream chunks, framework data blobs, turn classes
//! - `gemini` - `WIZ_global_data` positional blob, callback payloads
//! - `generic` - unknown hosts
//! - `export` - ChatGPT `conversations.json` / `chat.html` exports

pub mod chatgpt;
pub mod claude;
pub mod export;
pub mod fallback;
pub mod gemini;
pub mod generic;
pub mod markup;
pub mod turbo_stream;

use tracing::{debug, info, warn};

use crate::error::{BlockKind, DecodeResult, ImportError, Result};
use crate::types::conversation::{ParsedConversation, Platform, RawMessage};

/// Page size under which challenge markers are trusted. Real conversation
/// pages are much larger.
const CHALLENGE_MAX_BYTES: usize = 20_000;

const CHALLENGE_MARKERS: &[&str] = &[
    "Just a moment...",
    "challenge-platform",
    "cf-browser-verification",
];

const CONSENT_MARKER: &str = "consent.google.com";

/// Output of a single strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Title found alongside the messages, if any
    pub title: Option<String>,
    pub messages: Vec<RawMessage>,
}

impl Extracted {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            title: None,
            messages,
        }
    }

    /// Set the title, ignoring blank values.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A named decoding strategy.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&str) -> DecodeResult<Extracted>,
}

impl Strategy {
    pub const fn new(name: &'static str, run: fn(&str) -> DecodeResult<Extracted>) -> Self {
        Self { name, run }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Run strategies in order, returning the first that yields messages.
pub fn run_strategies(
    platform: Platform,
    strategies: &[Strategy],
    html: &str,
) -> Option<(&'static str, Extracted)> {
    for strategy in strategies {
        match (strategy.run)(html) {
            Ok(extracted) if !extracted.is_empty() => {
                debug!(
                    platform = platform.as_str(),
                    strategy = strategy.name,
                    messages = extracted.messages.len(),
                    "Strategy matched"
                );
                return Some((strategy.name, extracted));
            }
            Ok(_) => {
                debug!(platform = platform.as_str(), strategy = strategy.name, "Strategy found no messages");
            }
            Err(e) => {
                debug!(
                    platform = platform.as_str(),
                    strategy = strategy.name,
                    error = %e,
                    "Strategy failed"
                );
            }
        }
    }
    None
}

/// Recognize interstitial pages served in place of a conversation.
pub fn detect_block(html: &str) -> Option<BlockKind> {
    if is_bot_challenge(html) {
        return Some(BlockKind::BotChallenge);
    }
    if html.contains(CONSENT_MARKER) {
        return Some(BlockKind::ConsentWall);
    }
    None
}

/// Small page carrying an anti-bot challenge marker.
pub fn is_bot_challenge(html: &str) -> bool {
    html.len() < CHALLENGE_MAX_BYTES && CHALLENGE_MARKERS.iter().any(|m| html.contains(m))
}

/// Decode a fetched share page with the decoder for `platform`.
pub fn decode_share_page(platform: Platform, html: &str) -> Result<ParsedConversation> {
    match platform {
        Platform::ChatGpt => chatgpt::decode(html),
        Platform::Claude => claude::decode(html),
        Platform::Gemini => gemini::decode(html),
        Platform::Unknown => generic::decode(html),
    }
}

/// Common tail of every share-page decoder.
///
/// On success the title is the strategy's, else `page_title`, else
/// `default_title`. On failure a detected interstitial becomes `Blocked`
/// and anything else becomes `no_structure`.
pub(crate) fn finish(
    platform: Platform,
    html: &str,
    found: Option<(&'static str, Extracted)>,
    page_title: impl FnOnce() -> Option<String>,
    default_title: &str,
    no_structure: impl FnOnce() -> ImportError,
) -> Result<ParsedConversation> {
    let Some((strategy, extracted)) = found else {
        if let Some(kind) = detect_block(html) {
            warn!(platform = platform.as_str(), kind = ?kind, "Share page is blocked");
            return Err(ImportError::Blocked { platform, kind });
        }
        warn!(
            platform = platform.as_str(),
            page_bytes = html.len(),
            "No strategy found conversation messages"
        );
        return Err(no_structure());
    };

    let title = extracted
        .title
        .or_else(page_title)
        .unwrap_or_else(|| default_title.to_string());

    info!(
        platform = platform.as_str(),
        strategy,
        messages = extracted.messages.len(),
        "Share page decoded"
    );

    Ok(ParsedConversation::new(platform, title, extracted.messages))
}
