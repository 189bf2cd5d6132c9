//! Typed errors for the import engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the hosting
//! application can map every failure to a user-facing message by kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::conversation::Platform;

pub(crate) const PASTE_HINT: &str = "Open the conversation in your browser, select all of the text, \
copy it, and use the paste importer instead.";

/// Errors surfaced to callers of the import entry points.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Input rejected before any network or decoding work
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Host or path is not a supported share link
    #[error("{reason}")]
    UnsupportedSource { reason: String },

    /// The share page could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Bot protection or a consent wall answered instead of the conversation
    #[error(
        "{platform} returned a {kind} page instead of the conversation. {hint}",
        hint = PASTE_HINT
    )]
    Blocked { platform: Platform, kind: BlockKind },

    /// Page fetched, but no decoding strategy found any messages
    #[error("could not extract messages from this {platform} source. {guidance}")]
    NoStructure { platform: Platform, guidance: String },

    /// Messages were found, but none of them pair into a prompt/response step
    #[error(
        "the {platform} conversation was found but contains no prompt/response pairs; \
         the link is valid but the conversation is empty"
    )]
    EmptyConversation { platform: Platform },
}

impl ImportError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedSource {
            reason: reason.into(),
        }
    }

    /// Generic "nothing matched" failure carrying the copy-paste suggestion.
    pub(crate) fn no_structure(platform: Platform) -> Self {
        Self::no_structure_because(
            platform,
            "The conversation may be empty, deleted, or the page structure has changed.",
        )
    }

    pub(crate) fn no_structure_because(platform: Platform, cause: &str) -> Self {
        Self::NoStructure {
            platform,
            guidance: format!("{cause} {PASTE_HINT}"),
        }
    }

    /// Coarse classification for callers that map errors to responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnsupportedSource { .. } => ErrorKind::UnsupportedSource,
            Self::Fetch(_) => ErrorKind::FetchFailed,
            Self::Blocked { .. } => ErrorKind::AccessBlocked,
            Self::NoStructure { .. } => ErrorKind::NoStructure,
            Self::EmptyConversation { .. } => ErrorKind::EmptyResult,
        }
    }
}

/// Error taxonomy exposed to the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedSource,
    FetchFailed,
    AccessBlocked,
    NoStructure,
    EmptyResult,
}

/// What kind of interstitial page was served instead of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Anti-bot challenge (e.g. "Just a moment...")
    BotChallenge,
    /// Cookie-consent redirect
    ConsentWall,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BotChallenge => f.write_str("bot-protection challenge"),
            Self::ConsentWall => f.write_str("cookie-consent"),
        }
    }
}

/// Errors that can occur while retrieving a share page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("fetch failed: timed out after {}s fetching {url}", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    /// Server answered with a non-2xx status
    #[error("fetch failed: HTTP {status}, link may be expired or invalid")]
    Status { url: String, status: u16 },

    /// Connection, TLS, redirect or body read failure
    #[error("fetch failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Check whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Strategy-internal decoding failures.
///
/// These never reach callers: the strategy driver logs them and moves on
/// to the next strategy.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Embedded payload was not valid JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload had an unexpected shape
    #[error("unexpected payload shape: {0}")]
    Shape(&'static str),
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for a single decoding strategy.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_names_code() {
        let err = FetchError::Status {
            url: "https://chatgpt.com/share/x".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "fetch failed: HTTP 404, link may be expired or invalid"
        );
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct_kind() {
        let err = FetchError::Timeout {
            url: "https://claude.ai/share/x".into(),
            timeout: Duration::from_secs(15),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out after 15s"));
        assert_eq!(ImportError::from(err).kind(), ErrorKind::FetchFailed);
    }

    #[test]
    fn test_blocked_message_suggests_paste() {
        let err = ImportError::Blocked {
            platform: Platform::Claude,
            kind: BlockKind::BotChallenge,
        };
        let msg = err.to_string();
        assert!(msg.contains("Claude"));
        assert!(msg.contains("paste importer"));
        assert_eq!(err.kind(), ErrorKind::AccessBlocked);
    }

    #[test]
    fn test_no_structure_and_empty_are_distinct() {
        let none = ImportError::no_structure(Platform::ChatGpt);
        let empty = ImportError::EmptyConversation {
            platform: Platform::ChatGpt,
        };
        assert_eq!(none.kind(), ErrorKind::NoStructure);
        assert_eq!(empty.kind(), ErrorKind::EmptyResult);
        assert_ne!(none.to_string(), empty.to_string());
    }
}
