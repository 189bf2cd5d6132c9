//! Cross-Platform Conversation Import Library
//!
//! Turns an AI chat conversation into a normalized list of prompt/response
//! steps. Three kinds of input are accepted:
//!
//! - a live share link (ChatGPT, Claude, Gemini)
//! - a ChatGPT data export (`conversations.json` or `chat.html`)
//! - text copied from any chat window
//!
//! Vendor share pages embed their conversations in undocumented, drifting
//! formats. Every platform decoder therefore tries an ordered list of
//! strategies and falls back to generic heuristics; failures are reported
//! by kind (unreachable, blocked, no structure, empty) so the host can
//! point the user to the paste importer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use share_import::{FetchConfig, Importer};
//!
//! let importer = Importer::with_http(FetchConfig::default())?;
//!
//! // Share link
//! let shared = importer.import_from_url("https://claude.ai/share/abc123").await?;
//!
//! // Export file
//! let export = importer.extract_from_export_file("conversations.json", &contents)?;
//!
//! // Pasted text
//! let pasted = importer.extract_from_pasted_text("User: hi\nChatGPT: Hello!")?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - The `PageFetcher` abstraction
//! - [`types`] - Messages, steps, result envelopes and configuration
//! - [`pipeline`] - Classification, step building, paste parsing, `Importer`
//! - [`decoders`] - Per-platform share page decoders and the export decoder
//! - [`fetchers`] - Fetcher implementations (HttpFetcher, MockFetcher)
//! - [`testing`] - Fixture builders for every wire format

pub mod decoders;
pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{BlockKind, DecodeError, ErrorKind, FetchError, ImportError, Result};
pub use traits::fetcher::{FetchedPage, PageFetcher};
pub use types::{
    config::{FetchConfig, ImportLimits},
    conversation::{ParsedConversation, Platform, RawMessage, Role, TextPlatform},
    step::{ConversationSummary, ExportImport, ExportSource, PasteImport, ShareImport, Step},
};

// Re-export pipeline components
pub use pipeline::{
    build_steps, classify_text, classify_url, is_share_url, parse_pasted_text, Importer,
    TextClassification,
};

// Re-export decoders
pub use decoders::{decode_share_page, export::extract_from_export_file};

// Re-export fetchers
pub use fetchers::{HttpFetcher, MockFailure, MockFetcher};
