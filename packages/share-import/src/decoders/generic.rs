//! Decoder for pages from unrecognized hosts.

use super::{fallback, finish, markup, run_strategies, turbo_stream, Strategy};
use crate::error::{ImportError, Result};
use crate::types::conversation::{ParsedConversation, Platform};

const DEFAULT_TITLE: &str = "Shared Conversation";

pub const STRATEGIES: &[Strategy] = &[
    Strategy::new("turbo_stream", turbo_stream::decode),
    Strategy::new("json_scripts", fallback::scan_json_scripts),
    Strategy::new("generic_markup", fallback::scan_markup),
];

/// Decode a page with only the platform-neutral strategies.
pub fn decode(html: &str) -> Result<ParsedConversation> {
    let found = run_strategies(Platform::Unknown, STRATEGIES, html);
    finish(
        Platform::Unknown,
        html,
        found,
        || markup::page_title(html),
        DEFAULT_TITLE,
        || ImportError::no_structure(Platform::Unknown),
    )
}
