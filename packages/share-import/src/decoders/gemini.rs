//! Gemini share page decoder.
//!
//! Gemini embeds the shared conversation in `window.WIZ_global_data` under
//! the `DnVkpd` key: a flat string of fields joined by a non-ASCII
//! separator, four fields per turn (prompt, image url, dark image url,
//! response). The separator is not stable across encodings, so it is
//! discovered from the text right before the first asset URL.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::markup::{self, dialogue_role};
use super::{fallback, finish, run_strategies, turbo_stream, Extracted, Strategy};
use crate::error::{DecodeResult, ImportError, Result};
use crate::types::conversation::{ParsedConversation, Platform, RawMessage, Role};

const DEFAULT_TITLE: &str = "Gemini Shared Conversation";

/// Asset URL that follows every prompt in the positional blob.
const ASSET_ANCHOR: &str = "https://www.gstatic.com/lamda/";

/// Title of the Google consent interstitial.
const CONSENT_TITLE_MARKER: &str = "direct access to Google";

const BLOB_KEY: &str = "DnVkpd";
const MIN_BLOB_CHARS: usize = 20;

static RE_WIZ_GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.WIZ_global_data\s*=\s*(\{.*?\})\s*;?\s*</script>").unwrap()
});
static RE_INIT_CALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)AF_initDataCallback\(\{[^}]*data:\s*(.*?)\}\s*\)").unwrap()
});
static RE_JSON_OR_NONCE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*(?:type="application/json"|nonce)[^>]*>(.*?)</script>"#)
        .unwrap()
});
static RE_TURN_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)class="[^"]*(query-text|user-query|prompt-text|response-text|model-response|response-container)"#,
    )
    .unwrap()
});
static RE_ROLE_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-(?:message-)?(?:author-)?role="(user|model|assistant)""#).unwrap()
});
static RE_TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-|]?\s*(?:Google\s*)?Gemini\s*$").unwrap());

pub const STRATEGIES: &[Strategy] = &[
    Strategy::new("wiz_global_data", wiz_global_data),
    Strategy::new("turbo_stream", turbo_stream::decode),
    Strategy::new("init_data_callbacks", init_data_callbacks),
    Strategy::new("json_scripts", json_scripts),
    Strategy::new("turn_classes", turn_classes),
    Strategy::new("role_attributes", role_attributes),
    Strategy::new("generic_markup", fallback::scan_markup),
];

/// Decode a Gemini share page.
pub fn decode(html: &str) -> Result<ParsedConversation> {
    let found = run_strategies(Platform::Gemini, STRATEGIES, html);
    finish(
        Platform::Gemini,
        html,
        found,
        || page_title(html),
        DEFAULT_TITLE,
        || ImportError::no_structure(Platform::Gemini),
    )
}

fn page_title(html: &str) -> Option<String> {
    markup::page_title_without(html, &RE_TITLE_SUFFIX).filter(|t| !t.contains(CONSENT_TITLE_MARKER))
}

fn wiz_global_data(html: &str) -> DecodeResult<Extracted> {
    let Some(caps) = RE_WIZ_GLOBAL.captures(html) else {
        return Ok(Extracted::default());
    };
    let data: Value = serde_json::from_str(&caps[1])?;

    match data.get(BLOB_KEY).and_then(Value::as_str) {
        Some(blob) if blob.chars().count() > MIN_BLOB_CHARS => {
            Ok(Extracted::new(parse_positional_blob(blob)))
        }
        _ => Ok(Extracted::default()),
    }
}

/// Find the field separator: the run of non-ASCII characters directly
/// before the first asset URL.
pub fn discover_field_separator(raw: &str) -> Option<&str> {
    let anchor = raw.find(ASSET_ANCHOR)?;
    if anchor < 1 {
        return None;
    }

    let start = raw[..anchor]
        .char_indices()
        .rev()
        .take_while(|(_, c)| !c.is_ascii())
        .last()
        .map(|(idx, _)| idx)?;

    Some(&raw[start..anchor])
}

/// Walk the blob's fields in groups of four.
pub fn parse_positional_blob(raw: &str) -> Vec<RawMessage> {
    let Some(separator) = discover_field_separator(raw) else {
        return Vec::new();
    };
    let fields: Vec<&str> = raw.split(separator).collect();

    let mut messages = Vec::new();
    for group in fields.chunks(4) {
        let prompt = strip_turn_prefix(group[0]).trim();
        if prompt.is_empty() {
            continue;
        }
        messages.push(RawMessage::user(prompt));

        let response = group.get(3).map(|r| r.trim()).unwrap_or_default();
        if !response.is_empty() {
            messages.push(RawMessage::assistant(markup::strip_html(response)));
        }
    }

    messages
}

/// Later prompts start with the turn separator; drop everything before the
/// first printable ASCII character.
fn strip_turn_prefix(field: &str) -> &str {
    match field.find(|c: char| (' '..='~').contains(&c)) {
        Some(idx) if idx > 0 => &field[idx..],
        _ => field,
    }
}

/// `AF_initDataCallback({... data: [...]})` payloads.
fn init_data_callbacks(html: &str) -> DecodeResult<Extracted> {
    Ok(fallback::scan_json_bodies(markup::captured_bodies(
        html,
        &RE_INIT_CALLBACK,
    )))
}

fn json_scripts(html: &str) -> DecodeResult<Extracted> {
    Ok(fallback::scan_json_bodies(markup::captured_bodies(
        html,
        &RE_JSON_OR_NONCE_SCRIPT,
    )))
}

fn turn_classes(html: &str) -> DecodeResult<Extracted> {
    let role_of = |class: &str| {
        let class = class.to_ascii_lowercase();
        if class.starts_with("query") || class.starts_with("user") || class.starts_with("prompt") {
            Some(Role::User)
        } else {
            Some(Role::Assistant)
        }
    };
    Ok(Extracted::new(markup::slice_turns(html, &RE_TURN_CLASS, role_of)))
}

fn role_attributes(html: &str) -> DecodeResult<Extracted> {
    Ok(Extracted::new(markup::slice_turns(html, &RE_ROLE_DATA, dialogue_role)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BlockKind, ErrorKind};
    use crate::testing::{consent_wall_page, gemini_blob, gemini_wiz_page};

    #[test]
    fn test_discover_field_separator() {
        let raw = "Hello✧https://www.gstatic.com/lamda/images/a.png✧x";
        assert_eq!(discover_field_separator(raw), Some("✧"));

        // Garbled multi-character separators are kept whole
        let raw = "Hello\u{e2}\u{9c}\u{a7}https://www.gstatic.com/lamda/a.png";
        assert_eq!(discover_field_separator(raw), Some("\u{e2}\u{9c}\u{a7}"));
    }

    #[test]
    fn test_separator_requires_non_ascii_before_anchor() {
        assert_eq!(discover_field_separator("https://www.gstatic.com/lamda/a"), None);
        assert_eq!(discover_field_separator("text https://www.gstatic.com/lamda/a"), None);
        assert_eq!(discover_field_separator("no anchor here ✧"), None);
    }

    #[test]
    fn test_parse_positional_blob() {
        let blob = gemini_blob(&[
            ("What is Rust?", "<p>A systems programming language.</p>"),
            ("Is it fast?", "Yes, comparable to C++."),
        ]);

        let messages = parse_positional_blob(&blob);
        assert_eq!(
            messages,
            vec![
                RawMessage::user("What is Rust?"),
                RawMessage::assistant("A systems programming language."),
                RawMessage::user("Is it fast?"),
                RawMessage::assistant("Yes, comparable to C++."),
            ]
        );
    }

    #[test]
    fn test_decode_wiz_page_with_title() {
        let html = gemini_wiz_page(
            "Rust basics - Google Gemini",
            &[("Explain traits", "Traits define shared behavior.")],
        );

        let conv = decode(&html).unwrap();
        assert_eq!(conv.platform, Platform::Gemini);
        assert_eq!(conv.title, "Rust basics");
        assert_eq!(conv.messages.len(), 2);
    }

    #[test]
    fn test_consent_wall_is_blocked() {
        let err = decode(&consent_wall_page()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Blocked {
                kind: BlockKind::ConsentWall,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::AccessBlocked);
    }

    #[test]
    fn test_consent_title_ignored() {
        let html = "<title>Before you continue to get direct access to Google</title>";
        assert_eq!(page_title(html), None);
    }

    #[test]
    fn test_turn_classes() {
        let html = concat!(
            r#"<div class="query-text">How do I read a file?</div>"#,
            r#"<div class="model-response">Use std::fs::read_to_string.</div>"#,
        );
        let extracted = turn_classes(html).unwrap();
        assert_eq!(extracted.messages[0].role, Role::User);
        assert_eq!(extracted.messages[1].role, Role::Assistant);
    }
}
