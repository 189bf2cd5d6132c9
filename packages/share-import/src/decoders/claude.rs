//! Claude share page decoder.
//!
//! Claude pages are served through a bot-protection layer and render
//! their conversation from component-stream chunks
//! (`self.__next_f.push([n, "..."])`). When the chunks are missing the
//! decoder falls back to framework data blobs and turn markup.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::markup::{self, dialogue_role};
use super::turbo_stream::unescape_js_string;
use super::{fallback, finish, is_bot_challenge, run_strategies, turbo_stream, Extracted, Strategy};
use crate::error::{BlockKind, DecodeResult, ImportError, Result};
use crate::types::conversation::{ParsedConversation, Platform, RawMessage};

const DEFAULT_TITLE: &str = "Claude Shared Conversation";

/// How far past a `sender` marker to look for its text.
const PROXIMITY_WINDOW_BYTES: usize = 50_000;

/// Proximity-paired texts this short or shorter are ignored.
const MIN_PROXIMITY_CHARS: usize = 5;

static RE_RSC_PUSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)self\.__next_f\.push\(\[(\d+),"((?:[^"\\]|\\.)*)"\]\)"#).unwrap()
});
static RE_CHAT_MESSAGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""chat_messages"\s*:\s*\["#).unwrap());
static RE_SENDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""sender"\s*:\s*"(human|assistant)""#).unwrap());
static RE_NEARBY_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:text|content)"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});
static RE_FRAMEWORK_BLOBS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?is)<script[^>]*id="__(?:NEXT|NUXT|SVELTE)_DATA__"[^>]*>(.*?)</script>"#)
            .unwrap(),
        Regex::new(
            r#"(?is)<script[^>]*>\s*window\.__(?:data|INITIAL_STATE__|claude)(?:__)?\s*=\s*(\{.*?\});?\s*</script>"#,
        )
        .unwrap(),
        Regex::new(r#"(?is)<script[^>]*type="application/json"[^>]*data-sveltekit[^>]*>(.*?)</script>"#)
            .unwrap(),
    ]
});
static RE_TURN_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class="[^"]*\b(human|user|assistant|ai)-(?:turn|message|content)"#).unwrap()
});
static RE_ROLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\brole="(human|user|assistant)""#).unwrap());
static RE_TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-|]?\s*Claude\s*$").unwrap());

/// Keys that hold the message list in framework blobs, in priority order.
const MESSAGE_KEYS: &[&str] = &["chat_messages", "messages", "conversation", "turns"];

pub const STRATEGIES: &[Strategy] = &[
    Strategy::new("component_stream", component_stream),
    Strategy::new("turbo_stream", turbo_stream::decode),
    Strategy::new("framework_blobs", framework_blobs),
    Strategy::new("json_scripts", json_scripts),
    Strategy::new("turn_classes", turn_classes),
    Strategy::new("role_attributes", role_attributes),
    Strategy::new("generic_markup", fallback::scan_markup),
];

/// Decode a Claude share page.
pub fn decode(html: &str) -> Result<ParsedConversation> {
    if is_bot_challenge(html) {
        warn!(page_bytes = html.len(), "Claude served a bot-protection challenge");
        return Err(ImportError::Blocked {
            platform: Platform::Claude,
            kind: BlockKind::BotChallenge,
        });
    }

    let found = run_strategies(Platform::Claude, STRATEGIES, html);
    finish(
        Platform::Claude,
        html,
        found,
        || markup::page_title_without(html, &RE_TITLE_SUFFIX),
        DEFAULT_TITLE,
        || {
            ImportError::no_structure_because(
                Platform::Claude,
                "Claude share pages load their content dynamically, which makes server-side \
                 extraction unreliable.",
            )
        },
    )
}

/// Component-stream chunks pushed by inline scripts.
fn component_stream(html: &str) -> DecodeResult<Extracted> {
    let mut stream = String::new();
    for body in markup::script_bodies(html) {
        if !body.contains("self.__next_f") {
            continue;
        }
        for caps in RE_RSC_PUSH.captures_iter(body) {
            match unescape_js_string(&caps[2]) {
                Ok(chunk) => stream.push_str(&chunk),
                Err(e) => tracing::debug!(error = %e, "Skipping malformed component chunk"),
            }
        }
    }
    if stream.is_empty() {
        return Ok(Extracted::default());
    }

    let listed = chat_messages_array(&stream);
    if !listed.is_empty() {
        return Ok(Extracted::new(listed));
    }
    Ok(Extracted::new(proximity_pairs(&stream)))
}

/// Parse the `chat_messages` array embedded in the stream.
fn chat_messages_array(stream: &str) -> Vec<RawMessage> {
    let Some(found) = RE_CHAT_MESSAGES.find(stream) else {
        return Vec::new();
    };
    // The match ends just past '['; parse one value from there
    let from = found.end() - 1;
    let mut values = serde_json::Deserializer::from_str(&stream[from..]).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Array(items))) => items
            .iter()
            .filter_map(|item| {
                let role = dialogue_role(item.get("sender")?.as_str()?)?;
                let message = RawMessage::new(role, fallback::text_content(item));
                message.has_content().then_some(message)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Pair each `sender` marker with the first text field that follows it.
fn proximity_pairs(stream: &str) -> Vec<RawMessage> {
    RE_SENDER
        .captures_iter(stream)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let mut end = (start + PROXIMITY_WINDOW_BYTES).min(stream.len());
            while !stream.is_char_boundary(end) {
                end -= 1;
            }
            let window = &stream[start..end];

            let raw = RE_NEARBY_TEXT.captures(window)?.get(1)?.as_str();
            let text = unescape_js_string(raw).unwrap_or_else(|_| raw.replace("\\n", "\n"));
            if text.trim().chars().count() <= MIN_PROXIMITY_CHARS {
                return None;
            }
            let role = dialogue_role(&caps[1])?;
            Some(RawMessage::new(role, text))
        })
        .collect()
}

/// Messages under the known keys, else any message-shaped array.
fn blob_messages(data: &Value) -> Vec<RawMessage> {
    for key in MESSAGE_KEYS {
        if let Some(items) = fallback::find_nested_array(data, key) {
            let messages = fallback::messages_from_items(items);
            if !messages.is_empty() {
                return messages;
            }
        }
    }
    fallback::messages_from_value(data)
}

fn messages_from_bodies<'a>(bodies: impl IntoIterator<Item = &'a str>) -> Extracted {
    for body in bodies {
        let Ok(data) = serde_json::from_str::<Value>(body.trim()) else {
            continue;
        };
        let messages = blob_messages(&data);
        if !messages.is_empty() {
            return Extracted::new(messages).with_title(fallback::find_title(&data));
        }
    }
    Extracted::default()
}

/// Data blobs left by common web frameworks.
fn framework_blobs(html: &str) -> DecodeResult<Extracted> {
    let bodies = RE_FRAMEWORK_BLOBS
        .iter()
        .filter_map(|pattern| pattern.captures(html))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));
    Ok(messages_from_bodies(bodies))
}

fn json_scripts(html: &str) -> DecodeResult<Extracted> {
    Ok(messages_from_bodies(markup::json_script_bodies(html)))
}

fn turn_classes(html: &str) -> DecodeResult<Extracted> {
    Ok(Extracted::new(markup::slice_turns(html, &RE_TURN_CLASS, dialogue_role)))
}

fn role_attributes(html: &str) -> DecodeResult<Extracted> {
    Ok(Extracted::new(markup::slice_turns(html, &RE_ROLE_ATTR, dialogue_role)))
}
