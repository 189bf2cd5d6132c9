//! ChatGPT share page decoder.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::markup::{self, dialogue_role};
use super::{fallback, finish, run_strategies, turbo_stream, Extracted, Strategy};
use crate::error::{DecodeError, DecodeResult, ImportError, Result};
use crate::types::conversation::{ParsedConversation, Platform, RawMessage};

const DEFAULT_TITLE: &str = "ChatGPT Shared Conversation";

static RE_NEXT_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
});
static RE_AUTHOR_ROLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-message-author-role="(user|assistant)""#).unwrap());
static RE_MARKDOWN_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<div[^>]*class="[^"]*markdown[^"]*"[^>]*>"#).unwrap());
static RE_TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-|]?\s*ChatGPT\s*$").unwrap());

/// Where page props keep the conversation, most specific first.
const SERVER_RESPONSE_PATHS: &[&str] = &[
    "/props/pageProps/serverResponse/data",
    "/props/pageProps/data",
    "/props/pageProps",
];

const NODE_COLLECTION_KEYS: &[&str] = &["mapping", "linear_conversation", "messages"];

pub const STRATEGIES: &[Strategy] = &[
    Strategy::new("turbo_stream", turbo_stream::decode),
    Strategy::new("next_data", next_data),
    Strategy::new("json_scripts", fallback::scan_json_scripts),
    Strategy::new("author_role_markup", author_role_markup),
    Strategy::new("markdown_containers", markdown_containers),
    Strategy::new("generic_markup", fallback::scan_markup),
];

/// Decode a ChatGPT share page.
pub fn decode(html: &str) -> Result<ParsedConversation> {
    let found = run_strategies(Platform::ChatGpt, STRATEGIES, html);
    finish(
        Platform::ChatGpt,
        html,
        found,
        || markup::page_title_without(html, &RE_TITLE_SUFFIX),
        DEFAULT_TITLE,
        || ImportError::no_structure(Platform::ChatGpt),
    )
}

/// Legacy `__NEXT_DATA__` page props.
fn next_data(html: &str) -> DecodeResult<Extracted> {
    let Some(caps) = RE_NEXT_DATA.captures(html) else {
        return Ok(Extracted::default());
    };
    let root: Value = serde_json::from_str(caps[1].trim())?;

    let response = SERVER_RESPONSE_PATHS
        .iter()
        .filter_map(|path| root.pointer(path))
        .find(|v| !v.is_null())
        .ok_or(DecodeError::Shape("no page props"))?;

    let title = response
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string);

    let direct = response
        .get("mapping")
        .filter(|v| !v.is_null())
        .or_else(|| response.get("linear_conversation"))
        .map(nodes_messages)
        .unwrap_or_default();
    if !direct.is_empty() {
        return Ok(Extracted::new(direct).with_title(title));
    }

    let nested = find_node_collection(&root, 0)
        .map(nodes_messages)
        .unwrap_or_default();
    Ok(Extracted::new(nested).with_title(title))
}

/// First non-empty node collection under any of the known keys.
fn find_node_collection(value: &Value, depth: usize) -> Option<&Value> {
    if depth > fallback::MAX_SEARCH_DEPTH {
        return None;
    }
    let obj = value.as_object()?;
    for key in NODE_COLLECTION_KEYS {
        if let Some(found) = obj.get(*key) {
            if !nodes_messages(found).is_empty() {
                return Some(found);
            }
        }
    }
    obj.values().find_map(|v| find_node_collection(v, depth + 1))
}

/// Messages from a mapping object or node array.
fn nodes_messages(nodes: &Value) -> Vec<RawMessage> {
    let nodes: Vec<&Value> = match nodes {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return Vec::new(),
    };

    nodes
        .into_iter()
        .filter_map(|node| {
            let message = node.get("message").filter(|m| m.is_object()).unwrap_or(node);
            let label = message
                .pointer("/author/role")
                .or_else(|| message.get("role"))
                .and_then(Value::as_str)?;
            let role = dialogue_role(label)?;

            let text = match message.get("content") {
                Some(Value::Object(content)) if content.contains_key("parts") => content
                    .get("parts")
                    .and_then(Value::as_array)
                    .map(|parts| fallback::join_string_parts(parts))
                    .unwrap_or_default(),
                Some(Value::String(text)) => text.clone(),
                _ => message
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };

            let msg = RawMessage::new(role, text);
            msg.has_content().then_some(msg)
        })
        .collect()
}

fn author_role_markup(html: &str) -> DecodeResult<Extracted> {
    Ok(Extracted::new(markup::slice_turns(
        html,
        &RE_AUTHOR_ROLE,
        dialogue_role,
    )))
}

/// Author-role turns whose text sits in a `markdown` container. Unlike the
/// plain slicer this keeps very short turns.
fn markdown_containers(html: &str) -> DecodeResult<Extracted> {
    let turns: Vec<(usize, &str)> = RE_AUTHOR_ROLE
        .captures_iter(html)
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str())))
        .collect();

    let mut messages = Vec::new();
    for (i, (start, label)) in turns.iter().enumerate() {
        let end = turns.get(i + 1).map(|(next, _)| *next).unwrap_or(html.len());
        let segment = &html[*start..end];
        let Some(container) = RE_MARKDOWN_DIV.find(segment) else {
            continue;
        };
        let Some(role) = dialogue_role(label) else {
            continue;
        };

        let body = &segment[container.end()..];
        // Drop the partial opening tag of the next turn
        let body = match body.rfind('<') {
            Some(pos) if i + 1 < turns.len() => &body[..pos],
            _ => body,
        };

        let message = RawMessage::new(role, markup::strip_html(body));
        if message.has_content() {
            messages.push(message);
        }
    }

    Ok(Extracted::new(messages))
}
