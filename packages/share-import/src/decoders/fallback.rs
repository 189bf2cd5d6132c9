//! Generic fallback extraction.
//!
//! Last-resort heuristics shared by every decoder: a bounded walk over
//! embedded JSON looking for message-shaped arrays, and a few common
//! markup conventions for role-tagged turns.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::markup::{self, dialogue_role};
use super::Extracted;
use crate::error::DecodeResult;
use crate::types::conversation::{RawMessage, Role};

/// Maximum nesting followed when searching JSON for messages.
pub const MAX_SEARCH_DEPTH: usize = 10;

/// Maximum nesting followed when searching JSON for a title.
pub const MAX_TITLE_DEPTH: usize = 5;

static RE_AUTHOR_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-message-author-role="(user|assistant|human|model)""#).unwrap()
});
static RE_ROLE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class="[^"]*\b(user|assistant|human|model)-(?:message|turn|content)"#)
        .unwrap()
});
static RE_ROLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\brole="(user|assistant|human|model)""#).unwrap());

/// Markup patterns, most specific first.
static MARKUP_PATTERNS: [&LazyLock<Regex>; 3] = [&RE_AUTHOR_ROLE, &RE_ROLE_CLASS, &RE_ROLE_ATTR];

/// Find conversation messages anywhere inside a JSON value.
///
/// Looks for an array whose first element is an object carrying a `role`,
/// `author` or `sender` field, or a ChatGPT-style `mapping` object.
/// Descends into objects and arrays, at most [`MAX_SEARCH_DEPTH`] levels.
pub fn messages_from_value(value: &Value) -> Vec<RawMessage> {
    search(value, 0)
}

fn search(value: &Value, depth: usize) -> Vec<RawMessage> {
    if depth > MAX_SEARCH_DEPTH {
        return Vec::new();
    }

    match value {
        Value::Array(items) => {
            if is_message_array(items) {
                let messages = messages_from_items(items);
                if !messages.is_empty() {
                    return messages;
                }
            }
            for item in items {
                let found = search(item, depth + 1);
                if !found.is_empty() {
                    return found;
                }
            }
            Vec::new()
        }
        Value::Object(obj) => {
            for (key, val) in obj {
                if let Value::Array(items) = val {
                    if is_message_array(items) {
                        let messages = messages_from_items(items);
                        if !messages.is_empty() {
                            return messages;
                        }
                    }
                }

                if key == "mapping" {
                    if let Value::Object(nodes) = val {
                        let messages = mapping_messages(nodes);
                        if !messages.is_empty() {
                            return messages;
                        }
                    }
                }

                if val.is_object() || val.is_array() {
                    let found = search(val, depth + 1);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn is_message_array(items: &[Value]) -> bool {
    items.first().and_then(Value::as_object).is_some_and(|first| {
        ["role", "author", "sender"]
            .iter()
            .any(|k| first.get(*k).is_some_and(|v| !v.is_null()))
    })
}

/// Convert message-shaped objects, skipping any without a dialogue role or
/// text.
pub fn messages_from_items(items: &[Value]) -> Vec<RawMessage> {
    items
        .iter()
        .filter_map(|item| {
            let role = item_role(item)?;
            let content = text_content(item);
            let message = RawMessage::new(role, content);
            message.has_content().then_some(message)
        })
        .collect()
}

/// Role of a message object from `role`, `author.role`, `author` or
/// `sender`.
pub fn item_role(item: &Value) -> Option<Role> {
    let label = item
        .get("role")
        .and_then(Value::as_str)
        .or_else(|| item.pointer("/author/role").and_then(Value::as_str))
        .or_else(|| item.get("author").and_then(Value::as_str))
        .or_else(|| item.get("sender").and_then(Value::as_str))?;
    dialogue_role(label)
}

/// Messages from the nodes of a ChatGPT `mapping` object, in key order.
pub fn mapping_messages(nodes: &Map<String, Value>) -> Vec<RawMessage> {
    nodes
        .values()
        .filter_map(|node| {
            let message = node.get("message")?;
            let role = dialogue_role(message.pointer("/author/role")?.as_str()?)?;
            let parts = message.pointer("/content/parts")?.as_array()?;
            let msg = RawMessage::new(role, join_string_parts(parts));
            msg.has_content().then_some(msg)
        })
        .collect()
}

/// Join the string elements of a `parts` array with newlines.
pub fn join_string_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of a message object.
///
/// Tries `content` (string), `text`, `body`, `content.text`,
/// `content.parts`, `content.value`, then a `content` array of strings or
/// `{text}` objects.
pub fn text_content(item: &Value) -> String {
    for key in ["content", "text", "body"] {
        if let Some(text) = item.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    match item.get("content") {
        Some(Value::Object(content)) => {
            if let Some(text) = content.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
            if let Some(parts) = content.get("parts").and_then(Value::as_array) {
                return join_string_parts(parts);
            }
            if let Some(text) = content.get("value").and_then(Value::as_str) {
                return text.to_string();
            }
            String::new()
        }
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(s) => Some(s.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// First array stored under `key`, searching nested objects.
pub fn find_nested_array<'v>(value: &'v Value, key: &str) -> Option<&'v Vec<Value>> {
    find_nested_array_at(value, key, 0)
}

fn find_nested_array_at<'v>(value: &'v Value, key: &str, depth: usize) -> Option<&'v Vec<Value>> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    let obj = value.as_object()?;
    if let Some(Value::Array(items)) = obj.get(key) {
        return Some(items);
    }
    obj.values()
        .filter(|v| v.is_object())
        .find_map(|v| find_nested_array_at(v, key, depth + 1))
}

/// First non-empty `title` or `name` string, searching nested values.
pub fn find_title(value: &Value) -> Option<String> {
    find_title_at(value, 0)
}

fn find_title_at(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_TITLE_DEPTH {
        return None;
    }
    match value {
        Value::Object(obj) => {
            for key in ["title", "name"] {
                if let Some(title) = obj.get(key).and_then(Value::as_str) {
                    if !title.trim().is_empty() {
                        return Some(title.trim().to_string());
                    }
                }
            }
            obj.values().find_map(|v| find_title_at(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| find_title_at(v, depth + 1)),
        _ => None,
    }
}

/// Scan every JSON script block for messages.
pub fn scan_json_scripts(html: &str) -> DecodeResult<Extracted> {
    Ok(scan_json_bodies(markup::json_script_bodies(html)))
}

/// Parse each body as JSON and return the first that yields messages.
/// Bodies that are not valid JSON are skipped.
pub fn scan_json_bodies<'a>(bodies: impl IntoIterator<Item = &'a str>) -> Extracted {
    for body in bodies {
        let Ok(value) = serde_json::from_str::<Value>(body.trim()) else {
            continue;
        };
        let messages = messages_from_value(&value);
        if !messages.is_empty() {
            return Extracted::new(messages);
        }
    }
    Extracted::default()
}

/// Try the generic role-tagged markup patterns in priority order.
pub fn scan_markup(html: &str) -> DecodeResult<Extracted> {
    for pattern in MARKUP_PATTERNS {
        let messages = markup::slice_turns(html, pattern, dialogue_role);
        if !messages.is_empty() {
            return Ok(Extracted::new(messages));
        }
    }
    Ok(Extracted::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finds_nested_message_array() {
        let data = json!({
            "props": {
                "state": {
                    "turns": [
                        {"role": "user", "content": "What is Rust?"},
                        {"role": "model", "text": "A systems language."},
                        {"role": "tool", "content": "ignored"}
                    ]
                }
            }
        });

        let messages = messages_from_value(&data);
        assert_eq!(
            messages,
            vec![
                RawMessage::user("What is Rust?"),
                RawMessage::assistant("A systems language."),
            ]
        );
    }

    #[test]
    fn test_descends_into_arrays() {
        let data = json!([[null, [{"sender": "human", "text": "hi there"}, {"sender": "assistant", "text": "hello"}]]]);
        assert_eq!(messages_from_value(&data).len(), 2);
    }

    #[test]
    fn test_mapping_object() {
        let data = json!({
            "data": {
                "mapping": {
                    "root": {"message": null},
                    "a": {"message": {"author": {"role": "user"}, "content": {"parts": ["Q"]}}},
                    "b": {"message": {"author": {"role": "assistant"}, "content": {"parts": ["A1", "A2"]}}}
                }
            }
        });

        let messages = messages_from_value(&data);
        assert_eq!(messages[0], RawMessage::user("Q"));
        assert_eq!(messages[1], RawMessage::assistant("A1\nA2"));
    }

    #[test]
    fn test_depth_bound() {
        let mut data = json!([{"role": "user", "content": "deep"}]);
        for _ in 0..12 {
            data = json!({ "next": data });
        }
        assert!(messages_from_value(&data).is_empty());
    }

    #[test]
    fn test_text_content_variants() {
        assert_eq!(text_content(&json!({"content": "plain"})), "plain");
        assert_eq!(text_content(&json!({"body": "b"})), "b");
        assert_eq!(text_content(&json!({"content": {"text": "t"}})), "t");
        assert_eq!(text_content(&json!({"content": {"parts": ["a", 1, "b"]}})), "a\nb");
        assert_eq!(text_content(&json!({"content": {"value": "v"}})), "v");
        assert_eq!(
            text_content(&json!({"content": ["x", {"type": "text", "text": "y"}, {"type": "image"}]})),
            "x\ny"
        );
        assert_eq!(text_content(&json!({"id": 1})), "");
    }

    #[test]
    fn test_find_title() {
        let data = json!({"page": {"meta": {"title": "  Closures  "}}});
        assert_eq!(find_title(&data), Some("Closures".to_string()));
        assert_eq!(find_title(&json!({"x": 1})), None);
    }

    #[test]
    fn test_scan_markup_priority() {
        let html = concat!(
            r#"<div class="user-message">Explain borrowing</div>"#,
            r#"<div class="assistant-message">Borrowing lends a reference.</div>"#,
        );
        let extracted = scan_markup(html).unwrap();
        assert_eq!(extracted.messages.len(), 2);
        assert_eq!(extracted.messages[0].role, Role::User);
    }
}
