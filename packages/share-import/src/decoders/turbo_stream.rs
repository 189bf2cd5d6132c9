//! Streaming tuple payload decoder.
//!
//! Server-rendered pages built on a streaming router embed their loader
//! data as `streamController.enqueue("...")` calls. Each chunk is a JSON
//! string literal; the concatenated payload holds newline-separated lines,
//! one of which is a large flat array where objects are encoded as
//! descriptors `{"_<k>": <v>}` meaning "key `arr[k]` has value `arr[v]`".

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use super::Extracted;
use crate::error::DecodeResult;
use crate::types::conversation::{RawMessage, Role};

static RE_ENQUEUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)streamController\.enqueue\("((?:[^"\\]|\\.)*)"\)"#).unwrap()
});

/// Flat arrays shorter than this are router bookkeeping, not loader data.
const MIN_PAYLOAD_VALUES: usize = 50;

/// Titles must be shorter than this.
const MAX_TITLE_CHARS: usize = 300;

static NULL: Value = Value::Null;

/// A descriptor with its keys and values looked up in the flat array.
type Resolved<'a> = IndexMap<&'a str, &'a Value>;

/// Decode the conversation from a page's stream chunks.
pub fn decode(html: &str) -> DecodeResult<Extracted> {
    let payload = collect_payload(html);
    if payload.is_empty() {
        return Ok(Extracted::default());
    }

    for line in payload.lines() {
        let line = line.trim();
        if !line.starts_with('[') {
            continue;
        }
        let Ok(arr) = serde_json::from_str::<Vec<Value>>(line) else {
            continue;
        };
        if arr.len() < MIN_PAYLOAD_VALUES {
            continue;
        }

        let extracted = decode_flat(&arr);
        if !extracted.is_empty() {
            return Ok(extracted);
        }
    }

    Ok(Extracted::default())
}

/// Unescape and concatenate every enqueued chunk.
fn collect_payload(html: &str) -> String {
    let mut payload = String::new();
    for caps in RE_ENQUEUE.captures_iter(html) {
        match unescape_js_string(&caps[1]) {
            Ok(chunk) => payload.push_str(&chunk),
            Err(e) => tracing::debug!(error = %e, "Skipping malformed stream chunk"),
        }
    }
    payload
}

/// Unescape the body of a double-quoted string literal.
pub(crate) fn unescape_js_string(body: &str) -> serde_json::Result<String> {
    serde_json::from_str(&format!("\"{body}\""))
}

/// Decode one flat payload array.
pub fn decode_flat(arr: &[Value]) -> Extracted {
    let title = find_title(arr);

    let node_refs: Vec<&Value> = match value_after(arr, "linear_conversation") {
        Some(Value::Array(refs)) if !refs.is_empty() => refs.iter().collect(),
        _ => match value_after(arr, "mapping") {
            // Mapping values are node refs; order follows the document
            Some(Value::Object(descriptor)) => descriptor
                .values()
                .filter(|v| v.as_i64().is_some_and(|n| n >= 0))
                .collect(),
            _ => Vec::new(),
        },
    };

    let messages = node_refs
        .into_iter()
        .filter_map(|node_ref| node_message(arr, node_ref))
        .collect();

    Extracted::new(messages).with_title(title)
}

/// Element immediately following the first string element equal to `key`.
fn value_after<'a>(arr: &'a [Value], key: &str) -> Option<&'a Value> {
    arr.windows(2)
        .find(|pair| pair[0].as_str() == Some(key))
        .map(|pair| &pair[1])
}

fn find_title(arr: &[Value]) -> Option<String> {
    arr.windows(2).find_map(|pair| {
        if pair[0].as_str() != Some("title") {
            return None;
        }
        let title = pair[1].as_str()?;
        let len = title.chars().count();
        (len > 0 && len < MAX_TITLE_CHARS).then(|| title.to_string())
    })
}

/// Look up an in-range, non-negative index reference.
fn deref<'a>(arr: &'a [Value], reference: &Value) -> Option<&'a Value> {
    let index = usize::try_from(reference.as_i64()?).ok()?;
    arr.get(index)
}

/// Resolve a descriptor object against the flat array.
///
/// Keys that are not `_<index>` or do not point at a string are skipped;
/// negative value indices resolve to null.
pub fn resolve<'a>(arr: &'a [Value], descriptor: &'a Value) -> Option<Resolved<'a>> {
    let obj = descriptor.as_object()?;
    let mut resolved = IndexMap::with_capacity(obj.len());

    for (ref_key, value_pos) in obj {
        let Some(key_pos) = ref_key.strip_prefix('_').and_then(|k| k.parse::<usize>().ok()) else {
            continue;
        };
        let Some(key) = arr.get(key_pos).and_then(Value::as_str) else {
            continue;
        };
        let Some(pos) = value_pos.as_i64() else {
            continue;
        };
        if pos < 0 {
            resolved.insert(key, &NULL);
        } else if let Some(value) = arr.get(pos as usize) {
            resolved.insert(key, value);
        }
    }

    Some(resolved)
}

/// node -> message -> {author.role, content.parts}
fn node_message(arr: &[Value], node_ref: &Value) -> Option<RawMessage> {
    let node = resolve(arr, deref(arr, node_ref)?)?;
    let message = resolve(arr, node.get("message")?)?;
    let author = resolve(arr, message.get("author")?)?;

    let role = match author.get("role")?.as_str()? {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };

    let content = resolve(arr, message.get("content")?)?;
    let parts = content.get("parts")?.as_array()?;

    let text = parts
        .iter()
        .map(|part| if part.is_number() { deref(arr, part).unwrap_or(part) } else { part })
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return None;
    }
    Some(RawMessage::new(role, text))
}
