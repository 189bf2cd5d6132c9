//! ChatGPT data export decoder.
//!
//! Accepts `conversations.json` (an array of conversation objects, or a
//! single one) and the `chat.html` viewer from the same export.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{fallback, markup};
use crate::error::{ImportError, Result};
use crate::pipeline::steps::{build_steps, truncate_chars};
use crate::types::conversation::{ParsedConversation, Platform, RawMessage, Role};
use crate::types::step::{ConversationSummary, ExportImport, ExportSource};

const UNTITLED: &str = "Untitled";
const UNTITLED_HTML: &str = "Untitled Conversation";
const MAX_TITLE_CHARS: usize = 200;

/// Conversations with fewer messages are noise (stubs, deleted chats).
const MIN_MESSAGES: usize = 2;

/// HTML message bodies this short or shorter are dropped.
const MIN_HTML_MESSAGE_CHARS: usize = 5;

static RE_SCRIPT_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script[^>]*>\s*(?:var\s+\w+\s*=\s*)?([\[\{].*?[\]\}])\s*;?\s*</script>")
        .unwrap()
});
static RE_CONVERSATION_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<h[1-4][^>]*>|<div[^>]*class="[^"]*conversation[^"]*"[^>]*>"#).unwrap()
});
static RE_BLOCK_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^<]+)|<[^>]*>([^<]{3,100})").unwrap());
static RE_MESSAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?im)<div[^>]*class="[^"]*message[^"]*"[^>]*>|^[ \t]*(User|You|Human|ChatGPT|Assistant|AI|GPT(?:-\d)?)\s*:"#,
    )
    .unwrap()
});
static RE_USER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:User|You|Human)\s*:\s*(.*)").unwrap());
static RE_ASSISTANT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:ChatGPT|Assistant|AI|GPT(?:-\d)?)\s*:\s*(.*)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Html,
}

impl ExportFormat {
    fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".json") {
            Ok(Self::Json)
        } else if lower.ends_with(".html") || lower.ends_with(".htm") {
            Ok(Self::Html)
        } else {
            Err(ImportError::invalid(
                "unsupported export file type; upload the .json or .html file from a ChatGPT data export",
            ))
        }
    }
}

/// Decode an export file and build steps from its first conversation.
pub fn extract_from_export_file(filename: &str, content: &str) -> Result<ExportImport> {
    let format = ExportFormat::from_filename(filename)?;
    let (conversations, source) = match format {
        ExportFormat::Json => (conversations_from_json(content)?, ExportSource::ChatGptJson),
        ExportFormat::Html => (conversations_from_html(content), ExportSource::ChatGptHtml),
    };

    let Some(first) = conversations.first() else {
        return Err(ImportError::no_structure_because(
            Platform::ChatGpt,
            "No conversations were found in the file. Make sure it comes from a ChatGPT data export.",
        ));
    };

    let steps = build_steps(&first.dialogue());
    if steps.is_empty() {
        return Err(ImportError::EmptyConversation {
            platform: Platform::ChatGpt,
        });
    }

    info!(
        filename = %filename,
        source = ?source,
        conversations = conversations.len(),
        steps = steps.len(),
        "Export file decoded"
    );

    Ok(ExportImport {
        title: first.title.clone(),
        steps,
        conversations: conversations
            .iter()
            .map(|c| ConversationSummary {
                title: c.title.clone(),
                message_count: c.messages.len(),
            })
            .collect(),
        source,
    })
}

/// Conversations from `conversations.json` content.
pub fn conversations_from_json(content: &str) -> Result<Vec<ParsedConversation>> {
    let data: Value = serde_json::from_str(content)
        .map_err(|e| ImportError::invalid(format!("export file is not valid JSON: {e}")))?;

    match &data {
        Value::Array(items) => Ok(items.iter().filter_map(conversation_from_value).collect()),
        Value::Object(_) => Ok(conversation_from_value(&data).into_iter().collect()),
        _ => Err(ImportError::invalid(
            "export JSON must be a conversation object or an array of conversations",
        )),
    }
}

/// One export conversation object.
///
/// With `current_node`, the active branch is recovered by following
/// `parent` links back to the root; otherwise mapping order is used.
fn conversation_from_value(conv: &Value) -> Option<ParsedConversation> {
    let title = conv
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(UNTITLED);
    let mapping = conv.get("mapping")?.as_object()?;

    let nodes: Vec<&Value> = match conv.get("current_node").and_then(Value::as_str) {
        Some(current) if mapping.contains_key(current) => active_branch(mapping, current),
        _ => mapping.values().collect(),
    };

    let messages: Vec<RawMessage> = nodes.into_iter().filter_map(node_message).collect();
    if messages.len() < MIN_MESSAGES {
        debug!(title = %title, messages = messages.len(), "Skipping short export conversation");
        return None;
    }

    Some(ParsedConversation::new(Platform::ChatGpt, title, messages))
}

/// Nodes from the root down to `current`.
fn active_branch<'a>(mapping: &'a Map<String, Value>, current: &str) -> Vec<&'a Value> {
    let mut branch = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Some(current);

    while let Some(id) = cursor {
        if !seen.insert(id) {
            break;
        }
        let Some(node) = mapping.get(id) else {
            break;
        };
        branch.push(node);
        cursor = node.get("parent").and_then(Value::as_str);
    }

    branch.reverse();
    branch
}

fn node_message(node: &Value) -> Option<RawMessage> {
    let message = node.get("message")?;
    let role = Role::from_label(message.pointer("/author/role")?.as_str()?)?;
    let parts = message.pointer("/content/parts")?.as_array()?;
    let msg = RawMessage::new(role, fallback::join_string_parts(parts));
    msg.has_content().then_some(msg)
}

/// Conversations from the `chat.html` viewer.
///
/// Tries, in order: a JSON array embedded in a script, heading- or
/// div-delimited conversation blocks, and the generic page heuristics.
pub fn conversations_from_html(html: &str) -> Vec<ParsedConversation> {
    for caps in RE_SCRIPT_DATA.captures_iter(html) {
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&caps[1]) else {
            continue;
        };
        let conversations: Vec<_> = items.iter().filter_map(conversation_from_value).collect();
        if !conversations.is_empty() {
            return conversations;
        }
    }

    let blocks: Vec<ParsedConversation> = RE_CONVERSATION_SPLIT
        .split(html)
        .filter(|block| !block.trim().is_empty())
        .filter_map(conversation_from_block)
        .collect();
    if !blocks.is_empty() {
        return blocks;
    }

    let heuristic = fallback::scan_json_scripts(html)
        .ok()
        .filter(|e| !e.is_empty())
        .or_else(|| fallback::scan_markup(html).ok())
        .map(|e| e.messages)
        .unwrap_or_default();
    if heuristic.len() < MIN_MESSAGES {
        return Vec::new();
    }
    let title = markup::page_title(html).unwrap_or_else(|| UNTITLED_HTML.to_string());
    vec![ParsedConversation::new(Platform::ChatGpt, title, heuristic)]
}

fn conversation_from_block(block: &str) -> Option<ParsedConversation> {
    let title = RE_BLOCK_TITLE
        .captures(block)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| markup::strip_html(m.as_str()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_HTML.to_string());
    let title = truncate_chars(&title, MAX_TITLE_CHARS).to_string();

    let mut messages = marked_messages(block);
    if messages.is_empty() {
        messages = labeled_lines(block);
    }

    (messages.len() >= MIN_MESSAGES).then(|| ParsedConversation::new(Platform::ChatGpt, title, messages))
}

/// Messages at `message` divs or line-start speaker labels. A label decides
/// the role; unlabeled bodies alternate starting from the user.
fn marked_messages(block: &str) -> Vec<RawMessage> {
    let markers: Vec<(usize, usize, Option<&str>)> = RE_MESSAGE_MARKER
        .captures_iter(block)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1).map(|m| m.as_str())))
        })
        .collect();

    let mut messages: Vec<RawMessage> = Vec::new();
    for (i, (_, end, label)) in markers.iter().enumerate() {
        let next = markers.get(i + 1).map(|(start, _, _)| *start).unwrap_or(block.len());
        let content = markup::strip_html(&block[*end..next]);
        if content.chars().count() <= MIN_HTML_MESSAGE_CHARS {
            continue;
        }

        let role = match label {
            Some(label) => label_role(label),
            None => match messages.last() {
                Some(prev) if prev.role == Role::User => Role::Assistant,
                _ => Role::User,
            },
        };
        messages.push(RawMessage::new(role, content));
    }
    messages
}

fn label_role(label: &str) -> Role {
    match label.to_ascii_lowercase().as_str() {
        "user" | "you" | "human" => Role::User,
        _ => Role::Assistant,
    }
}

/// Line-by-line label parsing over tag-stripped lines. Unlabeled lines
/// continue the current message.
fn labeled_lines(block: &str) -> Vec<RawMessage> {
    let mut messages = Vec::new();
    let mut role = Role::User;
    let mut current = String::new();

    for line in block.lines() {
        let cleaned = markup::strip_html(line);
        if cleaned.is_empty() {
            continue;
        }

        let labeled = RE_USER_LINE
            .captures(&cleaned)
            .map(|caps| (Role::User, caps[1].to_string()))
            .or_else(|| {
                RE_ASSISTANT_LINE
                    .captures(&cleaned)
                    .map(|caps| (Role::Assistant, caps[1].to_string()))
            });

        match labeled {
            Some((next_role, text)) => {
                if !current.trim().is_empty() {
                    messages.push(RawMessage::new(role, std::mem::take(&mut current)));
                }
                role = next_role;
                current = text;
            }
            None => {
                current.push('\n');
                current.push_str(&cleaned);
            }
        }
    }

    if !current.trim().is_empty() {
        messages.push(RawMessage::new(role, current));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::export_conversation;
    use serde_json::json;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(ExportFormat::from_filename("conversations.JSON").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::from_filename("chat.htm").unwrap(), ExportFormat::Html);
        let err = ExportFormat::from_filename("notes.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_json_array_export() {
        let content = json!([
            export_conversation("First", &[("user", "Hi there"), ("assistant", "Hello!")]),
            export_conversation("Stub", &[("user", "only one")]),
            export_conversation(
                "Second",
                &[("system", "be brief"), ("user", "Q1"), ("assistant", "A1"), ("user", "Q2")]
            ),
        ])
        .to_string();

        let result = extract_from_export_file("conversations.json", &content).unwrap();
        assert_eq!(result.source, ExportSource::ChatGptJson);
        assert_eq!(result.title, "First");
        assert_eq!(result.conversations.len(), 2);
        assert_eq!(result.conversations[1].message_count, 4);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].result, "Hello!");
    }

    #[test]
    fn test_single_object_export_drops_system_before_pairing() {
        let content = export_conversation(
            "Solo",
            &[("user", "Q1"), ("system", "context"), ("assistant", "A1")],
        )
        .to_string();

        let result = extract_from_export_file("conv.json", &content).unwrap();
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].result, "A1");
    }

    #[test]
    fn test_current_node_follows_active_branch() {
        let content = json!({
            "title": "Edited",
            "current_node": "c2",
            "mapping": {
                "root": {"message": null, "parent": null},
                "u1": {"message": {"author": {"role": "user"}, "content": {"parts": ["original question"]}}, "parent": "root"},
                "c1": {"message": {"author": {"role": "assistant"}, "content": {"parts": ["abandoned answer"]}}, "parent": "u1"},
                "c2": {"message": {"author": {"role": "assistant"}, "content": {"parts": ["regenerated answer"]}}, "parent": "u1"}
            }
        })
        .to_string();

        let conversations = conversations_from_json(&content).unwrap();
        assert_eq!(
            conversations[0].messages,
            vec![
                RawMessage::user("original question"),
                RawMessage::assistant("regenerated answer"),
            ]
        );
    }

    #[test]
    fn test_invalid_json_is_invalid_input() {
        let err = extract_from_export_file("conversations.json", "{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_html_embedded_script_data() {
        let data = json!([export_conversation(
            "From script",
            &[("user", "Question one"), ("assistant", "Answer one")]
        )]);
        let html = format!("<html><body><script>var jsonData = {data};</script></body></html>");

        let result = extract_from_export_file("chat.html", &html).unwrap();
        assert_eq!(result.source, ExportSource::ChatGptHtml);
        assert_eq!(result.title, "From script");
    }

    #[test]
    fn test_html_heading_blocks_with_labels() {
        let html = "<html><body>\
            <h2>Sorting in Rust</h2>\n\
            User: How do I sort a Vec?\n\
            ChatGPT: Call v.sort() for Ord types.\n\
            User: And floats?\n\
            ChatGPT: Use sort_by with partial_cmp.\n\
            <h2>Second chat</h2>\n\
            You: hello there friend\n\
            Assistant: hi, how can I help?\n\
            </body></html>";

        let result = extract_from_export_file("chat.html", html).unwrap();
        assert_eq!(result.conversations.len(), 2);
        assert_eq!(result.title, "Sorting in Rust");
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].prompt, "And floats?");
        assert_eq!(result.steps[1].result, "Use sort_by with partial_cmp.");
    }

    #[test]
    fn test_html_message_divs_alternate_from_user() {
        let html = "<html><body><h3>Borrowing basics</h3>\n\
            <div class=\"message\"><p>What is a mutable borrow?</p></div>\n\
            <div class=\"message\"><p>An exclusive reference to the value.</p></div>\n\
            <div class=\"message\">ok</div>\n\
            <div class=\"message\"><p>Can I hold two at once?</p></div>\n\
            <div class=\"message\"><p>Not while either is in use.</p></div>\n\
            </body></html>";

        let result = extract_from_export_file("chat.html", html).unwrap();
        assert_eq!(result.title, "Borrowing basics");
        assert_eq!(result.conversations[0].message_count, 4);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].prompt, "What is a mutable borrow?");
        assert_eq!(result.steps[0].result, "An exclusive reference to the value.");
        assert_eq!(result.steps[1].prompt, "Can I hold two at once?");
        assert_eq!(result.steps[1].result, "Not while either is in use.");
    }

    #[test]
    fn test_html_without_conversations() {
        let err = extract_from_export_file("chat.html", "<html><body><p>hi</p></body></html>")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoStructure);
    }

    #[test]
    fn test_only_system_and_assistant_is_empty() {
        let content = export_conversation("Odd", &[("system", "setup"), ("assistant", "hello")])
            .to_string();
        let err = extract_from_export_file("c.json", &content).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }
}
