//! Testing utilities: fixture builders for every wire format.
//!
//! These produce minimal pages in the shapes the decoders understand, so
//! applications embedding the importer can test against
//! [`MockFetcher`](crate::fetchers::MockFetcher) without network access.
//! Message slices are `(role, text)` pairs using each vendor's own role
//! names ("user"/"assistant", "human"/"assistant").

use serde_json::{json, Map, Value};

pub use crate::fetchers::{MockFailure, MockFetcher};

/// Asset URLs that follow each prompt in a Gemini blob.
const GEMINI_IMAGE_URL: &str = "https://www.gstatic.com/lamda/images/gemini_sparkle_v002.svg";
const GEMINI_DARK_IMAGE_URL: &str = "https://www.gstatic.com/lamda/images/gemini_sparkle_dark.svg";
const GEMINI_FIELD_SEPARATOR: &str = "✧";
const GEMINI_TURN_PREFIX: &str = "░";

/// Flat arrays are only considered once they reach this length.
const STREAM_MIN_VALUES: usize = 50;

fn descriptor(fields: &[(usize, usize)]) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (format!("_{key}"), json!(value)))
        .collect();
    Value::Object(map)
}

fn push(arr: &mut Vec<Value>, value: Value) -> usize {
    arr.push(value);
    arr.len() - 1
}

/// Flat tuple array holding a conversation, as a streaming router emits it.
pub fn turbo_stream_payload(title: &str, messages: &[(&str, &str)]) -> Vec<Value> {
    let mut arr = vec![
        json!("title"),
        json!(title),
        json!("message"),
        json!("author"),
        json!("role"),
        json!("content"),
        json!("parts"),
    ];
    let (key_message, key_author, key_role, key_content, key_parts) = (2, 3, 4, 5, 6);

    let mut node_refs = Vec::new();
    for (role, text) in messages {
        let role_idx = push(&mut arr, json!(role));
        let author_idx = push(&mut arr, descriptor(&[(key_role, role_idx)]));
        let text_idx = push(&mut arr, json!(text));
        let parts_idx = push(&mut arr, json!([text_idx]));
        let content_idx = push(&mut arr, descriptor(&[(key_parts, parts_idx)]));
        let message_idx = push(
            &mut arr,
            descriptor(&[(key_author, author_idx), (key_content, content_idx)]),
        );
        node_refs.push(push(&mut arr, descriptor(&[(key_message, message_idx)])));
    }

    arr.push(json!("linear_conversation"));
    arr.push(json!(node_refs));
    while arr.len() < STREAM_MIN_VALUES {
        arr.push(Value::Null);
    }
    arr
}

/// ChatGPT share page whose payload is split across two enqueued chunks.
pub fn turbo_stream_page(title: &str, messages: &[(&str, &str)]) -> String {
    let line = Value::Array(turbo_stream_payload(title, messages)).to_string();
    let payload = format!("[\"routes\",1]\n{line}\n");

    let mut mid = payload.len() / 2;
    while !payload.is_char_boundary(mid) {
        mid -= 1;
    }
    let (first, second) = payload.split_at(mid);

    format!(
        "<html><head><title>{title} | ChatGPT</title></head><body><div id=\"root\"></div>\
         <script>window.__reactRouterContext.streamController.enqueue({});</script>\
         <script>window.__reactRouterContext.streamController.enqueue({});</script>\
         </body></html>",
        Value::from(first),
        Value::from(second),
    )
}

/// Legacy ChatGPT share page with a `__NEXT_DATA__` mapping.
pub fn next_data_page(title: &str, messages: &[(&str, &str)]) -> String {
    let mut mapping = Map::new();
    let mut parent = Value::Null;
    for (i, (role, text)) in messages.iter().enumerate() {
        let id = format!("node-{i}");
        mapping.insert(
            id.clone(),
            json!({
                "id": id,
                "parent": parent,
                "message": {
                    "author": {"role": role},
                    "content": {"content_type": "text", "parts": [text]}
                }
            }),
        );
        parent = json!(id);
    }

    let data = json!({
        "props": {
            "pageProps": {
                "serverResponse": {
                    "data": {"title": title, "mapping": mapping}
                }
            }
        }
    });

    format!(
        "<html><head><title>ChatGPT</title></head><body>\
         <script id=\"__NEXT_DATA__\" type=\"application/json\">{data}</script>\
         </body></html>"
    )
}

/// Claude share page carrying `chat_messages` in component-stream chunks.
pub fn component_stream_page(messages: &[(&str, &str)]) -> String {
    let items: Vec<Value> = messages
        .iter()
        .enumerate()
        .map(|(i, (sender, text))| {
            json!({"uuid": format!("msg-{i}"), "sender": sender, "text": text})
        })
        .collect();
    let stream = format!(
        "0:[\"$\",\"html\",null,{{}}]\n1:{}\n",
        json!({"snapshot": {"name": "Shared chat", "chat_messages": items}})
    );

    let mut mid = stream.len() / 2;
    while !stream.is_char_boundary(mid) {
        mid -= 1;
    }
    let (first, second) = stream.split_at(mid);

    format!(
        "<html><head><title>Shared chat - Claude</title></head><body>\
         <script>(self.__next_f=self.__next_f||[]).push([0])</script>\
         <script>self.__next_f.push([1,{}])</script>\
         <script>self.__next_f.push([1,{}])</script>\
         </body></html>",
        Value::from(first),
        Value::from(second),
    )
}

/// Gemini positional blob: prompt, two asset URLs and response per turn.
pub fn gemini_blob(turns: &[(&str, &str)]) -> String {
    let mut fields = Vec::with_capacity(turns.len() * 4);
    for (i, (prompt, response)) in turns.iter().enumerate() {
        let prompt = if i == 0 {
            prompt.to_string()
        } else {
            format!("{GEMINI_TURN_PREFIX}{prompt}")
        };
        fields.push(prompt);
        fields.push(GEMINI_IMAGE_URL.to_string());
        fields.push(GEMINI_DARK_IMAGE_URL.to_string());
        fields.push(response.to_string());
    }
    fields.join(GEMINI_FIELD_SEPARATOR)
}

/// Gemini share page with the blob in `WIZ_global_data`.
pub fn gemini_wiz_page(title: &str, turns: &[(&str, &str)]) -> String {
    let data = json!({
        "DnVkpd": gemini_blob(turns),
        "Im6cmf": "/_/BardChatUi",
    });
    format!(
        "<html><head><title>{title}</title></head><body>\
         <script nonce=\"abc\">window.WIZ_global_data = {data};</script>\
         </body></html>"
    )
}

/// Small bot-protection interstitial.
pub fn challenge_page() -> String {
    "<!DOCTYPE html><html><head><title>Just a moment...</title></head><body>\
     <div id=\"challenge-platform\"><noscript>Enable JavaScript and cookies to continue</noscript></div>\
     </body></html>"
        .to_string()
}

/// Google cookie-consent interstitial.
pub fn consent_wall_page() -> String {
    "<html><head><title>Before you continue to Google</title></head><body>\
     <form action=\"https://consent.google.com/save\" method=\"POST\">\
     <button>Accept all</button></form></body></html>"
        .to_string()
}

/// One conversation object of a ChatGPT `conversations.json` export.
///
/// Nodes are chained through `parent` and `current_node` points at the last
/// one, like a conversation without edits.
pub fn export_conversation(title: &str, messages: &[(&str, &str)]) -> Value {
    let mut mapping = Map::new();
    mapping.insert(
        "client-created-root".to_string(),
        json!({"id": "client-created-root", "message": null, "parent": null}),
    );

    let mut parent = "client-created-root".to_string();
    for (i, (role, text)) in messages.iter().enumerate() {
        let id = format!("node-{i}");
        mapping.insert(
            id.clone(),
            json!({
                "id": id,
                "parent": parent,
                "message": {
                    "author": {"role": role},
                    "content": {"content_type": "text", "parts": [text]}
                }
            }),
        );
        parent = id;
    }

    json!({
        "title": title,
        "create_time": 1_700_000_000.0,
        "mapping": mapping,
        "current_node": parent,
    })
}
