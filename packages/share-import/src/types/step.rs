//! Step types and the result envelopes returned to the hosting application.

use serde::{Deserialize, Serialize};

use super::conversation::{Platform, TextPlatform};

/// One prompt/response pair of an imported conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique within one build
    pub id: String,

    /// Synthesized short label ("Step 1: ...")
    pub title: String,

    /// Content of the originating user message
    pub prompt: String,

    /// Content of the immediately following assistant message, or empty
    pub result: String,

    /// Always empty at creation; editable by the consuming application
    pub notes: String,
}

impl Step {
    /// Whether the prompt received a response.
    pub fn has_result(&self) -> bool {
        !self.result.is_empty()
    }
}

/// Result of importing a live share link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareImport {
    pub title: String,
    pub description: String,
    pub platform: Platform,

    /// e.g. "chatgpt-share-url"
    pub source: String,

    /// Structural decoding is trusted more than text inference
    pub confidence: f32,

    pub steps: Vec<Step>,
}

/// Which export format a file was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportSource {
    #[serde(rename = "chatgpt-json")]
    ChatGptJson,
    #[serde(rename = "chatgpt-html")]
    ChatGptHtml,
}

/// Title and size of one conversation found in an export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub title: String,
    pub message_count: usize,
}

/// Result of importing an export file.
///
/// Every conversation in the file is summarized; `steps` are built from
/// the first one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportImport {
    pub title: String,
    pub steps: Vec<Step>,
    pub conversations: Vec<ConversationSummary>,
    pub source: ExportSource,
}

/// Result of importing pasted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteImport {
    pub platform: TextPlatform,

    /// 0.0 - 1.0, lowered when role markers were not found
    pub confidence: f32,

    pub title: String,
    pub description: String,
    pub steps: Vec<Step>,

    /// False when the blank-line pairing fallback was used
    pub structured: bool,
}
