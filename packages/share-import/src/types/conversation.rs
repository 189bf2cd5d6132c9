//! Conversation types - roles, messages and platforms.

use serde::{Deserialize, Serialize};

/// Who authored a message.
///
/// Vendor role names ("human", "model", "bot") are folded into these
/// three values by [`Role::from_label`] before a message leaves a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Only produced by export decoding
    System,
}

impl Role {
    /// Normalize a vendor role label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "assistant" | "model" | "bot" | "ai" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Whether this role takes part in prompt/response pairing.
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

/// One turn of a conversation, markup stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: Role,
    pub content: String,
}

impl RawMessage {
    /// Create a message, trimming surrounding whitespace from the content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content: String = content.into();
        Self {
            role,
            content: content.trim().to_string(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Check if this message has content.
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Vendor hosting a share page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    ChatGpt,
    Claude,
    Gemini,
    Unknown,
}

impl Platform {
    /// Human-readable vendor name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
            Self::Unknown => "AI",
        }
    }

    /// Lowercase tag used in source identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Platform vocabulary inferred from pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPlatform {
    ChatGpt,
    Claude,
    Copilot,
    Gemini,
    Generic,
}

impl TextPlatform {
    /// All platforms, in tie-break order.
    pub const ALL: [TextPlatform; 5] = [
        Self::ChatGpt,
        Self::Claude,
        Self::Copilot,
        Self::Gemini,
        Self::Generic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Claude => "Claude",
            Self::Copilot => "Copilot",
            Self::Gemini => "Gemini",
            Self::Generic => "AI",
        }
    }
}

impl std::fmt::Display for TextPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded conversation, prior to step building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedConversation {
    /// Best-effort title; may be a placeholder
    pub title: String,

    /// Messages in conversational order (oldest first)
    pub messages: Vec<RawMessage>,

    pub platform: Platform,
}

impl ParsedConversation {
    pub fn new(platform: Platform, title: impl Into<String>, messages: Vec<RawMessage>) -> Self {
        Self {
            title: title.into(),
            messages,
            platform,
        }
    }

    /// Messages that take part in prompt/response pairing.
    pub fn dialogue(&self) -> Vec<RawMessage> {
        self.messages
            .iter()
            .filter(|m| m.role.is_dialogue())
            .cloned()
            .collect()
    }

    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}
