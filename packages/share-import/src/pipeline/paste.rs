//! Smart-paste parsing - recovers turns from copied conversation text.
//!
//! The text is classified first; the winning platform's speaker-label
//! vocabulary then splits it into messages. Text without recognizable
//! labels falls back to blank-line blocks with lowered confidence.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::classify::classify_text;
use super::steps::{build_steps, truncate_chars};
use crate::error::{ImportError, Result};
use crate::types::config::ImportLimits;
use crate::types::conversation::{Platform, RawMessage, Role, TextPlatform};
use crate::types::step::PasteImport;

/// Prompt characters kept in a structured title.
const TITLE_PROMPT_CHARS: usize = 80;
const MAX_TITLE_CHARS: usize = 200;

/// Blocks this short or shorter are dropped by the blank-line fallback.
const MIN_BLOCK_CHARS: usize = 10;

/// Confidence lost when no speaker labels were found.
const UNSTRUCTURED_PENALTY: f32 = 0.3;

const FORMAT_HINT: &str = "Put a speaker label at the start of each turn, for example:\n\
User: your question\n\
Assistant: the answer";

// Each vocabulary captures `user` or `assistant` at a line-start label.
static CHATGPT_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:(?P<user>You|User|Human|Me)|(?P<assistant>ChatGPT|Assistant|GPT(?:-?[\w.]+)?|AI))[ \t]*:",
    )
    .unwrap()
});
static CLAUDE_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*\[?(?:(?P<user>Human|H|You|User)|(?P<assistant>Assistant|A|Claude))[ \t]*[:\]]",
    )
    .unwrap()
});
static COPILOT_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:(?P<user>(?:User|You|Me|>[ \t]*)[ \t]*:)|(?P<assistant>(?:GitHub[ \t]+Copilot|Copilot|Assistant)[ \t]*:))",
    )
    .unwrap()
});
static GEMINI_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:(?P<user>You|User|Human)|(?P<assistant>Gemini|Bard|Model|Google[ \t]+AI))[ \t]*:",
    )
    .unwrap()
});
static GENERIC_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*\[?(?:(?P<user>User|You|Human|Me|Q|Question|Prompt)|(?P<assistant>Assistant|AI|Bot|Answer|Response|A|Model))[ \t]*[:\]]",
    )
    .unwrap()
});
static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

fn labels_for(platform: TextPlatform) -> &'static Regex {
    match platform {
        TextPlatform::ChatGpt => &CHATGPT_LABELS,
        TextPlatform::Claude => &CLAUDE_LABELS,
        TextPlatform::Copilot => &COPILOT_LABELS,
        TextPlatform::Gemini => &GEMINI_LABELS,
        TextPlatform::Generic => &GENERIC_LABELS,
    }
}

/// Parse a pasted transcript into steps.
pub fn parse_pasted_text(text: &str) -> Result<PasteImport> {
    ImportLimits::unbounded().check_paste(text)?;

    let classification = classify_text(text);
    let platform = classification.platform;

    let labeled = split_labeled(text, labels_for(platform));
    let structured = labeled.len() >= 2;
    let (messages, confidence) = if structured {
        (labeled, classification.confidence)
    } else {
        debug!(
            platform = ?platform,
            labeled = labeled.len(),
            "No speaker labels found, pairing blank-line blocks"
        );
        (
            split_blocks(text),
            (classification.confidence - UNSTRUCTURED_PENALTY).max(0.0),
        )
    };

    let steps = build_steps(&messages);
    if steps.is_empty() {
        return Err(ImportError::NoStructure {
            platform: Platform::Unknown,
            guidance: format!("No prompt/response turns were recognized. {FORMAT_HINT}"),
        });
    }

    let n = steps.len();
    let (title, description) = if structured {
        let prompt = truncate_chars(&steps[0].prompt, TITLE_PROMPT_CHARS);
        let title = format!("{} Conversation: {prompt}...", platform.label());
        (
            truncate_chars(&title, MAX_TITLE_CHARS).to_string(),
            format!("Imported from {} conversation with {n} steps.", platform.label()),
        )
    } else {
        (
            format!("Imported Conversation ({n} steps)"),
            format!("Auto-parsed conversation with {n} prompt-response pairs."),
        )
    };

    info!(
        platform = ?platform,
        structured,
        confidence,
        steps = n,
        "Pasted text parsed"
    );

    Ok(PasteImport {
        platform,
        confidence,
        title,
        description,
        steps,
        structured,
    })
}

/// Split at line-start labels. Each segment takes the role of the label
/// before it; text before the first label is dropped.
fn split_labeled(text: &str, labels: &Regex) -> Vec<RawMessage> {
    let markers: Vec<(usize, usize, Role)> = labels
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let role = if caps.name("user").is_some() {
                Role::User
            } else {
                Role::Assistant
            };
            Some((whole.start(), whole.end(), role))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, (_, end, role))| {
            let next = markers.get(i + 1).map(|(start, _, _)| *start).unwrap_or(text.len());
            RawMessage::new(*role, &text[*end..next])
        })
        .filter(RawMessage::has_content)
        .collect()
}

/// Blank-line separated blocks, alternating user and assistant.
fn split_blocks(text: &str) -> Vec<RawMessage> {
    RE_BLANK_LINES
        .split(&text.replace("\r\n", "\n"))
        .map(str::trim)
        .filter(|block| block.chars().count() > MIN_BLOCK_CHARS)
        .enumerate()
        .map(|(i, block)| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            RawMessage::new(role, block)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_chatgpt_transcript() {
        let result = parse_pasted_text(
            "User: How do I sort an array?\nChatGPT: Use the sort() method.\n\
             User: And in reverse?\nChatGPT: Call reverse() after sorting.",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::ChatGpt);
        assert!(result.structured);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.has_result()));
        assert_eq!(result.steps[0].prompt, "How do I sort an array?");
        assert_eq!(result.title, "ChatGPT Conversation: How do I sort an array?...");
        assert_eq!(result.description, "Imported from ChatGPT conversation with 2 steps.");
    }

    #[test]
    fn test_claude_transcript() {
        let result = parse_pasted_text(
            "Human: Explain closures\nAssistant: A closure captures its environment.\n\
             Human: Show an example\nAssistant: let add = |x| x + 1;",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::Claude);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].result, "let add = |x| x + 1;");
    }

    #[test]
    fn test_multiline_segments_and_preamble() {
        let result = parse_pasted_text(
            "Copied from my chat:\n\nYou: Write a haiku\nabout rust\nChatGPT: Iron slowly wakes\nred bloom on the gate",
        )
        .unwrap();

        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].prompt, "Write a haiku\nabout rust");
        assert_eq!(result.steps[0].result, "Iron slowly wakes\nred bloom on the gate");
    }

    #[test]
    fn test_gpt_model_labels_without_hyphen() {
        let result = parse_pasted_text(
            "You: what is the capital of France?\nGPT4: Paris is the capital.\n\
             You: and Italy?\nGPT4: Rome.",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::ChatGpt);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].prompt, "what is the capital of France?");
        assert_eq!(result.steps[0].result, "Paris is the capital.");
        assert_eq!(result.steps[1].result, "Rome.");
    }

    #[test]
    fn test_copilot_blockquote_stays_in_answer() {
        let result = parse_pasted_text(
            "GitHub Copilot chat\nUser: how do I fix this borrow error?\n\
             Copilot: Clone the value first.\n> Note: cloning costs an allocation\n\
             Then pass the clone.",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::Copilot);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(
            result.steps[0].result,
            "Clone the value first.\n> Note: cloning costs an allocation\nThen pass the clone."
        );
    }

    #[test]
    fn test_copilot_quoted_user_label() {
        let result = parse_pasted_text(
            "Copilot session\n> : why does this loop never end?\n\
             Copilot: The counter is never incremented.",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::Copilot);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].prompt, "why does this loop never end?");
    }

    #[test]
    fn test_gemini_transcript() {
        let result = parse_pasted_text(
            "User: What is a closure?\nGemini: A function that captures its scope.\n\
             User: Example?\nGemini: let add = |x| x + 1;",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::Gemini);
        assert!(result.structured);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].result, "let add = |x| x + 1;");
    }

    #[test]
    fn test_generic_question_answer_labels() {
        let result = parse_pasted_text(
            "Q: What is Rust?\nA: A systems programming language.\n\
             Q: Who started it?\nA: Graydon Hoare.",
        )
        .unwrap();

        assert_eq!(result.platform, TextPlatform::Generic);
        assert!(result.structured);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].prompt, "Who started it?");
        assert_eq!(result.steps[1].result, "Graydon Hoare.");
    }

    #[test]
    fn test_bracket_labels() {
        let result =
            parse_pasted_text("[H] What does Anthropic build?\n[A] Claude, among other things.")
                .unwrap();
        assert_eq!(result.platform, TextPlatform::Claude);
        assert_eq!(result.steps[0].result, "Claude, among other things.");
    }

    #[test]
    fn test_unstructured_fallback() {
        let text = "What is the capital of France?\n\nThe capital of France is Paris.\n\n\
                    And of Italy?\n\nRome is the capital of Italy.";
        let result = parse_pasted_text(text).unwrap();

        assert!(!result.structured);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].prompt, "And of Italy?");
        assert_eq!(result.title, "Imported Conversation (2 steps)");
        assert_eq!(
            result.description,
            "Auto-parsed conversation with 2 prompt-response pairs."
        );
        // Generic baseline 0.2 minus the penalty floors at zero
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_too_short() {
        let err = parse_pasted_text("   hi there   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_no_turns_is_no_structure() {
        let err = parse_pasted_text("tiny\n\nbits\n\nonly here").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoStructure);
        assert!(err.to_string().contains("User: your question"));
    }

    #[test]
    fn test_long_title_is_capped() {
        let prompt = "word ".repeat(40);
        let text = format!("User: {prompt}\nChatGPT: ok then, noted.");
        let result = parse_pasted_text(&text).unwrap();

        assert!(result.title.chars().count() <= MAX_TITLE_CHARS);
        assert!(result.title.ends_with("..."));
    }

    #[test]
    fn test_idempotent() {
        let text = "Human: Explain closures\nAssistant: A closure captures its environment.";
        let a = parse_pasted_text(text).unwrap();
        let b = parse_pasted_text(text).unwrap();
        assert_eq!(a.title, b.title);
        let pairs = |r: &PasteImport| {
            r.steps
                .iter()
                .map(|s| (s.prompt.clone(), s.result.clone(), s.title.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&a), pairs(&b));
    }
}
