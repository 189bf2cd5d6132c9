//! Step building - pairs user prompts with the response that follows.

use uuid::Uuid;

use crate::types::conversation::{RawMessage, Role};
use crate::types::step::Step;

/// Prompt characters kept in a step title.
const TITLE_PREFIX_CHARS: usize = 60;

/// Turn an ordered message list into prompt/response steps.
///
/// Every user message yields exactly one step. Its result is the next
/// message's content when that message is from the assistant (which is
/// then consumed); otherwise the result is empty. Unpaired assistant and
/// system messages are skipped.
pub fn build_steps(messages: &[RawMessage]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut iter = messages.iter().peekable();

    while let Some(message) = iter.next() {
        if message.role != Role::User {
            continue;
        }

        let result = match iter.peek() {
            Some(next) if next.role == Role::Assistant => {
                let content = next.content.clone();
                iter.next();
                content
            }
            _ => String::new(),
        };

        let number = steps.len() + 1;
        steps.push(Step {
            id: Uuid::now_v7().to_string(),
            title: step_title(number, &message.content),
            prompt: message.content.clone(),
            result,
            notes: String::new(),
        });
    }

    steps
}

fn step_title(number: usize, prompt: &str) -> String {
    if prompt.chars().count() > TITLE_PREFIX_CHARS {
        format!("Step {number}: {}...", truncate_chars(prompt, TITLE_PREFIX_CHARS))
    } else {
        format!("Step {number}: {prompt}")
    }
}

/// First `max` characters of `s`, never splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
