//! Platform classification for share URLs and pasted text.
//!
//! Both classifiers score candidates with weighted signal rules and pick a
//! winner through [`Tally`], so ties are broken the same way everywhere.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::conversation::{Platform, TextPlatform};

/// How specific a fired signal is. Used to break score ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    /// Vendor or product name anywhere in the text
    Mention,
    /// Vendor-specific command syntax
    Command,
    /// Line-start speaker label
    RoleLabel,
}

/// Running scores for a fixed, ordered set of candidates.
///
/// The winner has the highest score; ties go to the candidate whose
/// strongest fired signal is most specific, then to the earliest candidate.
#[derive(Debug, Clone)]
pub struct Tally<P> {
    entries: Vec<(P, u32, Option<Specificity>)>,
}

impl<P: Copy + PartialEq> Tally<P> {
    /// Start every candidate at zero, in tie-break order.
    pub fn new(candidates: &[P]) -> Self {
        Self {
            entries: candidates.iter().map(|&p| (p, 0, None)).collect(),
        }
    }

    /// Add `weight` to a candidate's score.
    pub fn add(&mut self, candidate: P, weight: u32, specificity: Option<Specificity>) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _, _)| *p == candidate) {
            entry.1 += weight;
            entry.2 = entry.2.max(specificity);
        }
    }

    pub fn score(&self, candidate: P) -> u32 {
        self.entries
            .iter()
            .find(|(p, _, _)| *p == candidate)
            .map(|(_, score, _)| *score)
            .unwrap_or(0)
    }

    /// Best candidate and its score, or `None` if nothing scored.
    pub fn winner(&self) -> Option<(P, u32)> {
        let mut best: Option<&(P, u32, Option<Specificity>)> = None;
        for entry in &self.entries {
            if entry.1 == 0 {
                continue;
            }
            // Strictly greater only, so earlier candidates keep remaining ties
            let better = match best {
                None => true,
                Some(current) => (entry.1, entry.2) > (current.1, current.2),
            };
            if better {
                best = Some(entry);
            }
        }
        best.map(|(p, score, _)| (*p, *score))
    }
}

/// Vendor domains. A host matches exactly or as a subdomain.
const HOST_RULES: &[(&str, Platform)] = &[
    ("chatgpt.com", Platform::ChatGpt),
    ("chat.openai.com", Platform::ChatGpt),
    ("claude.ai", Platform::Claude),
    ("gemini.google.com", Platform::Gemini),
    ("bard.google.com", Platform::Gemini),
    ("g.co", Platform::Gemini),
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Identify the vendor behind a URL. Never fails; bad input is `Unknown`.
pub fn classify_url(url: &str) -> Platform {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return Platform::Unknown;
    };
    let Some(host) = parsed.host_str() else {
        return Platform::Unknown;
    };
    let host = host.to_ascii_lowercase();

    let mut tally = Tally::new(&[Platform::ChatGpt, Platform::Claude, Platform::Gemini]);
    for (domain, platform) in HOST_RULES {
        if host_matches(&host, domain) {
            tally.add(*platform, 1, None);
        }
    }

    tally
        .winner()
        .map(|(platform, _)| platform)
        .unwrap_or(Platform::Unknown)
}

/// Whether a URL is a vendor share link: a known host and a `share`
/// path segment.
pub fn is_share_url(url: &str) -> bool {
    if classify_url(url) == Platform::Unknown {
        return false;
    }
    Url::parse(url.trim())
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|mut segments| segments.any(|s| s == "share"))
        })
        .unwrap_or(false)
}

/// Result of classifying pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextClassification {
    pub platform: TextPlatform,

    /// 0.0 - 1.0
    pub confidence: f32,
}

struct SignalRule {
    platform: TextPlatform,
    weight: u32,
    specificity: Specificity,
    pattern: Regex,
}

impl SignalRule {
    fn new(
        platform: TextPlatform,
        weight: u32,
        specificity: Specificity,
        pattern: &str,
    ) -> Self {
        Self {
            platform,
            weight,
            specificity,
            pattern: Regex::new(pattern).unwrap(),
        }
    }
}

static SIGNAL_RULES: LazyLock<Vec<SignalRule>> = LazyLock::new(|| {
    use Specificity::*;
    use TextPlatform::*;
    vec![
        SignalRule::new(ChatGpt, 3, Mention, r"(?i)chatgpt|openai"),
        SignalRule::new(ChatGpt, 2, RoleLabel, r"(?im)^you:\s|^user:\s"),
        SignalRule::new(ChatGpt, 4, RoleLabel, r"(?im)^chatgpt:\s"),
        SignalRule::new(ChatGpt, 3, Mention, r"(?im)^gpt-?[34o](?:\.\d)?"),
        SignalRule::new(Claude, 3, Mention, r"(?i)claude|anthropic"),
        SignalRule::new(Claude, 4, RoleLabel, r"(?im)^human:\s"),
        SignalRule::new(Claude, 3, RoleLabel, r"(?im)^assistant:\s"),
        SignalRule::new(Claude, 2, RoleLabel, r"\[H\]|\[A\]"),
        SignalRule::new(Copilot, 4, Mention, r"(?i)copilot|github\s*copilot"),
        SignalRule::new(Copilot, 3, Command, r"(?m)^@workspace|^/explain|^/fix|^/tests"),
        SignalRule::new(Gemini, 3, Mention, r"(?i)gemini|bard|google\s*ai"),
        SignalRule::new(Gemini, 2, RoleLabel, r"(?im)^model:\s"),
    ]
});

/// Score needed for full confidence.
const FULL_CONFIDENCE_SCORE: f32 = 5.0;

/// Infer which assistant produced a pasted transcript.
///
/// Each rule counts once, however often it matches. Text with no signal
/// falls back to `Generic` at 0.2.
pub fn classify_text(text: &str) -> TextClassification {
    let mut tally = Tally::new(&TextPlatform::ALL);
    tally.add(TextPlatform::Generic, 1, None);

    for rule in SIGNAL_RULES.iter() {
        if rule.pattern.is_match(text) {
            tally.add(rule.platform, rule.weight, Some(rule.specificity));
        }
    }

    let (platform, score) = tally.winner().unwrap_or((TextPlatform::Generic, 1));
    TextClassification {
        platform,
        confidence: (score as f32 / FULL_CONFIDENCE_SCORE).min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_vendor_urls() {
        let cases = [
            ("https://chatgpt.com/share/abc123", Platform::ChatGpt),
            ("https://chat.openai.com/share/abc123", Platform::ChatGpt),
            ("https://claude.ai/share/abc123", Platform::Claude),
            ("https://gemini.google.com/share/abc123", Platform::Gemini),
            ("https://bard.google.com/share/abc123", Platform::Gemini),
            ("https://g.co/gemini/share/abc123", Platform::Gemini),
            ("https://www.chatgpt.com/share/abc123", Platform::ChatGpt),
        ];

        for (url, expected) in cases {
            assert_eq!(classify_url(url), expected, "Expected {:?} for: {}", expected, url);
        }
    }

    #[test]
    fn test_classify_rejects_lookalike_hosts() {
        let urls = [
            "https://example.com/share/abc",
            "https://notclaude.ai/share/abc",
            "https://claude.ai.evil.com/share/abc",
            "not a url",
            "",
        ];

        for url in urls {
            assert_eq!(classify_url(url), Platform::Unknown, "Expected Unknown for: {}", url);
        }
    }

    #[test]
    fn test_is_share_url() {
        assert!(is_share_url("https://chatgpt.com/share/abc123"));
        assert!(is_share_url("https://g.co/gemini/share/abc123"));
        assert!(!is_share_url("https://chatgpt.com/c/abc123"));
        assert!(!is_share_url("https://chatgpt.com/shared/abc123"));
        assert!(!is_share_url("https://example.com/share/abc"));
    }

    #[test]
    fn test_classify_chatgpt_text() {
        let result = classify_text("User: How do I sort an array?\nChatGPT: Use sort().");
        assert_eq!(result.platform, TextPlatform::ChatGpt);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_classify_claude_text() {
        let result = classify_text("Human: Explain closures\nAssistant: A closure captures...");
        assert_eq!(result.platform, TextPlatform::Claude);
    }

    #[test]
    fn test_classify_copilot_commands() {
        let result = classify_text("/explain what this function does\nIt parses input.");
        assert_eq!(result.platform, TextPlatform::Copilot);
        assert!((result.confidence - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_signal_is_generic() {
        let result = classify_text("just some notes about lunch plans for tomorrow");
        assert_eq!(result.platform, TextPlatform::Generic);
        assert!((result.confidence - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rules_count_once() {
        let once = classify_text("Model: hi");
        let many = classify_text("Model: hi\nModel: again\nModel: and again");
        assert_eq!(once, many);
    }

    #[test]
    fn test_tie_prefers_more_specific_signal() {
        // Gemini label (2) vs ChatGPT user label (2) tie; both are role
        // labels, so table order picks ChatGPT.
        let result = classify_text("You: hello there\nModel: hi");
        assert_eq!(result.platform, TextPlatform::ChatGpt);

        let mut tally = Tally::new(&[TextPlatform::ChatGpt, TextPlatform::Gemini]);
        tally.add(TextPlatform::ChatGpt, 3, Some(Specificity::Mention));
        tally.add(TextPlatform::Gemini, 3, Some(Specificity::RoleLabel));
        assert_eq!(tally.winner(), Some((TextPlatform::Gemini, 3)));
    }
}
