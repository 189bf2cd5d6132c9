//! Markup helpers shared by the decoders.
//!
//! Everything here is plain regex work over the page text; there is no DOM.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::conversation::{RawMessage, Role};

static RE_SCRIPT_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>").unwrap());
static RE_BR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:p|div|li)>").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());
static RE_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|(amp|lt|gt|quot|apos|nbsp));").unwrap()
});
static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());
static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap());
static RE_JSON_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type="application/json"[^>]*>(.*?)</script>"#).unwrap()
});

/// Turns this short or shorter are treated as markup noise.
const MIN_TURN_CHARS: usize = 5;

/// Convert an HTML fragment to plain text.
///
/// Line breaks and block ends become newlines, tags are removed, entities
/// decoded, and runs of blank lines collapsed to one.
pub fn strip_html(html: &str) -> String {
    let text = RE_SCRIPT_STYLE.replace_all(html, "");
    let text = RE_BR.replace_all(&text, "\n");
    let text = RE_BLOCK_END.replace_all(&text, "\n");
    let text = RE_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    RE_BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

/// Decode named and numeric character references in one pass.
pub fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("amp") => Some('&'),
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("nbsp") => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Contents of the `<title>` element, decoded and trimmed.
pub fn page_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .map(|caps| decode_entities(caps[1].trim()))
        .filter(|t| !t.is_empty())
}

/// Page title with a vendor suffix removed. Titles of two characters or
/// fewer are discarded.
pub fn page_title_without(html: &str, suffix: &Regex) -> Option<String> {
    let title = page_title(html)?;
    let trimmed = suffix.replace(&title, "").trim().to_string();
    (trimmed.chars().count() > 2).then_some(trimmed)
}

/// Bodies of every `<script>` element.
pub fn script_bodies(html: &str) -> Vec<&str> {
    RE_SCRIPT
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Bodies of `<script type="application/json">` elements.
pub fn json_script_bodies(html: &str) -> Vec<&str> {
    captured_bodies(html, &RE_JSON_SCRIPT)
}

/// First capture group of every match of `pattern`.
pub fn captured_bodies<'h>(html: &'h str, pattern: &Regex) -> Vec<&'h str> {
    pattern
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Slice a page into turns at each match of `marker`.
///
/// `marker` must capture a role label in group 1, which `role_of` maps to a
/// role (`None` drops the turn). A turn's content runs from the end of the
/// tag containing its match to the start of the tag containing the next
/// match. Turns of five characters or fewer after stripping are dropped.
pub fn slice_turns(
    html: &str,
    marker: &Regex,
    role_of: impl Fn(&str) -> Option<Role>,
) -> Vec<RawMessage> {
    let matches: Vec<(usize, usize, &str)> = marker
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?;
            Some((whole.start(), whole.end(), label.as_str()))
        })
        .collect();

    let mut messages = Vec::new();
    for (i, (_, match_end, label)) in matches.iter().enumerate() {
        let Some(role) = role_of(label) else {
            continue;
        };

        let start = html[*match_end..]
            .find('>')
            .map(|pos| match_end + pos + 1)
            .unwrap_or(*match_end);
        let end = match matches.get(i + 1) {
            Some((next_start, _, _)) => html[..*next_start]
                .rfind('<')
                .filter(|&pos| pos >= start)
                .unwrap_or(*next_start),
            None => html.len(),
        };
        if start >= end {
            continue;
        }

        let content = strip_html(&html[start..end]);
        if content.chars().count() > MIN_TURN_CHARS {
            messages.push(RawMessage::new(role, content));
        }
    }

    messages
}

/// Role mapper for markers whose label is a vendor role name.
pub fn dialogue_role(label: &str) -> Option<Role> {
    Role::from_label(label).filter(Role::is_dialogue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = "<p>Hello <b>world</b></p><div>Line&nbsp;two<br/>three</div><ul><li>a &amp; b</li></ul>";
        assert_eq!(strip_html(html), "Hello world\nLine two\nthree\na & b");
    }

    #[test]
    fn test_strip_html_collapses_blank_lines() {
        assert_eq!(strip_html("a<br><br><br><br>b"), "a\n\nb");
        assert_eq!(strip_html("<script>var x = 1;</script>kept"), "kept");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;div&gt; &quot;x&quot; &#39;y&#39;"), "<div> \"x\" 'y'");
        assert_eq!(decode_entities("&#x2713; &#10003;"), "\u{2713} \u{2713}");
        // Single pass: an escaped entity stays escaped once
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_page_title_without_suffix() {
        let suffix = Regex::new(r"(?i)\s*[-|]?\s*ChatGPT\s*$").unwrap();
        let html = "<html><head><title>Sorting arrays - ChatGPT</title></head></html>";
        assert_eq!(page_title_without(html, &suffix), Some("Sorting arrays".to_string()));

        let bare = "<title>ChatGPT</title>";
        assert_eq!(page_title_without(bare, &suffix), None);
    }

    #[test]
    fn test_slice_turns_by_position() {
        let marker = Regex::new(r#"data-message-author-role="(user|assistant)""#).unwrap();
        let html = concat!(
            r#"<div data-message-author-role="user" class="x"><p>How do I sort?</p></div>"#,
            r#"<div data-message-author-role="assistant"><p>Call sort() on it.</p></div>"#,
            r#"<div data-message-author-role="user"><p>ok</p></div>"#,
        );

        let turns = slice_turns(html, &marker, dialogue_role);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], RawMessage::user("How do I sort?"));
        assert_eq!(turns[1], RawMessage::assistant("Call sort() on it."));
    }

    #[test]
    fn test_script_bodies() {
        let html = r#"<script>a()</script><script type="application/json">{"x":1}</script>"#;
        assert_eq!(script_bodies(html), vec!["a()", r#"{"x":1}"#]);
        assert_eq!(json_script_bodies(html), vec![r#"{"x":1}"#]);
    }
}
