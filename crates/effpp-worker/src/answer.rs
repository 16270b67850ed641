//! Answer post-processing.

use std::sync::LazyLock;

use regex::Regex;

/// Default word limit of an answer.
pub const DEFAULT_WORD_LIMIT: usize = 55;

/// Text used when a describer returns nothing.
pub const EMPTY_ANSWER_TEXT: &str = "explanation pending";

static YES_NO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(yes|no)\b").unwrap());

/// Whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse whitespace and keep at most `limit` words.
pub fn truncate_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Some(true)` for a leading "yes", `Some(false)` for "no".
pub fn yes_no_prefix(text: &str) -> Option<bool> {
    YES_NO_PREFIX
        .captures(text.trim_start())
        .map(|caps| caps[1].eq_ignore_ascii_case("yes"))
}

/// Final answer text for a record.
///
/// Text that already opens with yes/no is kept as truncated. Otherwise the
/// text is cut one word shorter and given a `Yes, `/`No, ` label, so the
/// answer never exceeds `limit` words.
///
/// # Arguments
/// * `raw` - Describer output
/// * `manipulated` - Selects the label
/// * `limit` - Maximum words in the returned answer
pub fn build_answer(raw: &str, manipulated: bool, limit: usize) -> String {
    let text = truncate_words(raw, limit);
    if yes_no_prefix(&text).is_some() {
        return text;
    }
    let mut body = truncate_words(raw, limit.saturating_sub(1).max(1));
    if body.is_empty() {
        body = EMPTY_ANSWER_TEXT.to_string();
    }
    let prefix = if manipulated { "Yes" } else { "No" };
    format!("{}, {}", prefix, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_normalizes_whitespace() {
        assert_eq!(truncate_words("  a\nb\t c  d ", 3), "a b c");
        assert_eq!(truncate_words("one two", 55), "one two");
        assert_eq!(truncate_words("   ", 5), "");
    }

    #[test]
    fn test_build_answer_prefixes_label() {
        assert_eq!(
            build_answer("Blending seam along the jaw.", true, 55),
            "Yes, Blending seam along the jaw."
        );
        assert_eq!(build_answer("Even lighting.", false, 55), "No, Even lighting.");
    }

    #[test]
    fn test_build_answer_keeps_existing_prefix() {
        assert_eq!(build_answer("yes, the mouth blurs", true, 55), "yes, the mouth blurs");
        assert_eq!(build_answer("No. Skin looks natural.", false, 55), "No. Skin looks natural.");
        // "Notable" is not a "no".
        assert_eq!(build_answer("Notable warping", true, 55), "Yes, Notable warping");
    }

    #[test]
    fn test_build_answer_empty_and_long() {
        assert_eq!(build_answer("", true, 55), "Yes, explanation pending");
        let long = vec!["word"; 80].join(" ");
        let answer = build_answer(&long, false, 55);
        assert_eq!(word_count(&answer), 55);
        assert!(answer.starts_with("No, word"));

        let labelled = format!("Yes, {}", long);
        assert_eq!(word_count(&build_answer(&labelled, true, 55)), 55);
    }

    #[test]
    fn test_full_length_answers_stay_within_limit() {
        for limit in [2, 10, DEFAULT_WORD_LIMIT] {
            let raw = vec!["seam"; limit + 5].join(" ");
            for manipulated in [true, false] {
                let answer = build_answer(&raw, manipulated, limit);
                assert_eq!(word_count(&answer), limit, "limit {}", limit);
                assert_eq!(yes_no_prefix(&answer), Some(manipulated));
            }
        }
    }

    #[test]
    fn test_yes_no_prefix() {
        assert_eq!(yes_no_prefix("YES it is"), Some(true));
        assert_eq!(yes_no_prefix(" no."), Some(false));
        assert_eq!(yes_no_prefix("nothing odd"), None);
        assert_eq!(yes_no_prefix("Maybe"), None);
    }
}
