//! Character-budget helpers shared by the upload response and the LLM prompt.
//!
//! Budgets count Unicode scalar values, never bytes, so a cut can't land
//! inside a multi-byte character.

use std::borrow::Cow;

/// Return at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Cut `text` to `max_chars` characters and append `marker` when anything was dropped.
pub fn truncate_with_marker<'a>(text: &'a str, max_chars: usize, marker: &str) -> Cow<'a, str> {
    let kept = truncate_chars(text, max_chars);
    if kept.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{kept}{marker}"))
    }
}
