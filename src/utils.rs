// src/utils.rs
// Shared text helpers: emoji handling and token estimation.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Emoji utilities
// ============================================================================

/// Matches the emoji blocks we care about: emoticons, pictographs, transport,
/// supplemental symbols, flags, dingbats, and the misc-symbols range.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F300}-\u{1F5FF}",
        "\u{1F600}-\u{1F64F}",
        "\u{1F680}-\u{1F6FF}",
        "\u{1F900}-\u{1F9FF}",
        "\u{1FA70}-\u{1FAFF}",
        "\u{1F1E6}-\u{1F1FF}",
        "\u{2600}-\u{26FF}",
        "\u{2700}-\u{27BF}",
        "\u{FE0F}",
        "\u{200D}",
        "]",
    ))
    .expect("emoji regex is valid")
});

/// True if the text contains at least one emoji code point.
pub fn contains_emoji(text: &str) -> bool {
    EMOJI_RE.is_match(text)
}

/// Remove all emoji code points, preserving the remaining text as-is.
pub fn strip_emojis(text: &str) -> String {
    EMOJI_RE.replace_all(text, "").into_owned()
}

// ============================================================================
// Token estimation
// ============================================================================

/// Rough token estimate (~4 characters per token). Good enough for metrics;
/// never used for billing or truncation decisions.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
