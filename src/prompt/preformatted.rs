// src/prompt/preformatted.rs
// Best-effort detection of already-formatted content inside a tool result
// payload. Some tools return rendered markdown (tables, reports); when they
// do, the builder tells the backend to wrap that content instead of
// regenerating it.

use serde_json::Value;

use crate::utils::contains_emoji;

/// Payload fields that commonly carry rendered output, checked at the top
/// level and one level of nesting.
const CANDIDATE_FIELDS: &[&str] = &[
    "formatted",
    "formatted_output",
    "display",
    "markdown",
    "table",
    "report",
    "summary",
    "message",
    "text",
    "output",
    "content",
];

/// Minimum length before a field is considered a formatted block at all.
const MIN_BLOCK_LEN: usize = 50;

/// Above this length the builder switches to enhance-only instructions and
/// post-processing skips length enforcement.
pub const ENHANCE_THRESHOLD: usize = 100;

/// Find pre-formatted, human-readable content in the payload. Returns the
/// matched text so callers never re-derive it.
pub fn find_preformatted(data: &Value) -> Option<String> {
    let obj = data.as_object()?;

    for field in CANDIDATE_FIELDS {
        if let Some(Value::String(text)) = obj.get(*field) {
            if looks_preformatted(text) {
                return Some(text.clone());
            }
        }
    }

    // One level of nesting: e.g. {"result": {"formatted": "..."}}
    for value in obj.values() {
        if let Some(nested) = value.as_object() {
            for field in CANDIDATE_FIELDS {
                if let Some(Value::String(text)) = nested.get(*field) {
                    if looks_preformatted(text) {
                        return Some(text.clone());
                    }
                }
            }
        }
    }

    None
}

/// A block qualifies when it is long enough and shows formatting structure:
/// markdown table rows, bold markers, emoji, or paragraph breaks.
fn looks_preformatted(text: &str) -> bool {
    if text.chars().count() < MIN_BLOCK_LEN {
        return false;
    }

    let has_table = text.contains("|---")
        || text
            .lines()
            .any(|line| line.trim_start().starts_with('|'));

    has_table || text.contains("**") || text.contains("\n\n") || contains_emoji(text)
}
