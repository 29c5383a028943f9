// src/formatter/postprocess.rs
// Output cleanup between generation and delivery: trimming, length
// enforcement, and emoji stripping. Pre-formatted content is exempt from
// length enforcement regardless of the configured maximum.

use tracing::warn;

use crate::config::CONFIG;
use crate::context::ResponseConfig;
use crate::error::FormatError;
use crate::utils::strip_emojis;

const ELLIPSIS: &str = "...";

pub fn post_process(
    raw: &str,
    config: &ResponseConfig,
    preformatted: bool,
) -> Result<String, FormatError> {
    let mut text = raw.trim().to_string();

    let length = text.chars().count();
    if !preformatted && length > config.max_response_length {
        let keep = config.max_response_length.saturating_sub(ELLIPSIS.len());
        warn!(
            "Truncating response from {} to {} characters",
            length, config.max_response_length
        );
        text = text.chars().take(keep).collect::<String>() + ELLIPSIS;
    }

    if !config.include_emojis {
        text = strip_emojis(&text).trim().to_string();
    }

    if text.chars().count() < CONFIG.min_response_length {
        return Err(FormatError::Validation(format!(
            "Formatted response too short ({} chars, minimum {})",
            text.chars().count(),
            CONFIG.min_response_length
        )));
    }

    Ok(text)
}
