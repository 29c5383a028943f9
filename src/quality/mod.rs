// src/quality/mod.rs
// Heuristic quality scoring for generated responses. Pure and
// deterministic: identical (text, context) pairs always score identically.

use crate::context::{FormattingContext, ResponseStyle};
use crate::utils::contains_emoji;

/// Base score every response starts from.
const BASE_SCORE: f64 = 0.5;
/// Responses score best near this fraction of the configured maximum.
const TARGET_LENGTH_RATIO: f64 = 0.7;

/// Score a response in [0, 1].
///
/// Additive, capped contributions on top of the 0.5 base:
/// up to +0.2 for length proximity to 70% of the configured maximum,
/// +0.1 when the tool id appears in the text, +0.1 when any intent word
/// appears, +0.1 for style adherence.
pub fn score(text: &str, ctx: &FormattingContext) -> f64 {
    let config = ctx.effective_config();
    let text_lower = text.to_lowercase();
    let length = text.chars().count();

    let mut total = BASE_SCORE;

    let target = config.max_response_length as f64 * TARGET_LENGTH_RATIO;
    if target > 0.0 {
        let ratio = (length as f64 / target).min(1.0);
        total += 0.2 * ratio;
    }

    if text_lower.contains(&ctx.result.tool_id.to_lowercase()) {
        total += 0.1;
    }

    if ctx
        .intent
        .split_whitespace()
        .any(|word| !word.is_empty() && text_lower.contains(&word.to_lowercase()))
    {
        total += 0.1;
    }

    if matches_style(text, length, config.response_style) {
        total += 0.1;
    }

    total.min(1.0)
}

fn matches_style(text: &str, length: usize, style: ResponseStyle) -> bool {
    match style {
        ResponseStyle::Casual => text.contains('!') || contains_emoji(text),
        ResponseStyle::Business => length > 50,
        ResponseStyle::Technical => text.contains("ms"),
        ResponseStyle::Conversational => length > 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ResponseConfig, ToolCategory, ToolExecutionResult};
    use serde_json::json;

    fn context(style: ResponseStyle, max_len: usize) -> FormattingContext {
        let result = ToolExecutionResult::succeeded("email_sender", json!({"sent": true}));
        FormattingContext::new(result, ToolCategory::Workspace, "agent-1", "user-1")
            .with_intent("send the report")
            .with_config(
                ResponseConfig::default()
                    .with_style(style)
                    .with_max_length(max_len),
            )
    }

    #[test]
    fn test_score_is_deterministic() {
        let ctx = context(ResponseStyle::Business, 500);
        let text = "The report was sent to the whole team this morning as requested.";
        let first = score(text, &ctx);
        for _ in 0..10 {
            assert_eq!(score(text, &ctx), first);
        }
    }

    #[test]
    fn test_base_score_only() {
        // Technical style, short text, no tool id, no intent words: only the
        // length ratio contributes beyond the base.
        let ctx = context(ResponseStyle::Technical, 1000);
        let text = "Okay.";
        let expected = 0.5 + 0.2 * (5.0 / 700.0);
        assert!((score(text, &ctx) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_tool_id_mention_bonus() {
        let ctx = context(ResponseStyle::Technical, 1000);
        let without = score("Done.", &ctx);
        let with = score("Done via email_sender.", &ctx);
        assert!(with > without + 0.09);
    }

    #[test]
    fn test_intent_word_bonus_is_case_insensitive() {
        let ctx = context(ResponseStyle::Technical, 1000);
        let with = score("The REPORT went out.", &ctx);
        let without = score("It went out.", &ctx);
        assert!(with > without);
    }

    #[test]
    fn test_style_adherence_branches() {
        let casual = context(ResponseStyle::Casual, 1000);
        assert!(score("Done!", &casual) > score("Done.", &casual));
        assert!(score("Done 🎉", &casual) > score("Done.", &casual));

        let business = context(ResponseStyle::Business, 1000);
        let long = "The quarterly report was delivered to all stakeholders today.";
        assert!(long.len() > 50);
        assert!(score(long, &business) > score("Delivered.", &business) + 0.05);

        let technical = context(ResponseStyle::Technical, 1000);
        assert!(score("Completed in 340ms.", &technical) > score("Completed.", &technical));

        let conversational = context(ResponseStyle::Conversational, 1000);
        let chatty = "I went ahead and took care of that for you just now.";
        assert!(chatty.len() > 30);
        assert!(score(chatty, &conversational) > score("Done.", &conversational) + 0.05);
    }

    #[test]
    fn test_score_never_exceeds_one() {
        let ctx = context(ResponseStyle::Casual, 10);
        let text = "email_sender sent the report! 🎉 All recipients confirmed receipt.";
        let s = score(text, &ctx);
        assert!(s <= 1.0);
        assert!(s > 0.9);
    }

    #[test]
    fn test_zero_max_length_is_safe() {
        let ctx = context(ResponseStyle::Technical, 0);
        let s = score("Completed.", &ctx);
        assert!((0.0..=1.0).contains(&s));
    }
}
