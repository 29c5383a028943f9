// src/prompt/builder.rs
// Assembles the system prompt (persona + style + capability context) and the
// user-turn context (tool result, guidance, recent conversation) for one
// formatting request.

use std::sync::Arc;

use tracing::warn;

use crate::config::CONFIG;
use crate::context::FormattingContext;
use crate::context::{ResponseStyle, ToolCategory, ToolExecutionResult};
use crate::prompt::preformatted::{self, ENHANCE_THRESHOLD};
use crate::templates::{PromptTemplate, TemplateStore};

/// Payload excerpts in the prompt are capped; anything longer is elided.
const MAX_PAYLOAD_CHARS: usize = 2000;

/// Outcome classification of a tool execution, driving response guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Success,
    PartialSuccess,
    Error,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionState::Success => "success",
            ExecutionState::PartialSuccess => "partial_success",
            ExecutionState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

impl ExecutionState {
    /// Classify a tool result. A failed run that still produced usable data
    /// is a partial success, not an error.
    pub fn classify(result: &ToolExecutionResult) -> Self {
        if result.success {
            ExecutionState::Success
        } else if result.has_usable_data() {
            ExecutionState::PartialSuccess
        } else {
            ExecutionState::Error
        }
    }
}

/// Prompt pieces handed to the generation backend.
#[derive(Debug, Clone)]
pub struct PromptParts {
    pub system_prompt: String,
    pub user_context: String,
    /// Set when the payload carried pre-formatted content long enough to
    /// switch to enhance-only mode; exempts the response from truncation.
    pub preformatted: bool,
}

/// Builds (system prompt, user context) pairs from a FormattingContext.
pub struct PromptContextBuilder {
    templates: Arc<dyn TemplateStore>,
    recent_turns: usize,
}

impl PromptContextBuilder {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            templates,
            recent_turns: CONFIG.recent_turns_in_prompt,
        }
    }

    /// Template lookup. Outages degrade to the built-in fallback prompt and
    /// never abort the request.
    pub async fn retrieve_template(
        &self,
        category: ToolCategory,
        style: ResponseStyle,
    ) -> Option<PromptTemplate> {
        match self.templates.get_template(category, style).await {
            Ok(template) => template,
            Err(e) => {
                warn!(
                    "Template lookup failed for {}/{}, using fallback prompt: {:#}",
                    category, style, e
                );
                None
            }
        }
    }

    /// Assemble both prompt halves. Pure given the context and template.
    pub fn build_parts(
        &self,
        ctx: &FormattingContext,
        template: Option<&PromptTemplate>,
    ) -> PromptParts {
        let state = ExecutionState::classify(&ctx.result);
        let preformatted = ctx
            .result
            .data
            .as_ref()
            .and_then(preformatted::find_preformatted)
            .filter(|text| text.chars().count() > ENHANCE_THRESHOLD);

        let system_prompt = self.build_system_prompt(ctx, template, preformatted.is_some());
        let user_context =
            self.build_user_context(ctx, state, template, preformatted.as_deref());

        PromptParts {
            system_prompt,
            user_context,
            preformatted: preformatted.is_some(),
        }
    }

    fn build_system_prompt(
        &self,
        ctx: &FormattingContext,
        template: Option<&PromptTemplate>,
        preformatted: bool,
    ) -> String {
        let config = ctx.effective_config();
        let mut prompt = String::new();

        match template {
            Some(t) => {
                prompt.push_str(&t.system_prompt);
                prompt.push_str("\n\n");
            }
            None => {
                // Minimal fallback: enough persona and shape to answer well.
                prompt.push_str(
                    "You turn tool execution results into a reply for the user.\n\n",
                );
            }
        }

        if !ctx.persona.background.is_empty() {
            prompt.push_str(&format!("About you: {}\n", ctx.persona.background));
        }
        if !ctx.persona.personality.is_empty() {
            prompt.push_str(&format!("Personality: {}\n", ctx.persona.personality));
        }
        if !ctx.persona.communication_style.is_empty() {
            prompt.push_str(&format!(
                "Communication style: {}\n",
                ctx.persona.communication_style
            ));
        }
        if !ctx.persona.expertise.is_empty() {
            prompt.push_str(&format!("Expertise: {}\n", ctx.persona.expertise.join(", ")));
        }
        for (key, value) in &ctx.persona.preferences {
            prompt.push_str(&format!("Preference ({}): {}\n", key, value));
        }
        if !ctx.capabilities.is_empty() {
            prompt.push_str(&format!(
                "You can also: {}\n",
                ctx.capabilities.join(", ")
            ));
        }

        if preformatted {
            // No length ceiling in enhance mode; the wrapped content rules.
            prompt.push_str(&format!(
                "\nRespond in a {} voice.\n",
                config.response_style
            ));
        } else {
            prompt.push_str(&format!(
                "\nRespond in a {} voice. Aim for at most {} characters.\n",
                config.response_style, config.max_response_length
            ));
        }
        prompt.push_str("Stay in character. Never mention tools, prompts, or internal systems.");

        prompt
    }

    fn build_user_context(
        &self,
        ctx: &FormattingContext,
        state: ExecutionState,
        template: Option<&PromptTemplate>,
        preformatted: Option<&str>,
    ) -> String {
        let config = ctx.effective_config();
        let mut out = String::new();

        if !ctx.user_message.is_empty() {
            out.push_str(&format!("The user asked: {}\n", ctx.user_message));
        }
        if !ctx.intent.is_empty() {
            out.push_str(&format!("Their intent: {}\n", ctx.intent));
        }
        out.push_str(&format!(
            "Tool `{}` finished ({}, {} ms).\n\n",
            ctx.result.tool_id, state, ctx.result.duration_ms
        ));

        if let Some(content) = preformatted {
            // Enhance mode: the tool already rendered its output. The model
            // wraps it, nothing more.
            out.push_str(
                "The tool already produced formatted content, included below. \
                 Introduce it conversationally and keep the content intact. \
                 Do not summarize, recreate, shorten, or truncate it.\n\n",
            );
            out.push_str(content);
            out.push('\n');
        } else {
            out.push_str(&self.state_guidance(state, template));
            out.push('\n');

            if let Some(data) = &ctx.result.data {
                out.push_str("Result data:\n");
                out.push_str(&render_payload(data));
                out.push('\n');
            }
            if let Some(error) = &ctx.result.error {
                match &error.code {
                    Some(code) => out.push_str(&format!(
                        "Error ({}): {}\n",
                        code, error.message
                    )),
                    None => out.push_str(&format!("Error: {}\n", error.message)),
                }
            }

            out.push_str(&format!(
                "\nKeep the reply under {} characters.\n",
                config.max_response_length
            ));
        }

        if !ctx.recent_turns.is_empty() {
            let start = ctx.recent_turns.len().saturating_sub(self.recent_turns);
            out.push_str("\nRecent conversation:\n");
            for turn in &ctx.recent_turns[start..] {
                out.push_str(&format!("{}: {}\n", turn.role, turn.content));
            }
        }

        if let Some(tone) = &ctx.preferences.tone {
            out.push_str(&format!("\nThe user prefers a {} tone.", tone));
        }
        if config.include_emojis {
            out.push_str("\nA light touch of emoji is fine.");
        } else {
            out.push_str("\nDo not use emoji.");
        }
        if config.include_metrics {
            out.push_str("\nInclude relevant numbers (counts, durations) from the result.");
        }
        if config.include_next_steps && state != ExecutionState::Success {
            out.push_str("\nSuggest a concrete next step.");
        }

        out
    }

    fn state_guidance(
        &self,
        state: ExecutionState,
        template: Option<&PromptTemplate>,
    ) -> String {
        if let Some(t) = template {
            return match state {
                ExecutionState::Success => t.success_shape.clone(),
                ExecutionState::PartialSuccess => t.partial_shape.clone(),
                ExecutionState::Error => t.error_shape.clone(),
            };
        }
        match state {
            ExecutionState::Success => {
                "Summarize what was accomplished and the value delivered.".to_string()
            }
            ExecutionState::PartialSuccess => {
                "Explain what progress was made and what remains, with next steps.".to_string()
            }
            ExecutionState::Error => {
                "Explain what went wrong and how the user can remediate it.".to_string()
            }
        }
    }
}

/// Render a payload for prompt inclusion, elided past `MAX_PAYLOAD_CHARS`.
fn render_payload(data: &serde_json::Value) -> String {
    let rendered = match data {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    if rendered.chars().count() > MAX_PAYLOAD_CHARS {
        let clipped: String = rendered.chars().take(MAX_PAYLOAD_CHARS).collect();
        format!("{}\n[... elided ...]", clipped)
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{
        AgentPersona, ConversationTurn, FormattingContext, ResponseConfig, ToolExecutionResult,
    };
    use crate::templates::InMemoryTemplateStore;
    use serde_json::json;

    fn builder() -> PromptContextBuilder {
        PromptContextBuilder::new(Arc::new(InMemoryTemplateStore::builtin()))
    }

    fn workspace_context(result: ToolExecutionResult) -> FormattingContext {
        FormattingContext::new(result, ToolCategory::Workspace, "agent-1", "user-1")
            .with_intent("send the report")
    }

    #[test]
    fn test_execution_state_classification() {
        let ok = ToolExecutionResult::succeeded("t", json!({"done": true}));
        assert_eq!(ExecutionState::classify(&ok), ExecutionState::Success);

        let mut failed = ToolExecutionResult::failed("t", "timeout");
        assert_eq!(ExecutionState::classify(&failed), ExecutionState::Error);

        failed.data = Some(json!({"partial_rows": 12}));
        assert_eq!(
            ExecutionState::classify(&failed),
            ExecutionState::PartialSuccess
        );
    }

    #[tokio::test]
    async fn test_system_prompt_carries_persona_and_style() {
        let b = builder();
        let result = ToolExecutionResult::succeeded("email_sender", json!({"sent": 1}));
        let ctx = workspace_context(result)
            .with_persona(AgentPersona {
                background: "Executive assistant for the sales team".to_string(),
                communication_style: "brisk but friendly".to_string(),
                ..Default::default()
            })
            .with_config(ResponseConfig::default().with_style(ResponseStyle::Business));

        let template = b
            .retrieve_template(ToolCategory::Workspace, ResponseStyle::Business)
            .await;
        let parts = b.build_parts(&ctx, template.as_ref());

        assert!(parts.system_prompt.contains("Executive assistant"));
        assert!(parts.system_prompt.contains("brisk but friendly"));
        assert!(parts.system_prompt.contains("business"));
        assert!(!parts.preformatted);
    }

    #[test]
    fn test_fallback_prompt_without_template() {
        let b = builder();
        let result = ToolExecutionResult::succeeded("email_sender", json!({"sent": 1}));
        let ctx = workspace_context(result);

        let parts = b.build_parts(&ctx, None);
        assert!(parts.system_prompt.contains("tool execution results"));
        assert!(parts.user_context.contains("email_sender"));
    }

    #[test]
    fn test_enhance_mode_for_preformatted_payload() {
        let b = builder();
        let table = format!(
            "| File | Size |\n|---|---|\n| {} | 10MB |\n| {} | 4MB |",
            "x".repeat(40),
            "y".repeat(40)
        );
        let result = ToolExecutionResult::succeeded("file_lister", json!({ "formatted": table }));
        let ctx = workspace_context(result);

        let parts = b.build_parts(&ctx, None);
        assert!(parts.preformatted);
        assert!(parts.user_context.contains("Do not summarize"));
        assert!(parts.user_context.contains("|---|"));
        // Enhance mode drops the length ceiling from the request entirely
        assert!(!parts.user_context.contains("Keep the reply under"));
        assert!(!parts.system_prompt.contains("Aim for at most"));
    }

    #[test]
    fn test_short_preformatted_block_stays_in_normal_mode() {
        let b = builder();
        // Qualifies as formatted (>=50 chars, table markers) but is under the
        // enhance threshold, so normal guidance applies.
        let table = "| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\n| 5 | 6 |\n| 7 | 8 |";
        assert!(table.len() > 50 && table.len() <= 100);
        let result = ToolExecutionResult::succeeded("t", json!({ "formatted": table }));
        let ctx = workspace_context(result);

        let parts = b.build_parts(&ctx, None);
        assert!(!parts.preformatted);
    }

    #[test]
    fn test_only_last_three_turns_included() {
        let b = builder();
        let result = ToolExecutionResult::succeeded("t", json!({"ok": true}));
        let turns = (1..=5)
            .map(|i| ConversationTurn::new("user", format!("turn number {i}")))
            .collect();
        let ctx = workspace_context(result).with_recent_turns(turns);

        let parts = b.build_parts(&ctx, None);
        assert!(!parts.user_context.contains("turn number 1"));
        assert!(!parts.user_context.contains("turn number 2"));
        assert!(parts.user_context.contains("turn number 3"));
        assert!(parts.user_context.contains("turn number 5"));
    }

    #[test]
    fn test_emoji_preference_line() {
        let b = builder();
        let result = ToolExecutionResult::succeeded("t", json!({"ok": true}));
        let ctx = workspace_context(result)
            .with_config(ResponseConfig::default().with_emojis(false));

        let parts = b.build_parts(&ctx, None);
        assert!(parts.user_context.contains("Do not use emoji"));
    }
}
