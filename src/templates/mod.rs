// src/templates/mod.rs
// Prompt templates keyed by (tool category, response style), behind a store
// trait so template storage/versioning stays an external concern. The
// in-memory store ships with built-in templates for every pair.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{ResponseStyle, ToolCategory};

/// System-prompt skeleton plus response-shape hints for each execution
/// outcome. Looked up per request, never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub category: ToolCategory,
    pub style: ResponseStyle,
    /// Skeleton for the system prompt; persona and capability context are
    /// layered on top by the prompt builder.
    pub system_prompt: String,
    pub success_shape: String,
    pub error_shape: String,
    pub partial_shape: String,
}

/// Catalog entry describing a response style to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub name: String,
    pub description: String,
    pub characteristics: Vec<String>,
}

impl StyleDescriptor {
    pub fn for_style(style: ResponseStyle) -> Self {
        match style {
            ResponseStyle::Conversational => StyleDescriptor {
                name: "conversational".to_string(),
                description: "Friendly, natural replies that read like a colleague talking"
                    .to_string(),
                characteristics: vec![
                    "first person".to_string(),
                    "plain language".to_string(),
                    "medium length".to_string(),
                ],
            },
            ResponseStyle::Business => StyleDescriptor {
                name: "business".to_string(),
                description: "Professional, outcome-focused summaries".to_string(),
                characteristics: vec![
                    "formal tone".to_string(),
                    "leads with the result".to_string(),
                    "no slang".to_string(),
                ],
            },
            ResponseStyle::Technical => StyleDescriptor {
                name: "technical".to_string(),
                description: "Precise replies that keep identifiers, counts, and timings"
                    .to_string(),
                characteristics: vec![
                    "exact values".to_string(),
                    "includes durations".to_string(),
                    "terminology preserved".to_string(),
                ],
            },
            ResponseStyle::Casual => StyleDescriptor {
                name: "casual".to_string(),
                description: "Relaxed, upbeat replies, emoji welcome".to_string(),
                characteristics: vec![
                    "informal".to_string(),
                    "short sentences".to_string(),
                    "emoji friendly".to_string(),
                ],
            },
        }
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// Template lookup seam. Failures here degrade to the builder's fallback
/// prompt; they never abort a formatting request.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(
        &self,
        category: ToolCategory,
        style: ResponseStyle,
    ) -> Result<Option<PromptTemplate>>;

    async fn all_templates(&self) -> Result<Vec<PromptTemplate>>;

    /// Styles that have a template for this category.
    async fn available_styles(&self, category: ToolCategory) -> Result<Vec<StyleDescriptor>> {
        let styles = self
            .all_templates()
            .await?
            .into_iter()
            .filter(|t| t.category == category)
            .map(|t| StyleDescriptor::for_style(t.style))
            .collect();
        Ok(styles)
    }
}

// ============================================================================
// Built-in in-memory store
// ============================================================================

/// In-memory template store preloaded with a template per
/// (category, style) pair. Read-only after construction.
pub struct InMemoryTemplateStore {
    templates: HashMap<(ToolCategory, ResponseStyle), PromptTemplate>,
}

impl InMemoryTemplateStore {
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        for category in ToolCategory::ALL {
            for style in ResponseStyle::ALL {
                templates.insert((category, style), builtin_template(category, style));
            }
        }
        Self { templates }
    }

    pub fn with_templates(templates: Vec<PromptTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| ((t.category, t.style), t))
                .collect(),
        }
    }
}

impl Default for InMemoryTemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get_template(
        &self,
        category: ToolCategory,
        style: ResponseStyle,
    ) -> Result<Option<PromptTemplate>> {
        Ok(self.templates.get(&(category, style)).cloned())
    }

    async fn all_templates(&self) -> Result<Vec<PromptTemplate>> {
        Ok(self.templates.values().cloned().collect())
    }
}

fn builtin_template(category: ToolCategory, style: ResponseStyle) -> PromptTemplate {
    let domain = match category {
        ToolCategory::Workspace => {
            "You are reporting on a workspace action (email, calendar, files, or documents)."
        }
        ToolCategory::SocialMedia => {
            "You are reporting on a social media action (posts, scheduling, or engagement)."
        }
        ToolCategory::ExternalApi => {
            "You are reporting on a call to an external service on the user's behalf."
        }
        ToolCategory::Workflow => {
            "You are reporting on an automated workflow step (triggers, runs, or approvals)."
        }
        ToolCategory::Research => {
            "You are reporting research findings (search, analysis, or summarization)."
        }
        ToolCategory::Custom => "You are reporting on a custom tool the user has configured.",
    };

    let voice = match style {
        ResponseStyle::Conversational => {
            "Write naturally, as if talking to a colleague. Keep it warm and direct."
        }
        ResponseStyle::Business => {
            "Write professionally. Lead with the outcome, keep it concise, avoid slang."
        }
        ResponseStyle::Technical => {
            "Be precise. Preserve identifiers, counts, and durations exactly as reported."
        }
        ResponseStyle::Casual => "Keep it light and friendly. Short sentences are fine.",
    };

    PromptTemplate {
        category,
        style,
        system_prompt: format!("{} {}", domain, voice),
        success_shape: "Confirm what was accomplished and the concrete outcome.".to_string(),
        error_shape: "Explain what failed in plain terms and what the user can do next."
            .to_string(),
        partial_shape:
            "Describe what was completed, what was not, and the recommended next step."
                .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builtin_covers_every_pair() {
        let store = InMemoryTemplateStore::builtin();
        for category in ToolCategory::ALL {
            for style in ResponseStyle::ALL {
                let template = store.get_template(category, style).await.unwrap();
                assert!(template.is_some(), "missing template for {category}/{style}");
            }
        }
    }

    #[tokio::test]
    async fn test_available_styles_per_category() {
        let store = InMemoryTemplateStore::builtin();
        let styles = store
            .available_styles(ToolCategory::Workspace)
            .await
            .unwrap();
        assert_eq!(styles.len(), ResponseStyle::ALL.len());
    }

    #[tokio::test]
    async fn test_partial_store_misses_cleanly() {
        let store = InMemoryTemplateStore::with_templates(vec![builtin_template(
            ToolCategory::Research,
            ResponseStyle::Technical,
        )]);
        let hit = store
            .get_template(ToolCategory::Research, ResponseStyle::Technical)
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .get_template(ToolCategory::Workspace, ResponseStyle::Casual)
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
