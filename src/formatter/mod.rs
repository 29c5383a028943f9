// src/formatter/mod.rs
// The response formatting pipeline: cache check, prompt assembly, backend
// generation, post-processing, quality scoring, and cache write-through.

pub mod postprocess;
pub mod response;

pub use response::{FormattedResponse, GenerationMetrics};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::backend::{GenerationBackend, GenerationMeta};
use crate::cache::{self, ResponseCache};
use crate::context::{FormattingContext, ResponseStyle, ToolCategory};
use crate::error::FormatError;
use crate::monitor::{PerformanceMonitor, PerformanceReport, PerformanceTracker, PipelineStage};
use crate::prompt::PromptContextBuilder;
use crate::quality;
use crate::templates::{StyleDescriptor, TemplateStore};
use crate::utils::estimate_tokens;

/// Orchestrates one formatting request end to end. Stateless per call; the
/// injected cache is the only shared resource it touches.
pub struct ResponseFormatter {
    backend: Arc<dyn GenerationBackend>,
    templates: Arc<dyn TemplateStore>,
    cache: Arc<dyn ResponseCache>,
    prompt_builder: PromptContextBuilder,
}

impl ResponseFormatter {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        templates: Arc<dyn TemplateStore>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let prompt_builder = PromptContextBuilder::new(templates.clone());
        Self {
            backend,
            templates,
            cache,
            prompt_builder,
        }
    }

    /// Format a tool result into a persona-consistent reply.
    pub async fn format(&self, ctx: &FormattingContext) -> Result<FormattedResponse, FormatError> {
        let mut tracker = PerformanceTracker::disabled();
        self.format_tracked(ctx, &mut tracker).await
    }

    /// Format with stage timing wired into a monitor. On success, returns
    /// the response together with the completed performance report; on
    /// failure the tracker is discarded and the error propagates as-is.
    pub async fn format_monitored(
        &self,
        ctx: &FormattingContext,
        monitor: &PerformanceMonitor,
    ) -> Result<(FormattedResponse, PerformanceReport), FormatError> {
        let mut tracker = monitor.start_monitoring(ctx);
        let response = self.format_tracked(ctx, &mut tracker).await?;
        let report = monitor.complete_monitoring(tracker, &response);
        Ok((response, report))
    }

    async fn format_tracked(
        &self,
        ctx: &FormattingContext,
        tracker: &mut PerformanceTracker,
    ) -> Result<FormattedResponse, FormatError> {
        let config = ctx.effective_config();
        info!(
            "Formatting response for context {} (tool {}, category {})",
            ctx.context_id, ctx.result.tool_id, ctx.category
        );

        if !config.enable_llm_formatting {
            debug!(
                "LLM formatting disabled for context {}, passing result through",
                ctx.context_id
            );
            return Ok(self.passthrough(ctx, &config));
        }

        // 1. Cache read
        let fingerprint = config
            .enable_caching
            .then(|| cache::fingerprint(ctx));
        if let Some(fp) = &fingerprint {
            let started = Instant::now();
            let cached = match self.cache.get(fp).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Cache read failed, treating as miss: {:#}", e);
                    None
                }
            };
            tracker.record_stage(PipelineStage::CacheOperations, started);
            if let Some(cached) = cached {
                debug!("Cache hit for context {} ({})", ctx.context_id, fp);
                return Ok(FormattedResponse::from_cached(&cached));
            }
        }

        // 2. Template retrieval and prompt assembly
        let started = Instant::now();
        let template = self
            .prompt_builder
            .retrieve_template(ctx.category, config.response_style)
            .await;
        tracker.record_stage(PipelineStage::TemplateRetrieval, started);

        let started = Instant::now();
        let parts = self.prompt_builder.build_parts(ctx, template.as_ref());
        tracker.record_stage(PipelineStage::SystemPromptGeneration, started);

        // 3. Generation. Failures surface unretried; retry policy belongs
        // to the caller.
        let meta = GenerationMeta {
            agent_id: ctx.agent_id.clone(),
            tool_id: ctx.result.tool_id.clone(),
            context_id: ctx.context_id.clone(),
        };
        let started = Instant::now();
        let raw = self
            .backend
            .generate(&parts.system_prompt, &parts.user_context, &meta)
            .await
            .map_err(|e| {
                warn!(
                    "Generation failed for context {} via {}: {:#}",
                    ctx.context_id,
                    self.backend.name(),
                    e
                );
                FormatError::generation(e)
            })?;
        let generation_time_ms = started.elapsed().as_millis() as u64;
        tracker.record_duration(PipelineStage::LlmGeneration, generation_time_ms);

        if raw.trim().is_empty() {
            return Err(FormatError::Generation(
                "backend returned empty output".to_string(),
            ));
        }

        // 4. Post-process
        let started = Instant::now();
        let content = postprocess::post_process(&raw, &config, parts.preformatted)?;
        tracker.record_stage(PipelineStage::PostProcessing, started);

        // 5. Quality score
        let started = Instant::now();
        let quality_score = quality::score(&content, ctx);
        tracker.record_stage(PipelineStage::QualityScoring, started);

        // 6. Assemble
        let estimated_response_tokens = estimate_tokens(&content);
        let response = FormattedResponse {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            style: config.response_style,
            metrics: GenerationMetrics {
                generation_time_ms,
                estimated_prompt_tokens: estimate_tokens(&parts.system_prompt)
                    + estimate_tokens(&parts.user_context),
                estimated_response_tokens,
                cache_hit: false,
            },
            quality_score,
            fallback_used: false,
            created_at: Utc::now(),
        };

        // 7. Best-effort cache write-through
        if let Some(fp) = &fingerprint {
            let started = Instant::now();
            if let Err(e) = self
                .cache
                .set(fp, response.clone(), config.cache_ttl_seconds)
                .await
            {
                warn!("Cache write failed (ignored): {:#}", e);
            }
            tracker.record_stage(PipelineStage::CacheOperations, started);
        }

        info!(
            "Formatted context {} in {}ms (quality {:.2})",
            ctx.context_id, generation_time_ms, quality_score
        );
        Ok(response)
    }

    /// Short-circuit when LLM formatting is off: the tool's own output is
    /// returned unchanged.
    fn passthrough(
        &self,
        ctx: &FormattingContext,
        config: &crate::context::ResponseConfig,
    ) -> FormattedResponse {
        let content = raw_content(ctx);
        let quality_score = quality::score(&content, ctx);
        FormattedResponse {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            style: config.response_style,
            metrics: GenerationMetrics::default(),
            quality_score,
            fallback_used: false,
            created_at: Utc::now(),
        }
    }

    /// Styles callers can request for a category. Lookup failures degrade
    /// to the single conversational entry.
    pub async fn available_styles(&self, category: ToolCategory) -> Vec<StyleDescriptor> {
        match self.templates.available_styles(category).await {
            Ok(styles) if !styles.is_empty() => styles,
            Ok(_) => vec![StyleDescriptor::for_style(ResponseStyle::Conversational)],
            Err(e) => {
                warn!("Style lookup failed for {}: {:#}", category, e);
                vec![StyleDescriptor::for_style(ResponseStyle::Conversational)]
            }
        }
    }
}

/// The tool result's own text: string payloads as-is, other payloads as
/// pretty JSON, error message when there is no payload.
fn raw_content(ctx: &FormattingContext) -> String {
    match (&ctx.result.data, &ctx.result.error) {
        (Some(serde_json::Value::String(s)), _) => s.clone(),
        (Some(value), _) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        (None, Some(error)) => error.message.clone(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryResponseCache;
    use crate::context::{ResponseConfig, ToolExecutionResult};
    use crate::templates::InMemoryTemplateStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedBackend(&'static str);

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn generate(
            &self,
            _system_prompt: &str,
            _user_context: &str,
            _meta: &GenerationMeta,
        ) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn generate(
            &self,
            _system_prompt: &str,
            _user_context: &str,
            _meta: &GenerationMeta,
        ) -> anyhow::Result<String> {
            Err(anyhow!("model unavailable"))
        }
    }

    fn formatter(backend: Arc<dyn GenerationBackend>) -> ResponseFormatter {
        ResponseFormatter::new(
            backend,
            Arc::new(InMemoryTemplateStore::builtin()),
            Arc::new(InMemoryResponseCache::with_capacity(16)),
        )
    }

    fn context() -> FormattingContext {
        let result = ToolExecutionResult::succeeded("email_sender", json!({"sent": true}));
        FormattingContext::new(result, ToolCategory::Workspace, "agent-1", "user-1")
            .with_intent("send the report")
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let f = formatter(Arc::new(FailingBackend));
        let err = f.format(&context()).await.unwrap_err();
        assert!(matches!(err, FormatError::Generation(_)));
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_blank_output_is_a_generation_error() {
        let f = formatter(Arc::new(FixedBackend("   \n  ")));
        let err = f.format(&context()).await.unwrap_err();
        assert!(matches!(err, FormatError::Generation(_)));
    }

    #[tokio::test]
    async fn test_passthrough_when_formatting_disabled() {
        let f = formatter(Arc::new(FailingBackend));
        let ctx = context().with_config(ResponseConfig::default().with_llm_formatting(false));

        // Backend would fail, but the short-circuit never reaches it
        let response = f.format(&ctx).await.unwrap();
        assert!(response.content.contains("sent"));
        assert_eq!(response.metrics.generation_time_ms, 0);
        assert!(!response.metrics.cache_hit);
    }

    #[tokio::test]
    async fn test_passthrough_keeps_string_payload_verbatim() {
        let result =
            ToolExecutionResult::succeeded("echo", json!("already formatted by the tool itself"));
        let ctx = FormattingContext::new(result, ToolCategory::Custom, "a", "u")
            .with_config(ResponseConfig::default().with_llm_formatting(false));

        let f = formatter(Arc::new(FailingBackend));
        let response = f.format(&ctx).await.unwrap();
        assert_eq!(response.content, "already formatted by the tool itself");
    }

    #[tokio::test]
    async fn test_available_styles_falls_back_to_conversational() {
        struct BrokenStore;

        #[async_trait]
        impl TemplateStore for BrokenStore {
            async fn get_template(
                &self,
                _category: ToolCategory,
                _style: ResponseStyle,
            ) -> anyhow::Result<Option<crate::templates::PromptTemplate>> {
                Err(anyhow!("template service down"))
            }

            async fn all_templates(&self) -> anyhow::Result<Vec<crate::templates::PromptTemplate>> {
                Err(anyhow!("template service down"))
            }
        }

        let f = ResponseFormatter::new(
            Arc::new(FixedBackend("The email went out to the whole team.")),
            Arc::new(BrokenStore),
            Arc::new(InMemoryResponseCache::with_capacity(4)),
        );

        let styles = f.available_styles(ToolCategory::Workspace).await;
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].name, "conversational");

        // A broken template store must not break formatting either
        let response = f.format(&context()).await.unwrap();
        assert!(response.content.contains("email went out"));
    }
}
