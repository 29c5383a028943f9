// src/backend/mod.rs
// Generation backend seam. The pipeline consumes this capability; callers
// inject whichever provider they run (and own its timeout policy).

use anyhow::Result;
use async_trait::async_trait;

/// Request metadata passed through to the provider for tracing and routing.
#[derive(Debug, Clone)]
pub struct GenerationMeta {
    pub agent_id: String,
    pub tool_id: String,
    pub context_id: String,
}

/// Text generation capability. Any transport or model failure is surfaced
/// as an error; the pipeline maps all of them to `FormatError::Generation`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Provider name for logging/debugging
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        system_prompt: &str,
        user_context: &str,
        meta: &GenerationMeta,
    ) -> Result<String>;
}
