// tests/concurrency_test.rs
// The cache and the monitor's history/alert stores are the only shared
// mutable state; they must hold up under concurrent in-flight requests.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use quill::{
    FormattingContext, GenerationBackend, GenerationMeta, InMemoryResponseCache,
    InMemoryTemplateStore, PerformanceMonitor, ResponseConfig, ResponseFormatter, ToolCategory,
    ToolExecutionResult,
};

struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn generate(
        &self,
        _system_prompt: &str,
        user_context: &str,
        _meta: &GenerationMeta,
    ) -> Result<String> {
        // Yield once so requests interleave
        tokio::task::yield_now().await;
        Ok(format!("Handled a request of {} characters.", user_context.len()))
    }
}

fn context_for(tool: &str) -> FormattingContext {
    let result = ToolExecutionResult::succeeded(tool, json!({"ok": true, "tool": tool}));
    FormattingContext::new(result, ToolCategory::Workspace, "agent-1", "user-1")
        .with_intent("run the task")
        .with_config(ResponseConfig::default().with_caching(true))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_cache_and_monitor() {
    let formatter = Arc::new(ResponseFormatter::new(
        Arc::new(EchoBackend),
        Arc::new(InMemoryTemplateStore::builtin()),
        Arc::new(InMemoryResponseCache::with_capacity(64)),
    ));
    let monitor = Arc::new(PerformanceMonitor::default());

    let mut handles = Vec::new();
    for i in 0..16 {
        let formatter = formatter.clone();
        let monitor = monitor.clone();
        // Four distinct tools, four requests each: plenty of fingerprint
        // collisions to exercise shared cache entries
        let tool = format!("tool_{}", i % 4);
        handles.push(tokio::spawn(async move {
            let ctx = context_for(&tool);
            formatter.format_monitored(&ctx, &monitor).await
        }));
    }

    let mut completed = 0;
    for handle in handles {
        let result = handle.await.expect("task panicked");
        let (response, report) = result.expect("formatting failed");
        assert!(!response.content.is_empty());
        assert!(!report.context_id.is_empty());
        completed += 1;
    }

    assert_eq!(completed, 16);
    assert_eq!(monitor.history_summary().requests, 16);
}
