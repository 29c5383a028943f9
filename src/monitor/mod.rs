// src/monitor/mod.rs
// Multi-stage performance monitoring for the formatting pipeline: per-stage
// timers, threshold-based bottleneck classification, optimization
// suggestions, and alerting on slow requests.

pub mod alerts;

pub use alerts::{AlertStore, AlertType, PerformanceAlert};

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CONFIG;
use crate::context::{FormattingContext, ToolCategory};
use crate::formatter::response::FormattedResponse;

// ============================================================================
// Stages and stage metrics
// ============================================================================

/// One independently timed phase of the formatting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    TemplateRetrieval,
    SystemPromptGeneration,
    LlmGeneration,
    PostProcessing,
    QualityScoring,
    CacheOperations,
    TotalProcessing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::TemplateRetrieval => "template_retrieval",
            PipelineStage::SystemPromptGeneration => "system_prompt_generation",
            PipelineStage::LlmGeneration => "llm_generation",
            PipelineStage::PostProcessing => "post_processing",
            PipelineStage::QualityScoring => "quality_scoring",
            PipelineStage::CacheOperations => "cache_operations",
            PipelineStage::TotalProcessing => "total_processing",
        };
        write!(f, "{}", name)
    }
}

impl PipelineStage {
    /// Every stage with a configurable threshold, total included.
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::TemplateRetrieval,
        PipelineStage::SystemPromptGeneration,
        PipelineStage::LlmGeneration,
        PipelineStage::PostProcessing,
        PipelineStage::QualityScoring,
        PipelineStage::CacheOperations,
        PipelineStage::TotalProcessing,
    ];
}

/// Measured durations for one request. Stages that never ran report 0.
/// Total is wall clock from request start to completion, not a stage sum.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingStageMetrics {
    pub template_retrieval_ms: u64,
    pub system_prompt_generation_ms: u64,
    pub llm_generation_ms: u64,
    pub post_processing_ms: u64,
    pub quality_scoring_ms: u64,
    pub cache_operations_ms: u64,
    pub total_processing_ms: u64,
}

impl ProcessingStageMetrics {
    pub fn duration_for(&self, stage: PipelineStage) -> u64 {
        match stage {
            PipelineStage::TemplateRetrieval => self.template_retrieval_ms,
            PipelineStage::SystemPromptGeneration => self.system_prompt_generation_ms,
            PipelineStage::LlmGeneration => self.llm_generation_ms,
            PipelineStage::PostProcessing => self.post_processing_ms,
            PipelineStage::QualityScoring => self.quality_scoring_ms,
            PipelineStage::CacheOperations => self.cache_operations_ms,
            PipelineStage::TotalProcessing => self.total_processing_ms,
        }
    }

    fn set(&mut self, stage: PipelineStage, ms: u64) {
        match stage {
            PipelineStage::TemplateRetrieval => self.template_retrieval_ms = ms,
            PipelineStage::SystemPromptGeneration => self.system_prompt_generation_ms = ms,
            PipelineStage::LlmGeneration => self.llm_generation_ms = ms,
            PipelineStage::PostProcessing => self.post_processing_ms = ms,
            PipelineStage::QualityScoring => self.quality_scoring_ms = ms,
            PipelineStage::CacheOperations => self.cache_operations_ms = ms,
            PipelineStage::TotalProcessing => self.total_processing_ms = ms,
        }
    }
}

// ============================================================================
// Thresholds and severity
// ============================================================================

/// Per-stage duration budgets in milliseconds. Kept as configuration data
/// so deployments can tune them without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageThresholds {
    pub template_retrieval_ms: u64,
    pub system_prompt_generation_ms: u64,
    pub llm_generation_ms: u64,
    pub post_processing_ms: u64,
    pub quality_scoring_ms: u64,
    pub cache_operations_ms: u64,
    pub total_processing_ms: u64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            template_retrieval_ms: CONFIG.threshold_template_retrieval_ms,
            system_prompt_generation_ms: CONFIG.threshold_system_prompt_ms,
            llm_generation_ms: CONFIG.threshold_llm_generation_ms,
            post_processing_ms: CONFIG.threshold_post_processing_ms,
            quality_scoring_ms: CONFIG.threshold_quality_scoring_ms,
            cache_operations_ms: CONFIG.threshold_cache_operations_ms,
            total_processing_ms: CONFIG.threshold_total_processing_ms,
        }
    }
}

impl StageThresholds {
    pub fn for_stage(&self, stage: PipelineStage) -> u64 {
        match stage {
            PipelineStage::TemplateRetrieval => self.template_retrieval_ms,
            PipelineStage::SystemPromptGeneration => self.system_prompt_generation_ms,
            PipelineStage::LlmGeneration => self.llm_generation_ms,
            PipelineStage::PostProcessing => self.post_processing_ms,
            PipelineStage::QualityScoring => self.quality_scoring_ms,
            PipelineStage::CacheOperations => self.cache_operations_ms,
            PipelineStage::TotalProcessing => self.total_processing_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Ratio breakpoints for severity, highest first. A stage at 5x its budget
/// is critical, 3x high, 2x medium, anything over budget below that is low.
const SEVERITY_BREAKPOINTS: [(f64, BottleneckSeverity); 3] = [
    (5.0, BottleneckSeverity::Critical),
    (3.0, BottleneckSeverity::High),
    (2.0, BottleneckSeverity::Medium),
];

pub fn classify_severity(duration_ms: u64, threshold_ms: u64) -> BottleneckSeverity {
    if threshold_ms == 0 {
        return BottleneckSeverity::Critical;
    }
    let ratio = duration_ms as f64 / threshold_ms as f64;
    for (cutoff, severity) in SEVERITY_BREAKPOINTS {
        if ratio >= cutoff {
            return severity;
        }
    }
    BottleneckSeverity::Low
}

// ============================================================================
// Bottlenecks and suggestions
// ============================================================================

/// A stage that exceeded its configured budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceBottleneck {
    pub stage: PipelineStage,
    pub duration_ms: u64,
    pub threshold_ms: u64,
    pub severity: BottleneckSeverity,
    pub impact: String,
    pub recommendation: String,
}

fn stage_recommendation(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::TemplateRetrieval => {
            "Preload templates into memory or front them with a local cache"
        }
        PipelineStage::SystemPromptGeneration => {
            "Precompute persona sections and reuse them across requests"
        }
        PipelineStage::LlmGeneration => {
            "Shorten prompts, switch to a faster model, or stream the output"
        }
        PipelineStage::PostProcessing => {
            "Combine truncation and emoji stripping into a single pass"
        }
        PipelineStage::QualityScoring => "Simplify the scoring heuristics",
        PipelineStage::CacheOperations => {
            "Reduce cached payload sizes or batch cache round-trips"
        }
        PipelineStage::TotalProcessing => {
            "Enable response streaming and overlap independent stages"
        }
    }
}

/// Compare every stage against its threshold and emit a bottleneck for each
/// overrun. A stage at or under budget emits nothing.
pub fn detect_bottlenecks(
    metrics: &ProcessingStageMetrics,
    thresholds: &StageThresholds,
) -> Vec<PerformanceBottleneck> {
    let mut found = Vec::new();
    for stage in PipelineStage::ALL {
        let duration = metrics.duration_for(stage);
        let threshold = thresholds.for_stage(stage);
        if duration > threshold {
            let severity = classify_severity(duration, threshold);
            found.push(PerformanceBottleneck {
                stage,
                duration_ms: duration,
                threshold_ms: threshold,
                severity,
                impact: format!(
                    "{} took {}ms against a {}ms budget",
                    stage, duration, threshold
                ),
                recommendation: stage_recommendation(stage).to_string(),
            });
        }
    }
    found
}

/// Free-text optimization guidance: global rules, category-specific rules,
/// and the recommendations of any high or critical bottleneck. De-duplicated
/// preserving first-seen order.
pub fn build_suggestions(
    category: ToolCategory,
    metrics: &ProcessingStageMetrics,
    bottlenecks: &[PerformanceBottleneck],
) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        if !suggestions.iter().any(|existing| existing == s) {
            suggestions.push(s.to_string());
        }
    };

    if metrics.total_processing_ms > 1000 {
        push("Enable response streaming so users see output sooner");
    }
    if metrics.llm_generation_ms > 1500 {
        push("Optimize the prompt or pick a lighter model for this category");
    }

    match category {
        ToolCategory::Workspace => {
            if metrics.cache_operations_ms > 100 {
                push("Batch workspace cache operations into one round-trip");
            }
        }
        ToolCategory::SocialMedia => {
            if metrics.post_processing_ms > 50 {
                push("Precompile the emoji and formatting passes for social content");
            }
        }
        ToolCategory::ExternalApi => {
            if metrics.llm_generation_ms > 2500 {
                push("Stream or summarize large external API payloads before generation");
            }
        }
        ToolCategory::Workflow => {
            if metrics.system_prompt_generation_ms > 150 {
                push("Precompute workflow prompt skeletons at startup");
            }
        }
        ToolCategory::Research => {
            if metrics.total_processing_ms > 2000 {
                push("Summarize research results in chunks instead of one pass");
            }
        }
        ToolCategory::Custom => {}
    }

    for bottleneck in bottlenecks {
        if bottleneck.severity >= BottleneckSeverity::High {
            push(&bottleneck.recommendation);
        }
    }

    suggestions
}

// ============================================================================
// Tracker
// ============================================================================

/// Per-request stage timer. Request-local: records need no locks. Completion
/// consumes the tracker, so a tracker cannot be completed twice.
#[derive(Debug)]
pub struct PerformanceTracker {
    context_id: String,
    category: ToolCategory,
    enabled: bool,
    started: Instant,
    stages: HashMap<PipelineStage, u64>,
}

impl PerformanceTracker {
    fn new(context_id: String, category: ToolCategory, enabled: bool) -> Self {
        Self {
            context_id,
            category,
            enabled,
            started: Instant::now(),
            stages: HashMap::new(),
        }
    }

    /// Tracker that records nothing; used when monitoring is disabled and by
    /// pipeline callers that opted out.
    pub fn disabled() -> Self {
        Self::new(String::new(), ToolCategory::Custom, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Record a stage completion from its start instant. Repeated records
    /// for the same stage accumulate (e.g. cache read + cache write).
    pub fn record_stage(&mut self, stage: PipelineStage, started_at: Instant) {
        self.record_duration(stage, started_at.elapsed().as_millis() as u64);
    }

    /// Record an externally measured duration.
    pub fn record_duration(&mut self, stage: PipelineStage, ms: u64) {
        if !self.enabled {
            return;
        }
        *self.stages.entry(stage).or_insert(0) += ms;
    }

    fn into_metrics(self) -> ProcessingStageMetrics {
        let mut metrics = ProcessingStageMetrics::default();
        for (stage, ms) in &self.stages {
            metrics.set(*stage, *ms);
        }
        // Total is wall clock unless the caller recorded it explicitly.
        if !self.stages.contains_key(&PipelineStage::TotalProcessing) {
            metrics.total_processing_ms = self.started.elapsed().as_millis() as u64;
        }
        metrics
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Runtime-tunable monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub enabled: bool,
    pub thresholds: StageThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: CONFIG.monitoring_enabled,
            thresholds: StageThresholds::default(),
        }
    }
}

/// Everything the monitor derives from one completed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub context_id: String,
    pub category: ToolCategory,
    pub metrics: ProcessingStageMetrics,
    pub bottlenecks: Vec<PerformanceBottleneck>,
    pub suggestions: Vec<String>,
    pub alerts: Vec<PerformanceAlert>,
    pub quality_score: f64,
    pub completed_at: DateTime<Utc>,
}

/// Aggregates over the retained report history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSummary {
    pub requests: usize,
    pub avg_total_ms: u64,
    pub max_total_ms: u64,
    pub avg_quality_score: f64,
}

/// Wraps pipeline invocations with stage timing and turns the recorded
/// durations into bottlenecks, suggestions, and alerts. The alert store and
/// report history are the only shared state; both are lock-protected with
/// short critical sections.
pub struct PerformanceMonitor {
    config: RwLock<MonitorConfig>,
    alerts: AlertStore,
    history: RwLock<VecDeque<PerformanceReport>>,
    history_cap: usize,
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config: RwLock::new(config),
            alerts: AlertStore::default(),
            history: RwLock::new(VecDeque::new()),
            history_cap: CONFIG.report_history_cap,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.read().map(|c| c.enabled).unwrap_or(false)
    }

    /// Begin tracking one request. Returns a no-op tracker when disabled;
    /// disabling monitoring never changes pipeline behavior, only metrics.
    pub fn start_monitoring(&self, ctx: &FormattingContext) -> PerformanceTracker {
        let enabled = self.is_enabled();
        debug!(
            "Starting performance tracking for context {} (enabled: {})",
            ctx.context_id, enabled
        );
        PerformanceTracker::new(ctx.context_id.clone(), ctx.category, enabled)
    }

    /// Convenience passthrough matching the tracker's own method.
    pub fn record_stage(
        &self,
        tracker: &mut PerformanceTracker,
        stage: PipelineStage,
        started_at: Instant,
    ) {
        tracker.record_stage(stage, started_at);
    }

    /// Terminal step: consumes the tracker, so completing the same tracker
    /// twice is a compile error rather than undefined behavior. Alerts
    /// raised here are also retained in the store for `active_alerts`.
    pub fn complete_monitoring(
        &self,
        tracker: PerformanceTracker,
        response: &FormattedResponse,
    ) -> PerformanceReport {
        let context_id = tracker.context_id.clone();
        let category = tracker.category;

        if !tracker.enabled {
            return PerformanceReport {
                context_id,
                category,
                metrics: ProcessingStageMetrics::default(),
                bottlenecks: Vec::new(),
                suggestions: Vec::new(),
                alerts: Vec::new(),
                quality_score: response.quality_score,
                completed_at: Utc::now(),
            };
        }

        let thresholds = self
            .config
            .read()
            .map(|c| c.thresholds.clone())
            .unwrap_or_default();

        let metrics = tracker.into_metrics();
        let bottlenecks = detect_bottlenecks(&metrics, &thresholds);
        let suggestions = build_suggestions(category, &metrics, &bottlenecks);
        let alerts = self.raise_alerts(&context_id, &metrics);

        for bottleneck in &bottlenecks {
            if bottleneck.severity >= BottleneckSeverity::High {
                warn!(
                    "Bottleneck in context {}: {} ({:?})",
                    context_id, bottleneck.impact, bottleneck.severity
                );
            }
        }
        info!(
            "Completed monitoring for context {}: total {}ms, {} bottleneck(s)",
            context_id,
            metrics.total_processing_ms,
            bottlenecks.len()
        );

        let report = PerformanceReport {
            context_id,
            category,
            metrics,
            bottlenecks,
            suggestions,
            alerts,
            quality_score: response.quality_score,
            completed_at: Utc::now(),
        };

        if let Ok(mut history) = self.history.write() {
            while history.len() >= self.history_cap {
                history.pop_front();
            }
            history.push_back(report.clone());
        }

        report
    }

    fn raise_alerts(
        &self,
        context_id: &str,
        metrics: &ProcessingStageMetrics,
    ) -> Vec<PerformanceAlert> {
        let mut raised = Vec::new();

        if metrics.total_processing_ms > CONFIG.alert_total_processing_ms {
            let alert = PerformanceAlert::new(
                AlertType::SlowResponse,
                BottleneckSeverity::High,
                format!(
                    "Total processing took {}ms (limit {}ms)",
                    metrics.total_processing_ms, CONFIG.alert_total_processing_ms
                ),
                context_id,
            );
            warn!("Performance alert: {}", alert.message);
            self.alerts.push(alert.clone());
            raised.push(alert);
        }

        if metrics.llm_generation_ms > CONFIG.alert_llm_generation_ms {
            let alert = PerformanceAlert::new(
                AlertType::SlowGeneration,
                BottleneckSeverity::High,
                format!(
                    "Generation took {}ms (limit {}ms)",
                    metrics.llm_generation_ms, CONFIG.alert_llm_generation_ms
                ),
                context_id,
            );
            warn!("Performance alert: {}", alert.message);
            self.alerts.push(alert.clone());
            raised.push(alert);
        }

        raised
    }

    pub fn active_alerts(&self) -> Vec<PerformanceAlert> {
        self.alerts.active()
    }

    /// Swap parts of the monitor configuration at runtime.
    pub fn update_configuration(
        &self,
        enabled: Option<bool>,
        thresholds: Option<StageThresholds>,
    ) {
        if let Ok(mut config) = self.config.write() {
            if let Some(enabled) = enabled {
                config.enabled = enabled;
            }
            if let Some(thresholds) = thresholds {
                config.thresholds = thresholds;
            }
            info!("Monitor configuration updated (enabled: {})", config.enabled);
        }
    }

    /// Aggregates over the retained reports.
    pub fn history_summary(&self) -> MonitorSummary {
        let history = match self.history.read() {
            Ok(h) => h,
            Err(_) => return MonitorSummary::default(),
        };
        if history.is_empty() {
            return MonitorSummary::default();
        }

        let requests = history.len();
        let total_sum: u64 = history.iter().map(|r| r.metrics.total_processing_ms).sum();
        let max_total = history
            .iter()
            .map(|r| r.metrics.total_processing_ms)
            .max()
            .unwrap_or(0);
        let quality_sum: f64 = history.iter().map(|r| r.quality_score).sum();

        MonitorSummary {
            requests,
            avg_total_ms: total_sum / requests as u64,
            max_total_ms: max_total,
            avg_quality_score: quality_sum / requests as f64,
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
