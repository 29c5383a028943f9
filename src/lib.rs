// src/lib.rs

pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod formatter;
pub mod monitor;
pub mod prompt;
pub mod quality;
pub mod templates;
pub mod utils;

// Export the main pipeline surface
pub use backend::{GenerationBackend, GenerationMeta};
pub use cache::{fingerprint, InMemoryResponseCache, ResponseCache};
pub use context::{
    AgentPersona, ConversationTurn, FormattingContext, ResponseConfig, ResponseStyle,
    ToolCategory, ToolExecutionResult, UserPreferences,
};
pub use error::FormatError;
pub use formatter::{FormattedResponse, GenerationMetrics, ResponseFormatter};
pub use monitor::{
    BottleneckSeverity, PerformanceAlert, PerformanceBottleneck, PerformanceMonitor,
    PerformanceReport, PerformanceTracker, PipelineStage, ProcessingStageMetrics,
    StageThresholds,
};
pub use templates::{InMemoryTemplateStore, PromptTemplate, StyleDescriptor, TemplateStore};
