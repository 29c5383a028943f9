// src/context/mod.rs
// Data model for a formatting request: the tool execution result being
// described, who is speaking (agent persona), who is listening (user
// preferences), and the per-request response configuration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CONFIG;

// ============================================================================
// Category and style enums
// ============================================================================

/// Functional category of the tool whose result is being formatted.
/// Drives template selection and per-category configuration overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    Workspace,
    SocialMedia,
    ExternalApi,
    Workflow,
    Research,
    Custom,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ToolCategory::Workspace => "workspace",
            ToolCategory::SocialMedia => "social-media",
            ToolCategory::ExternalApi => "external-api",
            ToolCategory::Workflow => "workflow",
            ToolCategory::Research => "research",
            ToolCategory::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workspace" => Ok(ToolCategory::Workspace),
            "social-media" | "social_media" => Ok(ToolCategory::SocialMedia),
            "external-api" | "external_api" => Ok(ToolCategory::ExternalApi),
            "workflow" => Ok(ToolCategory::Workflow),
            "research" => Ok(ToolCategory::Research),
            "custom" => Ok(ToolCategory::Custom),
            _ => Err(()),
        }
    }
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 6] = [
        ToolCategory::Workspace,
        ToolCategory::SocialMedia,
        ToolCategory::ExternalApi,
        ToolCategory::Workflow,
        ToolCategory::Research,
        ToolCategory::Custom,
    ];
}

/// Voice the formatted response should be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    Conversational,
    Business,
    Technical,
    Casual,
}

impl std::fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseStyle::Conversational => "conversational",
            ResponseStyle::Business => "business",
            ResponseStyle::Technical => "technical",
            ResponseStyle::Casual => "casual",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ResponseStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conversational" => Ok(ResponseStyle::Conversational),
            "business" => Ok(ResponseStyle::Business),
            "technical" => Ok(ResponseStyle::Technical),
            "casual" => Ok(ResponseStyle::Casual),
            _ => Err(()),
        }
    }
}

impl ResponseStyle {
    pub const ALL: [ResponseStyle; 4] = [
        ResponseStyle::Conversational,
        ResponseStyle::Business,
        ResponseStyle::Technical,
        ResponseStyle::Casual,
    ];
}

// ============================================================================
// Tool execution result
// ============================================================================

/// Error carried by a failed tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub message: String,
    pub code: Option<String>,
}

/// Immutable record of a completed tool invocation, produced by the
/// surrounding execution subsystem and consumed read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub tool_id: String,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<ToolError>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ToolExecutionResult {
    pub fn succeeded(tool_id: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            tool_id: tool_id.into(),
            success: true,
            data: Some(data),
            error: None,
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    pub fn failed(tool_id: impl Into<String>, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tool_id: tool_id.into(),
            success: false,
            data: None,
            error: Some(ToolError {
                message: message.into(),
                code: None,
            }),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    /// True when the payload carries something worth describing: a failed
    /// run with usable data is a partial success, not a dead end.
    pub fn has_usable_data(&self) -> bool {
        match &self.data {
            None => false,
            Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }
}

// ============================================================================
// Agent persona and user preferences
// ============================================================================

/// Persona of the agent the response should sound like.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPersona {
    pub background: String,
    pub personality: String,
    pub communication_style: String,
    pub expertise: Vec<String>,
    /// Free-form persona knobs (e.g. "sign_off" -> "Cheers").
    #[serde(default)]
    pub preferences: HashMap<String, String>,
}

/// Per-user formatting preferences, applied on top of the response config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub tone: Option<String>,
    pub max_length: Option<usize>,
    pub include_emojis: Option<bool>,
    pub include_metrics: Option<bool>,
    pub preferred_style: Option<ResponseStyle>,
}

/// One turn of recent conversation included for continuity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Response configuration
// ============================================================================

/// Partial override applied to the response config for one tool category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryOverride {
    pub max_response_length: Option<usize>,
    pub include_emojis: Option<bool>,
    pub include_next_steps: Option<bool>,
    pub include_metrics: Option<bool>,
    pub response_style: Option<ResponseStyle>,
    pub enable_caching: Option<bool>,
    pub cache_ttl_seconds: Option<u64>,
}

/// Per-request response configuration. `Default` pulls the process-wide
/// values from `CONFIG`; callers override per call with the builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub enable_llm_formatting: bool,
    pub max_response_length: usize,
    pub include_emojis: bool,
    pub include_next_steps: bool,
    pub include_metrics: bool,
    pub response_style: ResponseStyle,
    pub enable_caching: bool,
    pub cache_ttl_seconds: u64,
    #[serde(default)]
    pub tool_category_overrides: HashMap<ToolCategory, CategoryOverride>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            enable_llm_formatting: true,
            max_response_length: CONFIG.max_response_length,
            include_emojis: CONFIG.include_emojis,
            include_next_steps: CONFIG.include_next_steps,
            include_metrics: CONFIG.include_metrics,
            response_style: CONFIG
                .default_style
                .parse()
                .unwrap_or(ResponseStyle::Conversational),
            enable_caching: CONFIG.enable_caching,
            cache_ttl_seconds: CONFIG.cache_ttl_seconds,
            tool_category_overrides: HashMap::new(),
        }
    }
}

impl ResponseConfig {
    pub fn with_style(mut self, style: ResponseStyle) -> Self {
        self.response_style = style;
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_response_length = max;
        self
    }

    pub fn with_emojis(mut self, enabled: bool) -> Self {
        self.include_emojis = enabled;
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    pub fn with_llm_formatting(mut self, enabled: bool) -> Self {
        self.enable_llm_formatting = enabled;
        self
    }

    pub fn with_category_override(
        mut self,
        category: ToolCategory,
        overrides: CategoryOverride,
    ) -> Self {
        self.tool_category_overrides.insert(category, overrides);
        self
    }

    /// Resolve the configuration for one category, applying its partial
    /// override on top of the base values.
    pub fn effective_for(&self, category: ToolCategory) -> ResponseConfig {
        let mut effective = self.clone();
        if let Some(ov) = self.tool_category_overrides.get(&category) {
            if let Some(max) = ov.max_response_length {
                effective.max_response_length = max;
            }
            if let Some(emojis) = ov.include_emojis {
                effective.include_emojis = emojis;
            }
            if let Some(next_steps) = ov.include_next_steps {
                effective.include_next_steps = next_steps;
            }
            if let Some(metrics) = ov.include_metrics {
                effective.include_metrics = metrics;
            }
            if let Some(style) = ov.response_style {
                effective.response_style = style;
            }
            if let Some(caching) = ov.enable_caching {
                effective.enable_caching = caching;
            }
            if let Some(ttl) = ov.cache_ttl_seconds {
                effective.cache_ttl_seconds = ttl;
            }
        }
        effective
    }
}

// ============================================================================
// Formatting context
// ============================================================================

/// Immutable per-request input to the formatting pipeline. Created once per
/// request and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattingContext {
    pub context_id: String,
    pub created_at: DateTime<Utc>,
    pub result: ToolExecutionResult,
    pub category: ToolCategory,
    /// Inferred user intent behind the tool invocation.
    pub intent: String,
    /// Original user message that triggered the tool.
    pub user_message: String,
    pub agent_id: String,
    pub persona: AgentPersona,
    pub capabilities: Vec<String>,
    pub user_id: String,
    pub preferences: UserPreferences,
    pub recent_turns: Vec<ConversationTurn>,
    pub config: ResponseConfig,
    pub fallback_enabled: bool,
}

impl FormattingContext {
    pub fn new(
        result: ToolExecutionResult,
        category: ToolCategory,
        agent_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            context_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            result,
            category,
            intent: String::new(),
            user_message: String::new(),
            agent_id: agent_id.into(),
            persona: AgentPersona::default(),
            capabilities: Vec::new(),
            user_id: user_id.into(),
            preferences: UserPreferences::default(),
            recent_turns: Vec::new(),
            config: ResponseConfig::default(),
            fallback_enabled: true,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    pub fn with_persona(mut self, persona: AgentPersona) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_preferences(mut self, preferences: UserPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_recent_turns(mut self, turns: Vec<ConversationTurn>) -> Self {
        self.recent_turns = turns;
        self
    }

    pub fn with_config(mut self, config: ResponseConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration with this context's category override applied.
    pub fn effective_config(&self) -> ResponseConfig {
        self.config.effective_for(self.category)
    }
}
