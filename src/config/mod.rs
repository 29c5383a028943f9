// src/config/mod.rs
// Process-wide formatting defaults. Every value can be overridden from the
// environment (or a .env file); per-request ResponseConfig overrides win
// over these at call time.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct QuillConfig {
    // ── Response shaping
    pub max_response_length: usize,
    pub min_response_length: usize,
    pub include_emojis: bool,
    pub include_next_steps: bool,
    pub include_metrics: bool,
    pub default_style: String,

    // ── Prompt assembly
    pub recent_turns_in_prompt: usize,

    // ── Response cache
    pub enable_caching: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,

    // ── Performance monitoring
    pub monitoring_enabled: bool,
    pub alert_ttl_seconds: i64,
    pub alert_history_cap: usize,
    pub report_history_cap: usize,

    // ── Stage thresholds (ms)
    pub threshold_template_retrieval_ms: u64,
    pub threshold_system_prompt_ms: u64,
    pub threshold_llm_generation_ms: u64,
    pub threshold_post_processing_ms: u64,
    pub threshold_quality_scoring_ms: u64,
    pub threshold_cache_operations_ms: u64,
    pub threshold_total_processing_ms: u64,

    // ── Alert cutoffs (ms)
    pub alert_total_processing_ms: u64,
    pub alert_llm_generation_ms: u64,
}

/// Parse an environment variable, tolerating trailing comments and
/// whitespace. Missing or unparseable values fall back to the default.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl QuillConfig {
    pub fn from_env() -> Self {
        // Load a .env file first if one exists; plain env vars still apply.
        let _ = dotenvy::dotenv();

        Self {
            max_response_length: env_var_or("QUILL_MAX_RESPONSE_LENGTH", 500),
            min_response_length: env_var_or("QUILL_MIN_RESPONSE_LENGTH", 10),
            include_emojis: env_var_or("QUILL_INCLUDE_EMOJIS", true),
            include_next_steps: env_var_or("QUILL_INCLUDE_NEXT_STEPS", true),
            include_metrics: env_var_or("QUILL_INCLUDE_METRICS", false),
            default_style: env_var_or("QUILL_DEFAULT_STYLE", "conversational".to_string()),
            recent_turns_in_prompt: env_var_or("QUILL_RECENT_TURNS", 3),
            enable_caching: env_var_or("QUILL_ENABLE_CACHING", true),
            cache_ttl_seconds: env_var_or("QUILL_CACHE_TTL_SECONDS", 300),
            cache_max_entries: env_var_or("QUILL_CACHE_MAX_ENTRIES", 500),
            monitoring_enabled: env_var_or("QUILL_MONITORING_ENABLED", true),
            alert_ttl_seconds: env_var_or("QUILL_ALERT_TTL_SECONDS", 300),
            alert_history_cap: env_var_or("QUILL_ALERT_HISTORY_CAP", 100),
            report_history_cap: env_var_or("QUILL_REPORT_HISTORY_CAP", 100),
            threshold_template_retrieval_ms: env_var_or("QUILL_THRESHOLD_TEMPLATE_MS", 50),
            threshold_system_prompt_ms: env_var_or("QUILL_THRESHOLD_SYSTEM_PROMPT_MS", 100),
            threshold_llm_generation_ms: env_var_or("QUILL_THRESHOLD_LLM_MS", 2000),
            threshold_post_processing_ms: env_var_or("QUILL_THRESHOLD_POST_PROCESSING_MS", 50),
            threshold_quality_scoring_ms: env_var_or("QUILL_THRESHOLD_QUALITY_MS", 100),
            threshold_cache_operations_ms: env_var_or("QUILL_THRESHOLD_CACHE_MS", 25),
            threshold_total_processing_ms: env_var_or("QUILL_THRESHOLD_TOTAL_MS", 3000),
            alert_total_processing_ms: env_var_or("QUILL_ALERT_TOTAL_MS", 5000),
            alert_llm_generation_ms: env_var_or("QUILL_ALERT_LLM_MS", 3000),
        }
    }
}

/// Global configuration, loaded once on first access.
pub static CONFIG: Lazy<QuillConfig> = Lazy::new(QuillConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = QuillConfig::from_env();
        assert!(config.max_response_length >= config.min_response_length);
        assert!(config.cache_max_entries > 0);
        assert!(config.alert_history_cap > 0);
        assert!(config.threshold_llm_generation_ms < config.alert_llm_generation_ms);
    }

    #[test]
    fn test_env_var_or_strips_comments() {
        unsafe { std::env::set_var("QUILL_TEST_COMMENTED", "42 # inline comment") };
        let parsed: u64 = env_var_or("QUILL_TEST_COMMENTED", 0);
        assert_eq!(parsed, 42);
    }

    #[test]
    fn test_env_var_or_falls_back_on_garbage() {
        unsafe { std::env::set_var("QUILL_TEST_GARBAGE", "not-a-number") };
        let parsed: usize = env_var_or("QUILL_TEST_GARBAGE", 7);
        assert_eq!(parsed, 7);
    }
}
