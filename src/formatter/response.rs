// src/formatter/response.rs
// Output record of the formatting pipeline: the unit that is cached and
// returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ResponseStyle;

/// Generation accounting attached to every formatted response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub generation_time_ms: u64,
    /// Estimated from character counts (~4 chars/token), not provider-billed.
    pub estimated_prompt_tokens: usize,
    pub estimated_response_tokens: usize,
    pub cache_hit: bool,
}

/// A persona-consistent natural-language reply produced from a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub id: String,
    pub content: String,
    pub style: ResponseStyle,
    pub metrics: GenerationMetrics,
    /// Heuristic quality score in [0, 1].
    pub quality_score: f64,
    /// Reserved for caller-level degradation; this pipeline never sets it.
    pub fallback_used: bool,
    pub created_at: DateTime<Utc>,
}

impl FormattedResponse {
    /// Fresh copy of a cached response: new identity, zero generation time,
    /// cache-hit flag set. The stored value is never mutated.
    pub fn from_cached(cached: &FormattedResponse) -> Self {
        FormattedResponse {
            id: uuid::Uuid::new_v4().to_string(),
            content: cached.content.clone(),
            style: cached.style,
            metrics: GenerationMetrics {
                generation_time_ms: 0,
                estimated_prompt_tokens: cached.metrics.estimated_prompt_tokens,
                estimated_response_tokens: cached.metrics.estimated_response_tokens,
                cache_hit: true,
            },
            quality_score: cached.quality_score,
            fallback_used: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cached_is_a_fresh_copy() {
        let original = FormattedResponse {
            id: "original".to_string(),
            content: "Email sent.".to_string(),
            style: ResponseStyle::Business,
            metrics: GenerationMetrics {
                generation_time_ms: 420,
                estimated_prompt_tokens: 100,
                estimated_response_tokens: 3,
                cache_hit: false,
            },
            quality_score: 0.7,
            fallback_used: false,
            created_at: Utc::now(),
        };

        let copy = FormattedResponse::from_cached(&original);
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.content, original.content);
        assert!(copy.metrics.cache_hit);
        assert_eq!(copy.metrics.generation_time_ms, 0);
        // The original is untouched
        assert!(!original.metrics.cache_hit);
        assert_eq!(original.metrics.generation_time_ms, 420);
    }
}
