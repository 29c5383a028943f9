// src/cache/fingerprint.rs
// Deterministic cache key derivation for formatting requests.

use sha2::{Digest, Sha256};
use serde_json::Value;

use crate::context::FormattingContext;

/// Derive the cache fingerprint for a formatting request.
///
/// Covers tool id, category, style, agent id, success flag, and a canonical
/// serialization of the result payload. Timestamps, context ids, persona
/// text, and conversation history are deliberately excluded: two requests
/// that ran the same tool the same way share a fingerprint, so a persona
/// change can surface a cached reply in the old voice until the entry's TTL
/// expires.
pub fn fingerprint(ctx: &FormattingContext) -> String {
    let config = ctx.effective_config();

    let mut hasher = Sha256::new();
    hasher.update(ctx.result.tool_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(ctx.category.to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(config.response_style.to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(ctx.agent_id.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(if ctx.result.success { b"1" } else { b"0" });
    hasher.update(b"\x1f");
    if let Some(data) = &ctx.result.data {
        hasher.update(canonical_json(data).as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// Serialize a JSON value with object keys emitted in sorted order at every
/// level, so key ordering differences never split the cache.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}
