//! Recover a JSON object from a raw model response
//!
//! Models asked for "only JSON" still wrap answers in code fences or add
//! commentary around them. Recovery is an ordered list of strategies; the
//! first one that yields a JSON object wins. Parsing never fails: if nothing
//! works the result is an empty map and the caller substitutes fallbacks.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Fence delimiter models use for code blocks
const FENCE: &str = "```";

/// A way of turning response text into a JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The whole (unfenced) text is the object
    Direct,
    /// The object spans from the first `{` to the last `}`
    OutermostBraces,
}

/// Strategies in the order they are tried
pub const RECOVERY_ORDER: [Recovery; 2] = [Recovery::Direct, Recovery::OutermostBraces];

impl Recovery {
    /// Try this strategy on unfenced text
    pub fn attempt(self, text: &str) -> Option<Map<String, Value>> {
        let candidate = match self {
            Recovery::Direct => text,
            Recovery::OutermostBraces => outermost_braces(text)?,
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            Ok(other) => {
                debug!(strategy = ?self, kind = json_kind(&other), "Parsed JSON is not an object");
                None
            }
            Err(e) => {
                debug!(strategy = ?self, error = %e, "Parse attempt failed");
                None
            }
        }
    }
}

/// Result of parsing a model response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Recovered key/value pairs; empty when nothing could be recovered
    pub fields: Map<String, Value>,
    /// Strategy that produced `fields`
    pub recovered_by: Option<Recovery>,
}

/// Parse a raw model response into a JSON object
pub fn parse_response(raw: &str) -> ParsedResponse {
    let text = strip_fences(raw);

    for strategy in RECOVERY_ORDER {
        if let Some(fields) = strategy.attempt(&text) {
            debug!(strategy = ?strategy, keys = fields.len(), "Recovered model response");
            return ParsedResponse {
                fields,
                recovered_by: Some(strategy),
            };
        }
    }

    warn!(response = %raw, "Could not recover a JSON object from model response");
    ParsedResponse {
        fields: Map::new(),
        recovered_by: None,
    }
}

/// Remove a surrounding code fence and its language tag, if present
fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_string();
    }

    let parts: Vec<&str> = trimmed.split(FENCE).collect();
    if parts.len() < 3 {
        return trimmed.to_string();
    }

    let inner = parts[1..parts.len() - 1].join(FENCE);
    let inner = inner.trim();

    // ```json\n{...}
    match inner.split_once('\n') {
        Some((tag, rest)) if is_info_string(tag) => rest.trim().to_string(),
        _ => inner.to_string(),
    }
}

fn is_info_string(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'))
}

fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
