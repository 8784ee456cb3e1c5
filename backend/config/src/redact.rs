//! Config redaction: produce safe-to-log config snapshots by masking secrets.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Keys whose values are always treated as secrets.
static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "GOOGLE_API_KEY",
    "key",
    "token",
    "secret",
    "password",
];

/// Google API keys look like `AIza` followed by 35 URL-safe characters.
static GOOGLE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{35}").unwrap());

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Redact a config JSON value, masking sensitive fields and embedded keys.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint = if s.len() > 4 && s.is_char_boundary(4) {
            format!("{}***", &s[..4])
        } else {
            "***".to_string()
        };
        return Value::String(hint);
    }
    Value::String(GOOGLE_KEY_PATTERN.replace_all(s, "AIza***").into_owned())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
