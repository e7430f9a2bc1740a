//! User-facing text.
//!
//! Strings live in an embedded JSON catalogue and are addressed with
//! dot-separated keys, e.g. `"coffee.disabled"`.

use std::sync::OnceLock;

use serde_json::Value;
use tracing::warn;

static CATALOGUE: OnceLock<Value> = OnceLock::new();

fn catalogue() -> &'static Value {
    CATALOGUE.get_or_init(|| {
        serde_json::from_str(include_str!("en.json")).unwrap_or_else(|e| {
            warn!("Failed to parse text catalogue: {}", e);
            Value::Null
        })
    })
}

/// Get the text for a key. Unknown keys come back unchanged.
pub fn get_text(key: &str) -> String {
    resolve_key(catalogue(), key).unwrap_or_else(|| key.to_string())
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}
