use serde::Serialize;
use serde_json::{Map, Value};

/// Rebuilds `value` with object keys in lexicographic order at every depth.
pub fn sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted_keys(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted_keys).collect()),
        other => other,
    }
}

/// Compact JSON with sorted keys; the byte form record digests are taken over.
pub fn canonical_string<T: Serialize>(value: &T) -> Result<String, String> {
    let raw = serde_json::to_value(value).map_err(|e| format!("canonical encode failed: {e}"))?;
    serde_json::to_string(&sorted_keys(raw))
        .map_err(|e| format!("canonical serialization failed: {e}"))
}
