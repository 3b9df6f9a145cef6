//! Body assembly for non-GET tools.

use serde_json::{Map, Value};

use super::CompileError;

/// Decode one level of string-encoded JSON. Only strings that hold a JSON
/// object or array are decoded; every other value passes through unchanged,
/// so a scalar such as `"42"` stays a string.
pub fn decode_nested(value: &Value) -> Value {
    if let Value::String(s) = value {
        let trimmed = s.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(parsed) = serde_json::from_str::<Value>(s) {
                return parsed;
            }
        }
    }
    value.clone()
}

/// Merge the declared body fields into one JSON object.
///
/// A field whose decoded value is an object is unwrapped into the body root;
/// anything else is set under its own name. Fields are merged in declaration
/// order, absent fields are skipped, and a key produced twice is an error.
pub fn assemble(
    tool: &str,
    body_fields: &[String],
    input: &Map<String, Value>,
) -> Result<Map<String, Value>, CompileError> {
    let mut body = Map::new();
    for name in body_fields {
        let Some(raw) = input.get(name) else {
            continue;
        };
        match decode_nested(raw) {
            Value::Object(inner) => {
                for (k, v) in inner {
                    insert_unique(tool, &mut body, k, v)?;
                }
            }
            other => insert_unique(tool, &mut body, name.clone(), other)?,
        }
    }
    Ok(body)
}

fn insert_unique(
    tool: &str,
    body: &mut Map<String, Value>,
    key: String,
    value: Value,
) -> Result<(), CompileError> {
    if body.contains_key(&key) {
        return Err(CompileError::BodyFieldCollision {
            tool: tool.to_string(),
            key,
        });
    }
    body.insert(key, value);
    Ok(())
}
