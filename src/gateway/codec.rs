//! Conversion between plain JSON and Firestore's typed value encoding.

use super::Fields;
use anyhow::{anyhow, Result};
use serde_json::{json, Map, Number, Value};

pub fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            // Firestore transports 64-bit integers as strings.
            (Some(i), _) => json!({ "integerValue": i.to_string() }),
            (None, Some(f)) => json!({ "doubleValue": f }),
            (None, None) => json!({ "integerValue": n.to_string() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields> {
    fields
        .iter()
        .map(|(name, value)| {
            decode_value(value)
                .map(|decoded| (name.clone(), decoded))
                .map_err(|e| anyhow!("field '{}': {}", name, e))
        })
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(anyhow!("expected a typed value, got {}", value));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>()?,
                Value::Number(n) => n.as_i64().ok_or_else(|| anyhow!("bad integer {}", n))?,
                other => return Err(anyhow!("bad integer {}", other)),
            };
            Ok(Value::Number(parsed.into()))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("bad double {}", inner))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Object(fields))
        }
        other => Err(anyhow!("unsupported value type '{}'", other)),
    }
}

/// Field path for an update mask; names outside `[A-Za-z_][A-Za-z0-9_]*` are
/// backquoted.
pub fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
