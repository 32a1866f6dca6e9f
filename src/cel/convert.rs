//! Value conversion between `serde_json::Value` and `cel_interpreter` values

use base64::Engine as _;
use cel_interpreter::objects::Value as CelValue;
use serde_json::Value as JsonValue;

/// Converts a JSON value into a CEL value.
pub fn json_to_cel(value: &JsonValue) -> CelValue {
    match value {
        JsonValue::Null => CelValue::Null,
        JsonValue::Bool(b) => CelValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                CelValue::Float(f)
            } else {
                CelValue::Null
            }
        }
        JsonValue::String(s) => CelValue::String(s.clone().into()),
        JsonValue::Array(items) => {
            let converted: Vec<CelValue> = items.iter().map(json_to_cel).collect();
            CelValue::List(converted.into())
        }
        JsonValue::Object(fields) => {
            use cel_interpreter::objects::{Key, Map};
            use std::collections::HashMap;
            use std::sync::Arc;

            let mut entries: HashMap<Key, CelValue> = HashMap::with_capacity(fields.len());
            for (key, field) in fields {
                entries.insert(Key::from(key.clone()), json_to_cel(field));
            }
            CelValue::Map(Map {
                map: Arc::new(entries),
            })
        }
    }
}

/// Converts a CEL value back into a JSON value.
///
/// Durations, timestamps and functions have no JSON counterpart and degrade
/// to their debug representation; bytes become base64 strings.
pub fn cel_to_json(value: &CelValue) -> JsonValue {
    match value {
        CelValue::Null => JsonValue::Null,
        CelValue::Bool(b) => JsonValue::Bool(*b),
        CelValue::Int(i) => JsonValue::Number((*i).into()),
        CelValue::UInt(u) => JsonValue::Number((*u).into()),
        CelValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CelValue::String(s) => JsonValue::String(s.to_string()),
        CelValue::Bytes(b) => JsonValue::String(
            base64::engine::general_purpose::STANDARD.encode(b.as_ref()),
        ),
        CelValue::List(items) => JsonValue::Array(items.iter().map(cel_to_json).collect()),
        CelValue::Map(map) => {
            use cel_interpreter::objects::Key;

            let mut fields = serde_json::Map::new();
            for (key, entry) in map.map.as_ref().iter() {
                let key = match key {
                    Key::String(s) => s.to_string(),
                    Key::Int(i) => i.to_string(),
                    Key::Uint(u) => u.to_string(),
                    Key::Bool(b) => b.to_string(),
                };
                fields.insert(key, cel_to_json(entry));
            }
            JsonValue::Object(fields)
        }
        CelValue::Duration(_) | CelValue::Timestamp(_) | CelValue::Function(_, _) => {
            JsonValue::String(format!("{:?}", value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_convert() {
        assert!(matches!(json_to_cel(&json!(true)), CelValue::Bool(true)));
        assert!(matches!(json_to_cel(&json!(42)), CelValue::Int(42)));
        assert!(matches!(json_to_cel(&json!(null)), CelValue::Null));

        if let CelValue::String(s) = json_to_cel(&json!("hello")) {
            assert_eq!(s.as_ref(), "hello");
        } else {
            panic!("expected string");
        }
    }

    #[test]
    fn arrays_convert() {
        if let CelValue::List(items) = json_to_cel(&json!([1, 2, 3])) {
            assert_eq!(items.len(), 3);
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn objects_round_trip() {
        let original = json!({"id": "u1", "level": 3, "tags": ["a", "b"]});
        let round_tripped = cel_to_json(&json_to_cel(&original));
        assert_eq!(round_tripped, original);
    }

    #[test]
    fn float_converts_back() {
        let value = json!(2.5);
        assert_eq!(cel_to_json(&json_to_cel(&value)), value);
    }
}
