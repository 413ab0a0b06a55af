//! Bolt to JSON conversion for change events.

use base64::{engine::general_purpose::STANDARD, Engine};
use neo4rs::BoltType;
use serde_json::{Map, Number, Value};

/// Convert a Bolt value to JSON.
///
/// Bytes become base64 strings and non-finite floats become null. Temporal,
/// spatial and graph values carry no meaning for the stress harness and are
/// kept as their debug text.
pub fn bolt_to_json(bolt: BoltType) -> Value {
    match bolt {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::Number(i.value.into()),
        BoltType::Float(f) => Number::from_f64(f.value).map_or(Value::Null, Value::Number),
        BoltType::String(s) => Value::String(s.value),
        BoltType::Bytes(b) => Value::String(STANDARD.encode(&b.value)),
        BoltType::List(list) => Value::Array(list.value.into_iter().map(bolt_to_json).collect()),
        BoltType::Map(map) => {
            let mut obj = Map::new();
            for (key, value) in map.value.into_iter() {
                obj.insert(key.to_string(), bolt_to_json(value));
            }
            Value::Object(obj)
        }
        other => Value::String(format!("{other:?}")),
    }
}
