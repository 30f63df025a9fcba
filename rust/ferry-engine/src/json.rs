//! JSON conversion for values crossing the command line.

use crate::value::{PromiseState, Value};
use serde_json::{json, Map, Number};

/// Render a value as JSON. Buffers become arrays of byte values; functions,
/// host objects and promises become descriptive strings or tagged objects.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Number(n) => number(*n),
        Value::String(s) => json!(s.as_ref()),
        Value::ArrayBuffer(b) => json!(b.borrow().as_slice()),
        Value::Array(items) => serde_json::Value::Array(items.borrow().iter().map(to_json).collect()),
        Value::Object(map) => {
            let out: Map<String, serde_json::Value> = map
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect();
            serde_json::Value::Object(out)
        }
        Value::Function(f) => json!(format!("[function {}]", f.name)),
        Value::Promise(state) => match &*state.borrow() {
            PromiseState::Pending => json!({ "promise": "pending" }),
            PromiseState::Fulfilled(v) => json!({ "promise": "fulfilled", "value": to_json(v) }),
            PromiseState::Rejected(v) => json!({ "promise": "rejected", "reason": to_json(v) }),
        },
        Value::Error(msg) => json!({ "error": msg.as_ref() }),
        Value::Host(host) => json!(format!("[host {}]", host.name())),
    }
}

/// Integral numbers print without a fractional part.
fn number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        json!(n as i64)
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Build a value from JSON. There is no JSON form for buffers: byte arrays
/// arrive as plain arrays of numbers.
pub fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::object(map.iter().map(|(k, v)| (k.clone(), from_json(v))))
        }
    }
}
