//! Raw body shapes returned by the remote service.

use serde_json::{Map, Value};

use super::ResponseEnvelope;

/// Keys whose presence marks a body as pre-wrapped.
const ENVELOPE_MARKERS: [&str; 2] = ["success", "data"];

/// A parsed response body: either already envelope-shaped or a bare payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Envelope(WireEnvelope),
    Bare(Value),
}

/// Envelope-shaped body as sent by the service. Fields with an unexpected
/// JSON type stay in `extra` rather than being dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireEnvelope {
    pub success: Option<bool>,
    pub data: Option<Value>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub code: Option<i64>,
    pub extra: Map<String, Value>,
}

impl ResponseBody {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if ENVELOPE_MARKERS.iter().any(|k| map.contains_key(*k)) => {
                ResponseBody::Envelope(WireEnvelope::from_map(map))
            }
            other => ResponseBody::Bare(other),
        }
    }

    /// Message the body carries for the caller, if any (`message`, then `error`).
    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseBody::Envelope(wire) => wire.message.as_deref().or(wire.error.as_deref()),
            ResponseBody::Bare(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| map.get("error").and_then(Value::as_str)),
            ResponseBody::Bare(_) => None,
        }
    }

    /// Whether the body itself declares failure (`"success": false`).
    pub fn declares_failure(&self) -> bool {
        matches!(
            self,
            ResponseBody::Envelope(WireEnvelope {
                success: Some(false),
                ..
            })
        )
    }

    /// Normalize into a successful envelope.
    pub fn into_envelope(self) -> ResponseEnvelope<Value> {
        match self {
            ResponseBody::Envelope(wire) => {
                let mut envelope = ResponseEnvelope::success_with(wire.data);
                envelope.message = wire.message;
                envelope.error = wire.error;
                envelope.code = wire.code;
                envelope.extra = wire.extra;
                envelope
            }
            ResponseBody::Bare(Value::Null) => ResponseEnvelope::success_with(None),
            ResponseBody::Bare(value) => ResponseEnvelope::success(value),
        }
    }
}

impl WireEnvelope {
    fn from_map(mut map: Map<String, Value>) -> Self {
        let success = take_if(&mut map, "success", |v| v.as_bool());
        let message = take_if(&mut map, "message", |v| v.as_str().map(str::to_string));
        let error = take_if(&mut map, "error", |v| v.as_str().map(str::to_string));
        let code = take_if(&mut map, "code", |v| v.as_i64());
        let data = map.remove("data").filter(|v| !v.is_null());
        Self {
            success,
            data,
            message,
            error,
            code,
            extra: map,
        }
    }
}

/// Remove `key` if `convert` accepts its value; otherwise leave it in place.
fn take_if<T>(
    map: &mut Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let converted = map.get(key).and_then(&convert)?;
    map.remove(key);
    Some(converted)
}
