//! Response envelope - the uniform success contract.
//!
//! Every call that completes successfully yields a [`ResponseEnvelope`],
//! regardless of which remote route produced it. Callers depend only on this
//! shape, never on the raw body the service returned.
//!
//! Remote routes disagree on body shape: some return a bare payload, some a
//! pre-wrapped `{success, data, message}` object. [`ResponseBody`] makes that
//! distinction explicit before normalization.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{FailureKind, MALFORMED_BODY_MESSAGE};

mod body;

pub use body::{ResponseBody, WireEnvelope};

/// Current time in the envelope timestamp format (RFC 3339, millisecond precision, UTC).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalized result returned to every caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    /// Stamped at construction, never empty.
    pub timestamp: String,

    /// Top-level body fields this crate does not model, kept for forward compatibility.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,

    /// HTTP status the envelope was built from (0 when built locally).
    #[serde(skip)]
    status: u16,
}

impl<T> ResponseEnvelope<T> {
    /// Successful envelope carrying `data`.
    pub fn success(data: T) -> Self {
        Self::success_with(Some(data))
    }

    pub fn success_with(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            message: None,
            code: None,
            timestamp: now_timestamp(),
            extra: Map::new(),
            status: 0,
        }
    }

    /// Unsuccessful envelope, for callers that report failures through the
    /// same shape (e.g. the CLI printing a terminal `FailureKind`).
    pub fn failure(error: impl Into<String>, code: Option<i64>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            code,
            timestamp: now_timestamp(),
            extra: Map::new(),
            status: 0,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Transform the payload, keeping every other field.
    pub fn map<U, F>(self, f: F) -> ResponseEnvelope<U>
    where
        F: FnOnce(T) -> U,
    {
        ResponseEnvelope {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            message: self.message,
            code: self.code,
            timestamp: self.timestamp,
            extra: self.extra,
            status: self.status,
        }
    }
}

impl ResponseEnvelope<Value> {
    /// Decode the JSON payload into a caller type.
    ///
    /// A payload that does not fit `T` is reported as a malformed `Api`
    /// failure carrying the status the envelope was built from.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>, FailureKind> {
        let status = self.status;
        let data = match self.data {
            Some(value) => Some(serde_json::from_value::<T>(value).map_err(|e| {
                tracing::debug!("Payload decode failed (status={}): {}", status, e);
                FailureKind::Api {
                    code: status,
                    message: format!("{}: {}", MALFORMED_BODY_MESSAGE, e),
                    malformed: true,
                }
            })?),
            None => None,
        };
        Ok(ResponseEnvelope {
            success: self.success,
            data,
            error: self.error,
            message: self.message,
            code: self.code,
            timestamp: self.timestamp,
            extra: self.extra,
            status,
        })
    }
}
