//! Failure taxonomy and application error types.
//!
//! `FailureKind` is the closed set of outcomes a call can fail with; it is the
//! single source of truth for retry eligibility. `Error` covers everything that
//! can go wrong before a call is ever submitted (configuration, client setup).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a received body cannot be parsed as JSON.
pub const MALFORMED_BODY_MESSAGE: &str = "Invalid response format";

/// Terminal failure of a call, as seen by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport-level failure, no response was received.
    #[error("network error: {message}")]
    Network { message: String },

    /// The per-attempt deadline elapsed before the transport settled.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A response was received but was unsuccessful or unparsable.
    ///
    /// `malformed` is set when the body could not be parsed; such failures
    /// indicate a protocol mismatch and are never retried.
    ///
    /// `code` is the received HTTP status and may be 2xx: a successful status
    /// whose body declares `"success": false` is reported here too, and
    /// [`FailureKind::category`] then reports it as `CheckInput`.
    #[error("api error {code}: {message}")]
    Api {
        code: u16,
        message: String,
        #[serde(default)]
        malformed: bool,
    },
}

/// Coarse user-facing guidance derived from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    RetryLater,
    CheckInput,
    CheckConnectivity,
}

impl FailureKind {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn api(code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
            malformed: false,
        }
    }

    /// A received body that failed to parse as structured data.
    pub fn malformed(code: u16) -> Self {
        Self::Api {
            code,
            message: MALFORMED_BODY_MESSAGE.to_string(),
            malformed: true,
        }
    }

    /// Whether the execution pipeline may try the call again.
    ///
    /// `Network`, `Timeout` and server-side `Api` failures (code >= 500) are
    /// transient. Client errors and malformed bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::Network { .. } | FailureKind::Timeout { .. } => true,
            FailureKind::Api {
                code, malformed, ..
            } => *code >= 500 && !*malformed,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FailureKind::Network { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureKind::Timeout { .. })
    }

    /// Status code of an `Api` failure.
    pub fn api_code(&self) -> Option<u16> {
        match self {
            FailureKind::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            FailureKind::Network { .. } => FailureCategory::CheckConnectivity,
            FailureKind::Timeout { .. } => FailureCategory::RetryLater,
            FailureKind::Api { code, malformed, .. } => {
                if *code >= 500 || *malformed {
                    FailureCategory::RetryLater
                } else {
                    FailureCategory::CheckInput
                }
            }
        }
    }
}

/// Classify a received status code.
///
/// Returns `None` for 2xx. Anything else is an `Api` failure whose message
/// prefers the one embedded in the body, falling back to `HTTP <status>`.
pub fn classify_status(status: u16, body_message: Option<&str>) -> Option<FailureKind> {
    if (200..300).contains(&status) {
        return None;
    }
    let message = match body_message {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => format!("HTTP {}", status),
    };
    Some(FailureKind::api(status, message))
}

/// Errors raised while configuring or constructing a client.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Base address or endpoint could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction errors.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_transient_kinds_are_retryable() {
        assert!(FailureKind::network("connection refused").is_retryable());
        assert!(FailureKind::timeout(10).is_retryable());
        assert!(FailureKind::api(503, "unavailable").is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!FailureKind::api(404, "not found").is_retryable());
        assert!(!FailureKind::api(422, "bad symbol").is_retryable());
    }

    #[test]
    fn test_malformed_body_is_never_retried() {
        let failure = FailureKind::malformed(502);
        assert!(!failure.is_retryable());
        assert_eq!(failure.api_code(), Some(502));
        assert_eq!(failure.to_string(), "api error 502: Invalid response format");
    }

    #[test]
    fn test_classify_prefers_body_message() {
        assert_eq!(
            classify_status(404, Some("not found")),
            Some(FailureKind::api(404, "not found"))
        );
        assert_eq!(
            classify_status(500, None),
            Some(FailureKind::api(500, "HTTP 500"))
        );
        assert_eq!(
            classify_status(400, Some("")),
            Some(FailureKind::api(400, "HTTP 400"))
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            FailureKind::network("dns").category(),
            FailureCategory::CheckConnectivity
        );
        assert_eq!(FailureKind::timeout(5).category(), FailureCategory::RetryLater);
        assert_eq!(
            FailureKind::api(400, "bad").category(),
            FailureCategory::CheckInput
        );
        assert_eq!(
            FailureKind::api(500, "boom").category(),
            FailureCategory::RetryLater
        );
    }

    #[test]
    fn test_declared_failure_on_success_status() {
        let failure = FailureKind::api(200, "strategy not found");
        assert_eq!(failure.api_code(), Some(200));
        assert!(!failure.is_retryable());
        assert_eq!(failure.category(), FailureCategory::CheckInput);
    }

    #[test]
    fn test_failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(FailureKind::api(404, "not found")).unwrap();
        assert_eq!(json["kind"], "api");
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "not found");
    }

    proptest! {
        #[test]
        fn prop_success_range_never_fails(status in 200u16..300) {
            prop_assert!(classify_status(status, Some("ignored")).is_none());
        }

        #[test]
        fn prop_non_success_is_api_with_same_code(status in prop_oneof![100u16..200, 300u16..600]) {
            let failure = classify_status(status, None).unwrap();
            prop_assert_eq!(failure.api_code(), Some(status));
            prop_assert_eq!(failure.is_retryable(), status >= 500);
        }
    }
}
