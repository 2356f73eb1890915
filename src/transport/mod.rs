//! Transport abstraction over the remote market service.
//!
//! The orchestrator only ever talks to a [`Transport`]; production code uses
//! the reqwest-backed [`HttpTransport`], tests substitute scripted fakes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::types::FailureKind;

mod http;

pub use http::HttpTransport;

/// Final request handed to the transport, after outbound interceptors ran.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Response exactly as received, before parsing.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// Failure before any response was obtained (connection refused, DNS, reset).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<TransportError> for FailureKind {
    fn from(err: TransportError) -> Self {
        FailureKind::network(err.message)
    }
}

/// Sends one outbound request and returns whatever the remote answered.
///
/// Implementations must not interpret the status code; classification
/// belongs to the inbound interceptor.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}
