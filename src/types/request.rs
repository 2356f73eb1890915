//! Call requests as submitted by callers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;

use super::config::CallOverrides;
use super::errors::{Error, Result};
use super::ids::CallId;

/// One logical call to the remote service.
///
/// Owned by the client once submitted; interceptors work on a derived
/// outbound copy and never touch this value.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub id: CallId,
    pub method: Method,
    /// Path relative to the client's base address, or an absolute URL.
    pub endpoint: String,
    /// Caller-supplied headers; these win over the default headers.
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub overrides: CallOverrides,
}

impl CallRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            id: CallId::new(),
            method,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            body: None,
            overrides: CallOverrides::default(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn with_id(mut self, id: CallId) -> Self {
        self.id = id;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings, rejecting invalid names or values.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config(format!("invalid value for header {}: {}", name, e)))?;
        Ok(self.with_header(name, value))
    }

    pub fn with_overrides(mut self, overrides: CallOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
