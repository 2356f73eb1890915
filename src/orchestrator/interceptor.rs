//! Interceptor chain.
//!
//! Outbound interceptors turn a [`CallRequest`] into the [`OutboundRequest`]
//! the transport sends; they run in registration order on a fresh copy for
//! every attempt. The inbound side parses and classifies what came back.

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::auth::CredentialProvider;
use crate::envelope::{ResponseBody, ResponseEnvelope};
use crate::transport::{OutboundRequest, RawResponse};
use crate::types::{classify_status, CallRequest, FailureKind};

/// A transformation applied to every outgoing request.
pub trait OutboundInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, call: &CallRequest, request: &mut OutboundRequest);
}

/// Sets `Content-Type` and `Accept` to JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHeaders;

impl OutboundInterceptor for DefaultHeaders {
    fn name(&self) -> &'static str {
        "default_headers"
    }

    fn apply(&self, _call: &CallRequest, request: &mut OutboundRequest) {
        let json = HeaderValue::from_static("application/json");
        request.headers.insert(CONTENT_TYPE, json.clone());
        request.headers.insert(ACCEPT, json);
    }
}

/// Merges the caller's headers; a caller header replaces any earlier value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerHeaders;

impl OutboundInterceptor for CallerHeaders {
    fn name(&self) -> &'static str {
        "caller_headers"
    }

    fn apply(&self, call: &CallRequest, request: &mut OutboundRequest) {
        for name in call.headers.keys() {
            request.headers.remove(name);
            for value in call.headers.get_all(name) {
                request.headers.append(name.clone(), value.clone());
            }
        }
    }
}

/// Injects `Authorization: Bearer <token>` when the provider has a token.
pub struct BearerAuth {
    provider: Arc<dyn CredentialProvider>,
}

impl BearerAuth {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl OutboundInterceptor for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    fn apply(&self, _call: &CallRequest, request: &mut OutboundRequest) {
        let Some(token) = self.provider.token() else {
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Credential provider returned a token that is not a valid header value"),
        }
    }
}

/// Ordered outbound interceptors plus inbound normalization.
#[derive(Clone)]
pub struct InterceptorChain {
    outbound: Vec<Arc<dyn OutboundInterceptor>>,
}

impl InterceptorChain {
    /// Built-in chain: default headers, caller headers, bearer credential.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            outbound: vec![
                Arc::new(DefaultHeaders),
                Arc::new(CallerHeaders),
                Arc::new(BearerAuth::new(credentials)),
            ],
        }
    }

    /// Append an interceptor; it runs after every built-in one.
    pub fn push(&mut self, interceptor: Arc<dyn OutboundInterceptor>) {
        self.outbound.push(interceptor);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.outbound.iter().map(|i| i.name()).collect()
    }

    /// Build the request for one attempt. `call` is only read.
    pub fn prepare(&self, base_url: &str, call: &CallRequest) -> OutboundRequest {
        let mut request = OutboundRequest {
            method: call.method.clone(),
            url: resolve_url(base_url, &call.endpoint),
            headers: Default::default(),
            body: call.body.clone(),
        };
        for interceptor in &self.outbound {
            interceptor.apply(call, &mut request);
        }
        request
    }

    /// Parse, classify and normalize a received response.
    pub fn parse_inbound(&self, raw: RawResponse) -> Result<ResponseEnvelope<Value>, FailureKind> {
        normalize_response(raw)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("outbound", &self.names())
            .finish()
    }
}

/// Join `endpoint` onto `base_url`; absolute endpoints are used unchanged.
pub fn resolve_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = endpoint.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

/// Inbound normalization.
///
/// An empty body on a 2xx reads as JSON `null`; on any other status it does
/// not parse. A body that does not parse is a malformed `Api` failure with the
/// received status. A non-2xx status is an
/// `Api` failure whose message prefers the body's own. A 2xx body that
/// declares `"success": false` is also reported as an `Api` failure.
pub fn normalize_response(raw: RawResponse) -> Result<ResponseEnvelope<Value>, FailureKind> {
    let status = raw.status;
    let empty = raw.body.iter().all(u8::is_ascii_whitespace);
    let parsed = if empty && (200..300).contains(&status) {
        Value::Null
    } else if empty {
        tracing::debug!("Empty response body (status={})", status);
        return Err(FailureKind::malformed(status));
    } else {
        serde_json::from_slice::<Value>(&raw.body).map_err(|e| {
            tracing::debug!("Unparsable response body (status={}): {}", status, e);
            FailureKind::malformed(status)
        })?
    };

    let body = ResponseBody::from_value(parsed);
    if let Some(failure) = classify_status(status, body.message()) {
        return Err(failure);
    }
    if body.declares_failure() {
        let message = body
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(FailureKind::api(status, message));
    }

    Ok(body.into_envelope().with_status(status))
}
