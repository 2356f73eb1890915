//! reqwest-backed transport.

use async_trait::async_trait;

use super::{OutboundRequest, RawResponse, Transport, TransportError};
use crate::types::Result;

/// HTTP transport over a pooled `reqwest::Client`.
///
/// The client is built without a request timeout: deadlines are enforced per
/// attempt by the execution pipeline.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // A body that cannot be read means no usable response was obtained.
        let body = response.bytes().await?;

        tracing::trace!("HTTP {} from {} ({} bytes)", status, request.url, body.len());

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
