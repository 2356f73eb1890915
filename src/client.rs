//! Market client - the public entry point.
//!
//! Constructed once at startup with injected configuration, credentials and
//! transport, then shared by reference (or cheap clone) with every caller.
//! Each submitted call passes the concurrency gate, then the execution
//! pipeline; the gate slot is released when the pipeline finishes, whatever
//! the outcome.

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::auth::{CredentialProvider, NoCredentials};
use crate::envelope::ResponseEnvelope;
use crate::orchestrator::{
    ConcurrencyGate, ExecutionPipeline, GateStats, InterceptorChain, OutboundInterceptor,
};
use crate::transport::{HttpTransport, Transport};
use crate::types::{CallOptions, CallRequest, ClientConfig, FailureKind, Result};

/// Result of one submitted call.
pub type CallResult<T = Value> = std::result::Result<ResponseEnvelope<T>, FailureKind>;

/// Counters across the client's lifetime plus the live gate view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub gate: GateStats,
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Attempts beyond the first, summed over all calls.
    pub retries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
}

#[derive(Debug)]
struct ClientInner {
    defaults: CallOptions,
    gate: ConcurrencyGate,
    pipeline: ExecutionPipeline,
    counters: Counters,
}

/// Outbound request orchestrator for the remote market service.
#[derive(Debug, Clone)]
pub struct MarketClient {
    inner: Arc<ClientInner>,
}

impl MarketClient {
    pub fn builder() -> MarketClientBuilder {
        MarketClientBuilder::new()
    }

    /// Client with the default HTTP transport and no credentials.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        MarketClientBuilder::from_config(config).build()
    }

    pub fn base_url(&self) -> &str {
        self.inner.pipeline.base_url()
    }

    pub fn defaults(&self) -> CallOptions {
        self.inner.defaults
    }

    /// Submit a call and wait for its terminal outcome.
    ///
    /// Waits on the gate if `max_concurrency` calls are already running.
    /// Returns the envelope on success or the last `FailureKind` observed.
    pub async fn submit(&self, call: CallRequest) -> CallResult {
        let options = call.overrides.apply(self.inner.defaults);
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let execution = self
            .inner
            .gate
            .run(self.inner.pipeline.execute(&call, options))
            .await;

        let counters = &self.inner.counters;
        counters
            .retries
            .fetch_add(u64::from(execution.attempts.saturating_sub(1)), Ordering::Relaxed);
        match &execution.result {
            Ok(_) => counters.succeeded.fetch_add(1, Ordering::Relaxed),
            Err(_) => counters.failed.fetch_add(1, Ordering::Relaxed),
        };
        execution.result
    }

    /// Submit a call and decode the payload into `T`.
    pub async fn submit_as<T: DeserializeOwned>(&self, call: CallRequest) -> CallResult<T> {
        self.submit(call).await?.into_typed()
    }

    /// Submit several calls at once; results come back in input order.
    ///
    /// Calls enter the gate in input order, so with a full gate they are
    /// also promoted in that order.
    pub async fn submit_batch(&self, calls: Vec<CallRequest>) -> Vec<CallResult> {
        join_all(calls.into_iter().map(|call| self.submit(call))).await
    }

    pub async fn get(&self, endpoint: &str) -> CallResult {
        self.submit(CallRequest::get(endpoint)).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> CallResult {
        self.submit(CallRequest::post(endpoint, body)).await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> CallResult {
        self.submit(CallRequest::put(endpoint, body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> CallResult {
        self.submit(CallRequest::delete(endpoint)).await
    }

    pub fn stats(&self) -> ClientStats {
        let counters = &self.inner.counters;
        ClientStats {
            gate: self.inner.gate.stats(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            retries: counters.retries.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`MarketClient`].
pub struct MarketClientBuilder {
    config: ClientConfig,
    credentials: Arc<dyn CredentialProvider>,
    transport: Option<Arc<dyn Transport>>,
    interceptors: Vec<Arc<dyn OutboundInterceptor>>,
}

impl MarketClientBuilder {
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            credentials: Arc::new(NoCredentials),
            transport: None,
            interceptors: Vec::new(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn call_options(mut self, options: CallOptions) -> Self {
        self.config.call = options;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = provider;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register an outbound interceptor, run after the built-in ones.
    pub fn interceptor(mut self, interceptor: Arc<dyn OutboundInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Result<MarketClient> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let mut chain = InterceptorChain::new(self.credentials);
        for interceptor in self.interceptors {
            chain.push(interceptor);
        }

        tracing::info!(
            "Market client ready: base_url={} max_concurrency={} timeout={:?} max_retries={} retry_delay={:?}",
            self.config.base_url,
            self.config.max_concurrency,
            self.config.call.timeout,
            self.config.call.max_retries,
            self.config.call.retry_delay,
        );

        Ok(MarketClient {
            inner: Arc::new(ClientInner {
                defaults: self.config.call,
                gate: ConcurrencyGate::new(self.config.max_concurrency),
                pipeline: ExecutionPipeline::new(self.config.base_url, chain, transport),
                counters: Counters::default(),
            }),
        })
    }
}

impl Default for MarketClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarketClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{OutboundRequest, RawResponse, TransportError};
    use crate::types::{CallOverrides, Error};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    /// Echoes the request URL back as the payload.
    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        async fn send(
            &self,
            request: OutboundRequest,
        ) -> std::result::Result<RawResponse, TransportError> {
            if request.url.ends_with("/missing") {
                return Ok(RawResponse::json(404, &json!({"message": "no such route"})));
            }
            Ok(RawResponse::json(
                200,
                &json!({"url": request.url, "method": request.method.as_str()}),
            ))
        }
    }

    fn client() -> MarketClient {
        MarketClient::builder()
            .base_url("http://market.test/api")
            .transport(Arc::new(Echo))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_rejects_zero_concurrency() {
        let err = MarketClient::builder()
            .max_concurrency(0)
            .transport(Arc::new(Echo))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_convenience_verbs() {
        let client = client();
        let got = client.get("/quotes").await.unwrap();
        assert_eq!(
            got.data,
            Some(json!({"url": "http://market.test/api/quotes", "method": "GET"}))
        );
        let posted = client.post("strategies", json!({"name": "x"})).await.unwrap();
        assert_eq!(posted.data.unwrap()["method"], "POST");
        assert_eq!(client.put("/s/1", json!({})).await.unwrap().data.unwrap()["method"], "PUT");
        assert_eq!(client.delete("/s/1").await.unwrap().data.unwrap()["method"], "DELETE");
    }

    #[tokio::test]
    async fn test_submit_as_typed() {
        #[derive(Debug, Deserialize)]
        struct Echoed {
            url: String,
        }
        let envelope = client()
            .submit_as::<Echoed>(CallRequest::get("/typed"))
            .await
            .unwrap();
        assert_eq!(envelope.data.unwrap().url, "http://market.test/api/typed");
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let client = client();
        client.get("/a").await.unwrap();
        let failure = client.get("/missing").await.unwrap_err();
        assert_eq!(failure, FailureKind::api(404, "no such route"));

        let stats = client.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retries, 0);
        assert_eq!(stats.gate.active, 0);
        assert_eq!(stats.gate.max_concurrency, 3);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let client = client();
        let calls = (0..6)
            .map(|i| CallRequest::get(format!("/item/{}", i)))
            .collect::<Vec<_>>();
        let results = client.submit_batch(calls).await;

        assert_eq!(results.len(), 6);
        for (i, result) in results.into_iter().enumerate() {
            let data = result.unwrap().data.unwrap();
            assert_eq!(data["url"], format!("http://market.test/api/item/{}", i));
        }
    }

    #[test]
    fn test_overrides_resolve_against_defaults() {
        let client = MarketClient::builder()
            .call_options(CallOptions {
                timeout: Duration::from_secs(3),
                max_retries: 4,
                retry_delay: Duration::from_millis(7),
            })
            .transport(Arc::new(Echo))
            .build()
            .unwrap();
        let resolved = CallOverrides::new().max_retries(0).apply(client.defaults());
        assert_eq!(resolved.timeout, Duration::from_secs(3));
        assert_eq!(resolved.max_retries, 0);
    }
}
