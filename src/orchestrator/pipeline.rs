//! Execution pipeline - runs one call to completion.
//!
//! Per attempt: outbound interceptors, a race between the transport and the
//! per-attempt deadline, inbound normalization, classification. Retryable
//! failures loop back after a fixed delay until the attempt budget
//! (`max_retries + 1`) is spent; the last failure is returned verbatim.
//!
//! The losing side of the timeout race is dropped, which aborts the
//! in-flight transport future. Callers have no cancellation handle of their own.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};

use super::interceptor::InterceptorChain;
use crate::envelope::ResponseEnvelope;
use crate::transport::Transport;
use crate::types::{CallOptions, CallRequest, FailureKind};

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: Result<ResponseEnvelope<Value>, FailureKind>,
    /// Transport attempts made, between 1 and `max_retries + 1`.
    pub attempts: u32,
}

/// Stateless with respect to shared memory; safe to share across calls.
#[derive(Clone)]
pub struct ExecutionPipeline {
    base_url: String,
    chain: InterceptorChain,
    transport: Arc<dyn Transport>,
}

impl ExecutionPipeline {
    pub fn new(
        base_url: impl Into<String>,
        chain: InterceptorChain,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            chain,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    pub async fn execute(&self, call: &CallRequest, options: CallOptions) -> Execution {
        let mut attempt: u32 = 0;
        loop {
            let started = Instant::now();
            let outcome = self.attempt_once(call, &options).await;
            let elapsed_ms = started.elapsed().as_millis();

            match outcome {
                Ok(envelope) => {
                    tracing::debug!(
                        "Call {} {} {} succeeded (attempt={}, {}ms)",
                        call.id,
                        call.method,
                        call.endpoint,
                        attempt + 1,
                        elapsed_ms
                    );
                    return Execution {
                        result: Ok(envelope),
                        attempts: attempt + 1,
                    };
                }
                Err(failure) if failure.is_retryable() && attempt < options.max_retries => {
                    tracing::warn!(
                        "Call {} {} attempt {}/{} failed: {}. Retrying in {:?}",
                        call.id,
                        call.endpoint,
                        attempt + 1,
                        options.max_attempts(),
                        failure,
                        options.retry_delay
                    );
                    sleep(options.retry_delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    if failure.is_retryable() {
                        tracing::warn!(
                            "Call {} {} gave up after {} attempts: {}",
                            call.id,
                            call.endpoint,
                            attempt + 1,
                            failure
                        );
                    } else {
                        tracing::debug!(
                            "Call {} {} failed without retry: {}",
                            call.id,
                            call.endpoint,
                            failure
                        );
                    }
                    return Execution {
                        result: Err(failure),
                        attempts: attempt + 1,
                    };
                }
            }
        }
    }

    async fn attempt_once(
        &self,
        call: &CallRequest,
        options: &CallOptions,
    ) -> Result<ResponseEnvelope<Value>, FailureKind> {
        let request = self.chain.prepare(&self.base_url, call);
        match timeout(options.timeout, self.transport.send(request)).await {
            Err(_elapsed) => Err(FailureKind::timeout(options.timeout_ms())),
            Ok(Err(transport_err)) => Err(transport_err.into()),
            Ok(Ok(raw)) => self.chain.parse_inbound(raw),
        }
    }
}

impl std::fmt::Debug for ExecutionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPipeline")
            .field("base_url", &self.base_url)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
