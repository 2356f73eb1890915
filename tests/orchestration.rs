//! Orchestration tests - gate + pipeline behavior through the public client API.
//!
//! Uses an in-process scripted transport and tokio's paused clock, so timing
//! assertions are exact rather than wall-clock dependent.

use async_trait::async_trait;
use futures::future::join_all;
use market_client_core::transport::{OutboundRequest, RawResponse, Transport, TransportError};
use market_client_core::{
    CallOptions, CallOverrides, CallRequest, FailureKind, MarketClient,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// Test Helpers
// =============================================================================

/// How the fake remote reacts to every request.
#[derive(Clone, Copy)]
enum Behavior {
    /// Succeed after the given latency; the payload echoes the `x-seq` header.
    SucceedAfter(Duration),
    /// Latency derived from `x-seq` so calls finish out of submission order.
    VariedLatency,
    /// Always fail before any response.
    RefuseConnection,
    /// Always answer with this status and a `message` body.
    Status(u16, &'static str),
}

struct FakeRemote {
    behavior: Behavior,
    attempts: AtomicU32,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    arrival_order: Mutex<Vec<String>>,
}

impl FakeRemote {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            attempts: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            arrival_order: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

fn seq_of(request: &OutboundRequest) -> u64 {
    request
        .headers
        .get("x-seq")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl Transport for FakeRemote {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.arrival_order.lock().unwrap().push(request.url.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let seq = seq_of(&request);
        let result = match self.behavior {
            Behavior::SucceedAfter(latency) => {
                tokio::time::sleep(latency).await;
                Ok(RawResponse::json(200, &json!({"success": true, "data": {"seq": seq}})))
            }
            Behavior::VariedLatency => {
                tokio::time::sleep(Duration::from_millis((seq * 37) % 90 + 5)).await;
                Ok(RawResponse::json(200, &json!({"seq": seq})))
            }
            Behavior::RefuseConnection => Err(TransportError::new("connection refused")),
            Behavior::Status(status, message) => {
                Ok(RawResponse::json(status, &json!({"message": message})))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn client_with(remote: Arc<FakeRemote>, max_concurrency: usize, options: CallOptions) -> MarketClient {
    MarketClient::builder()
        .base_url("http://market.test")
        .max_concurrency(max_concurrency)
        .call_options(options)
        .transport(remote)
        .build()
        .unwrap()
}

fn options(timeout_ms: u64, max_retries: u32, retry_delay_ms: u64) -> CallOptions {
    CallOptions {
        timeout: Duration::from_millis(timeout_ms),
        max_retries,
        retry_delay: Duration::from_millis(retry_delay_ms),
    }
}

fn seq_call(i: u64) -> CallRequest {
    CallRequest::get(format!("/quotes/{}", i))
        .try_header("x-seq", &i.to_string())
        .unwrap()
}

// =============================================================================
// Concurrency Gate
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_five_calls_complete_in_three_waves() {
    let remote = FakeRemote::new(Behavior::SucceedAfter(Duration::from_millis(100)));
    let client = client_with(remote.clone(), 2, options(45_000, 2, 1_000));
    let started = Instant::now();

    let timed = (0..5).map(|i| {
        let client = client.clone();
        async move {
            let result = client.submit(seq_call(i)).await;
            (result, started.elapsed())
        }
    });
    let outcomes = join_all(timed).await;

    let mut waves = [0usize; 3];
    for (result, elapsed) in &outcomes {
        assert!(result.is_ok());
        let wave = (elapsed.as_millis() / 100) as usize - 1;
        waves[wave] += 1;
    }
    assert_eq!(waves, [2, 2, 1]);
    let total = started.elapsed();
    assert!(total >= Duration::from_millis(300) && total < Duration::from_millis(400));
    assert_eq!(remote.peak(), 2);
    assert_eq!(client.stats().gate.active, 0);
}

#[tokio::test(start_paused = true)]
async fn test_queued_calls_promoted_in_submission_order() {
    let remote = FakeRemote::new(Behavior::SucceedAfter(Duration::from_millis(20)));
    let client = client_with(remote.clone(), 1, options(45_000, 0, 0));

    let calls = ["/a", "/b", "/c", "/d"]
        .iter()
        .map(|path| CallRequest::get(*path))
        .collect();
    let results = client.submit_batch(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(
        *remote.arrival_order.lock().unwrap(),
        vec![
            "http://market.test/a",
            "http://market.test/b",
            "http://market.test/c",
            "http://market.test/d",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_concurrency_across_spawned_submitters() {
    let remote = FakeRemote::new(Behavior::SucceedAfter(Duration::from_millis(3)));
    let client = client_with(remote.clone(), 3, options(45_000, 0, 0));

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.submit(seq_call(i)).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert!(remote.peak() <= 3);
    let stats = client.stats();
    assert_eq!(stats.submitted, 40);
    assert_eq!(stats.succeeded, 40);
    assert_eq!(stats.gate.active, 0);
    assert_eq!(stats.gate.pending, 0);
}

// =============================================================================
// Execution Pipeline
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_network_failure_exhausts_retry_budget() {
    let remote = FakeRemote::new(Behavior::RefuseConnection);
    let client = client_with(remote.clone(), 3, options(45_000, 2, 50));
    let started = Instant::now();

    let failure = client.get("/futures/ES").await.unwrap_err();

    assert_eq!(failure, FailureKind::network("connection refused"));
    assert_eq!(remote.attempts(), 3);
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(client.stats().retries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_immediate() {
    let remote = FakeRemote::new(Behavior::Status(404, "not found"));
    let client = client_with(remote.clone(), 3, options(45_000, 2, 50));
    let started = Instant::now();

    let failure = client.get("/options/unknown").await.unwrap_err();

    assert_eq!(failure, FailureKind::api(404, "not found"));
    assert_eq!(remote.attempts(), 1);
    assert!(started.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_server_error_retried_then_surfaced() {
    let remote = FakeRemote::new(Behavior::Status(502, "upstream down"));
    let client = client_with(remote.clone(), 3, options(45_000, 1, 10));

    let failure = client.get("/market/depth").await.unwrap_err();

    assert_eq!(failure, FailureKind::api(502, "upstream down"));
    assert_eq!(remote.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_precedes_slow_success() {
    let remote = FakeRemote::new(Behavior::SucceedAfter(Duration::from_millis(50)));
    let client = client_with(remote.clone(), 3, CallOptions::default());
    let started = Instant::now();

    let call = CallRequest::get("/slow").with_overrides(
        CallOverrides::new()
            .timeout(Duration::from_millis(10))
            .max_retries(0),
    );
    let failure = client.submit(call).await.unwrap_err();

    assert_eq!(failure, FailureKind::timeout(10));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(10) && elapsed < Duration::from_millis(50));
    // The abandoned attempt no longer counts as in flight.
    assert_eq!(client.stats().gate.active, 0);
}

// =============================================================================
// Envelope completeness / exactly-once
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_ten_varied_calls_all_complete_once() {
    let remote = FakeRemote::new(Behavior::VariedLatency);
    let client = client_with(remote.clone(), 3, options(45_000, 2, 10));

    let results = client.submit_batch((0..10).map(seq_call).collect()).await;

    assert_eq!(results.len(), 10);
    let mut seen = HashSet::new();
    for result in results {
        let envelope = result.unwrap();
        assert!(envelope.success);
        assert!(chrono::DateTime::parse_from_rfc3339(&envelope.timestamp).is_ok());
        let seq = envelope.data.unwrap()["seq"].as_u64().unwrap();
        assert!(seen.insert(seq), "duplicate completion for call {}", seq);
    }
    assert_eq!(seen, (0..10).collect::<HashSet<u64>>());
    assert_eq!(remote.attempts(), 10);
    assert_eq!(client.stats().succeeded, 10);
}
