//! market-client - submit calls to the market service from the command line.
//!
//! Useful for probing routes with the same timeout, retry and concurrency
//! behavior the desktop client uses:
//!
//! ```text
//! market-client GET /api/market/quotes --repeat 5 --max-concurrency 2
//! market-client POST /api/strategy/backtest --body '{"symbol":"ES"}' --timeout-ms 10000
//! ```

use clap::Parser;
use market_client_core::auth::EnvToken;
use market_client_core::{
    CallOverrides, CallRequest, ClientConfig, MarketClient, ResponseEnvelope,
};
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "market-client", version, about = "Submit calls to the market service")]
struct Args {
    /// HTTP method (GET, POST, PUT, DELETE, ...).
    method: String,

    /// Endpoint path relative to the base address, or an absolute URL.
    endpoint: String,

    /// Base address of the market service.
    #[arg(long, env = "MARKET_CLIENT_BASE_URL")]
    base_url: Option<String>,

    /// JSON config file; environment overrides are applied on top.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON request body.
    #[arg(long)]
    body: Option<String>,

    /// Extra header as `Name: value`; may be repeated.
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries after the first attempt.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Fixed delay between attempts in milliseconds.
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Submit the same call this many times concurrently.
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Maximum calls in flight.
    #[arg(long)]
    max_concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every call succeeded.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env()?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(limit) = args.max_concurrency {
        config.max_concurrency = limit;
    }

    market_client_core::observability::init_tracing_with(&config.observability);

    let client = MarketClient::builder()
        .base_url(config.base_url.clone())
        .call_options(config.call)
        .max_concurrency(config.max_concurrency)
        .credentials(Arc::new(EnvToken::default()))
        .build()?;

    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;
    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;
    let overrides = CallOverrides {
        timeout: args.timeout_ms.map(Duration::from_millis),
        max_retries: args.max_retries,
        retry_delay: args.retry_delay_ms.map(Duration::from_millis),
    };

    let mut template = CallRequest::new(method, args.endpoint).with_overrides(overrides);
    if let Some(body) = body {
        template = template.with_body(body);
    }
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header must look like `Name: value`, got {:?}", header))?;
        template = template.try_header(name.trim(), value.trim())?;
    }

    let calls = (0..args.repeat.max(1))
        .map(|_| template.clone().with_id(Default::default()))
        .collect();
    let results = client.submit_batch(calls).await;

    let mut all_ok = true;
    for result in results {
        let envelope = match result {
            Ok(envelope) => envelope,
            Err(failure) => {
                all_ok = false;
                let code = failure.api_code().map(i64::from);
                ResponseEnvelope::<Value>::failure(failure.to_string(), code)
            }
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }

    let stats = client.stats();
    tracing::info!(
        "Done: submitted={} succeeded={} failed={} retries={}",
        stats.submitted,
        stats.succeeded,
        stats.failed,
        stats.retries
    );
    Ok(all_ok)
}
