//! # Market Client Core - Outbound Request Orchestrator
//!
//! Client-side orchestration of calls to the remote market-data service:
//! - Bounded concurrency with a FIFO queue for overflow calls
//! - Per-attempt timeouts raced against the transport
//! - Fixed-delay retries for transient failures, capped at `max_retries + 1` tries
//! - Normalization of heterogeneous bodies into one `ResponseEnvelope`
//! - A closed failure taxonomy: `Network`, `Timeout`, `Api`
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────┐
//!   submit(call) →   │            MarketClient              │
//!                    │  ┌──────────────┐  ┌──────────────┐  │
//!                    │  │ Concurrency  │→ │  Execution   │  │
//!                    │  │    Gate      │  │  Pipeline    │  │
//!                    │  └──────────────┘  └──────┬───────┘  │
//!                    │  ┌──────────────┐  ┌──────▼───────┐  │
//!                    │  │ Interceptor  │↔ │  Transport   │  │
//!                    │  │    Chain     │  │  (reqwest)   │  │
//!                    │  └──────────────┘  └──────────────┘  │
//!                    └──────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod client;
pub mod envelope;
pub mod orchestrator;
pub mod transport;
pub mod types;

// Internal utilities
pub mod observability;

pub use client::{CallResult, ClientStats, MarketClient, MarketClientBuilder};
pub use envelope::ResponseEnvelope;
pub use types::{
    CallOptions, CallOverrides, CallRequest, ClientConfig, Error, FailureKind, Result,
};
