//! Core types for the market client.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: Strongly-typed call identifiers
//! - **Errors**: The `FailureKind` taxonomy and setup errors with thiserror derives
//! - **Config**: Client configuration and per-call options
//! - **Requests**: The immutable `CallRequest` submitted by callers

mod config;
mod errors;
mod ids;
mod request;

pub use config::{
    CallOptions, CallOverrides, ClientConfig, ObservabilityConfig, ENV_BASE_URL,
    ENV_LOG_FORMAT, ENV_MAX_CONCURRENCY, ENV_MAX_RETRIES, ENV_RETRY_DELAY_MS, ENV_TIMEOUT_MS,
};
pub use errors::{
    classify_status, Error, FailureCategory, FailureKind, Result, MALFORMED_BODY_MESSAGE,
};
pub use ids::CallId;
pub use request::CallRequest;
