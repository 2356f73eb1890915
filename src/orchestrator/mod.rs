//! Request orchestration: admission, execution, interception.
//!
//! ```text
//!   submit ─▶ ConcurrencyGate ─▶ ExecutionPipeline ─▶ InterceptorChain (out)
//!                 ▲   (FIFO)            │                    │
//!                 │                     │ retry (fixed delay) ▼
//!            permit drop ◀── envelope / FailureKind ◀── Transport ◀─┘
//! ```

pub mod gate;
pub mod interceptor;
pub mod pipeline;

pub use gate::{ConcurrencyGate, GatePermit, GateStats};
pub use interceptor::{
    normalize_response, resolve_url, BearerAuth, CallerHeaders, DefaultHeaders,
    InterceptorChain, OutboundInterceptor,
};
pub use pipeline::{Execution, ExecutionPipeline};
