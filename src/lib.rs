//! OpenTelemetry trace context propagation for MCP tool calls
//!
//! MCP tool calls cross a process boundary (often stdio, which has no
//! headers), so the W3C trace context travels inside the tool arguments
//! under the `_meta` key:
//!
//! - [`mcp::TracedMCPServer`] wraps a tool client and injects the caller's
//!   current context into every `call_tool`;
//! - [`propagation::ScopedFn`], [`propagation::ScopedAsyncFn`] and
//!   [`tools::ToolRegistry`] run tool bodies inside the context extracted
//!   from `_meta`, restoring the previous context on every exit path.
//!
//! [`telemetry::init_telemetry`] installs the W3C propagator, the tracer
//! provider and file logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod propagation;
pub mod telemetry;
pub mod tools;

pub use error::{McpOtelError, Result};
pub use propagation::{
    extract_context_from_meta, inject_context_to_meta, with_otel_context_from_meta,
    with_otel_context_from_meta_async, MetaPropagator, TraceCarrier, META_KEY,
};
