//! OpenTelemetry context propagation over the MCP `_meta` field
//!
//! MCP requests have no headers on every transport (stdio has none at all),
//! so trace context rides inside the tool arguments under `_meta`, using
//! the W3C `traceparent` / `tracestate` / `baggage` text-map keys.
//!
//! - Client side: [`MetaPropagator::inject_meta`] serializes the current
//!   context; [`TracedMCPServer`](crate::mcp::TracedMCPServer) does this for
//!   every tool call.
//! - Server side: [`ScopedFn`] / [`ScopedAsyncFn`] (or the
//!   [`ToolRegistry`](crate::tools::ToolRegistry)) run tool bodies inside the
//!   context extracted from `_meta`.
//!
//! All access to the implicit ambient context lives in [`ambient`].

pub mod ambient;
mod carrier;
mod meta;
mod scope;

pub use carrier::{JsonObject, TraceCarrier, BAGGAGE, CARRIER_KEYS, META_KEY, TRACEPARENT, TRACESTATE};
pub use meta::{extract_context_from_meta, inject_context_to_meta, w3c_propagator, MetaPropagator};
pub use scope::{
    context_for, in_context, in_context_async, in_meta_scope, in_meta_scope_async, with_otel_context_from_meta,
    with_otel_context_from_meta_async, MetaSource, ScopedAsyncFn, ScopedFn,
};
