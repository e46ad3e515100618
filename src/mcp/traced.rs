//! Tool client wrapper that propagates trace context
//!
//! [`TracedMCPServer`] wraps any [`ToolClient`] and injects the current trace
//! context into the `_meta` argument of every tool call. Everything else is
//! forwarded untouched: trait methods explicitly, inherent methods of the
//! wrapped client through `Deref`.

use anyhow::Result;
use async_trait::async_trait;
use rmcp::model::{CallToolResult, ServerInfo, Tool};
use serde_json::Value;
use std::ops::Deref;

use super::client::ToolClient;
use crate::propagation::{JsonObject, MetaPropagator, META_KEY};

/// Adds outbound trace propagation to a tool client
///
/// # Example
/// ```ignore
/// let server = MCPServer::connect(&MCPServerConfig::stdio("search", "search-server", ["--stdio"])).await?;
/// let traced = TracedMCPServer::new(server);
///
/// // `_meta` now carries traceparent/tracestate/baggage of the current context
/// let result = traced.call_tool("search", Some(args)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TracedMCPServer<C> {
    server: C,
    propagator: MetaPropagator,
}

impl<C> TracedMCPServer<C> {
    /// Wrap `server`, serializing context with the global propagator
    pub fn new(server: C) -> Self {
        Self::with_propagator(server, MetaPropagator::global())
    }

    /// Wrap `server` with an explicit propagator
    pub fn with_propagator(server: C, propagator: MetaPropagator) -> Self {
        Self { server, propagator }
    }

    /// The wrapped client
    pub fn inner(&self) -> &C {
        &self.server
    }

    /// Unwrap the client
    pub fn into_inner(self) -> C {
        self.server
    }

    /// Add the current trace context to `arguments` under `_meta`
    ///
    /// An existing `_meta` entry is replaced, not merged.
    fn with_trace_meta(&self, arguments: Option<JsonObject>) -> JsonObject {
        let mut arguments = arguments.unwrap_or_default();
        let meta = self.propagator.inject_meta();

        tracing::trace!(
            "[TracedMCPServer] Injecting {} trace field(s) into {}",
            meta.len(),
            META_KEY
        );

        arguments.insert(META_KEY.to_string(), Value::Object(meta));
        arguments
    }
}

impl<C> Deref for TracedMCPServer<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.server
    }
}

#[async_trait]
impl<C: ToolClient> ToolClient for TracedMCPServer<C> {
    fn name(&self) -> &str {
        self.server.name()
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.server.list_tools().await
    }

    async fn call_tool(&self, tool_name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult> {
        let arguments = self.with_trace_meta(arguments);
        self.server.call_tool(tool_name, Some(arguments)).await
    }

    async fn health_check(&self) -> Result<()> {
        self.server.health_check().await
    }

    async fn server_info(&self) -> Option<ServerInfo> {
        self.server.server_info().await
    }

    async fn cleanup(&self) -> Result<()> {
        self.server.cleanup().await
    }
}
