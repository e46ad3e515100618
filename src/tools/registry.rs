//! Tool registry
//!
//! Dispatches tool calls by name. Each call runs inside the trace context
//! extracted from its `_meta` argument, under a `tool_call` span parented on
//! that context, so server-side work joins the caller's trace. With a
//! `tracing-opentelemetry` layer installed, the handler's ambient span is
//! `tool_call` itself.

use anyhow::Result;
use opentelemetry::trace::TraceContextExt;
use std::collections::HashMap;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::handler::{ToolHandler, ToolInfo, ToolOutput};
use crate::error::McpOtelError;
use crate::propagation::{context_for, in_context, in_context_async, JsonObject, MetaPropagator};

struct RegisteredTool {
    description: String,
    handler: ToolHandler,
}

/// Registry of named tool handlers
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    propagator: MetaPropagator,
}

impl ToolRegistry {
    /// Create an empty registry using the global propagator
    pub fn new() -> Self {
        Self::with_propagator(MetaPropagator::global())
    }

    /// Create an empty registry with an explicit propagator
    pub fn with_propagator(propagator: MetaPropagator) -> Self {
        Self {
            tools: HashMap::new(),
            propagator,
        }
    }

    /// Register a tool
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: ToolHandler,
    ) -> crate::error::Result<()> {
        let name = name.into();
        if self.tools.contains_key(&name) {
            return Err(McpOtelError::DuplicateTool(name));
        }

        tracing::debug!(
            "[ToolRegistry] Registered tool '{}' ({})",
            name,
            if handler.is_async() { "async" } else { "blocking" }
        );

        self.tools.insert(
            name,
            RegisteredTool {
                description: description.into(),
                handler,
            },
        );
        Ok(())
    }

    /// Describe all registered tools, sorted by name
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<_> = self
            .tools
            .iter()
            .map(|(name, tool)| ToolInfo {
                name: name.clone(),
                description: tool.description.clone(),
                is_async: tool.handler.is_async(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool with its arguments
    ///
    /// The arguments reach the handler unchanged, `_meta` included. Handler
    /// errors are returned as they are; only an unknown tool produces a
    /// [`McpOtelError`].
    pub async fn call(&self, name: &str, arguments: JsonObject) -> ToolOutput {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpOtelError::UnknownTool(name.to_string()))?;

        let cx = context_for(&self.propagator, &arguments);

        let span = tracing::info_span!("tool_call", tool = %name);
        span.set_parent(cx.clone());

        // The body runs as a child of `tool_call`. Without an OpenTelemetry
        // layer the span has no context of its own, so use the caller's.
        let span_cx = span.context();
        let cx = if span_cx.has_active_span() { span_cx } else { cx };

        match &tool.handler {
            ToolHandler::Blocking(f) => {
                let _entered = span.enter();
                in_context(cx, || f(arguments))
            }
            ToolHandler::Async(f) => in_context_async(cx, || f(arguments)).instrument(span).await,
        }
    }

    /// Invoke a tool, logging failures
    pub async fn call_logged(&self, name: &str, arguments: JsonObject) -> Result<serde_json::Value> {
        let result = self.call(name, arguments).await;
        if let Err(e) = &result {
            tracing::warn!("[ToolRegistry] Tool '{}' failed: {}", name, e);
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
