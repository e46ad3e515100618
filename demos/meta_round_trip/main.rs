//! Meta Round Trip Example
//!
//! Runs both halves of `_meta` propagation in one process:
//! - a `ToolRegistry` with a blocking and an async "search" tool (server side)
//! - a `TracedMCPServer` around a loopback client that serializes the call to
//!   JSON and dispatches it with an empty ambient context (client side)
//!
//! Each tool prints the trace it runs under; it matches the client's trace.
//! Debug logs go to the rolling log file (`MCP_LOG_DIR`, default `logs/`).
//!
//! Run with: cargo run --example meta_round_trip

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::sync::Arc;

use mcp_otel::config::{LoggingConfig, TelemetryConfig};
use mcp_otel::mcp::{CallToolResult, Tool, ToolClient, TracedMCPServer};
use mcp_otel::propagation::{ambient, in_context_async, JsonObject};
use mcp_otel::logging;
use mcp_otel::telemetry::{build_tracer_provider, install_propagator};
use mcp_otel::tools::{ToolHandler, ToolRegistry};
use opentelemetry::trace::{FutureExt, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::Context;
use rmcp::model::Content;
use serde_json::{json, Value};

/// Client that "sends" calls to an in-process registry
struct LoopbackClient {
    registry: Arc<ToolRegistry>,
}

#[async_trait]
impl ToolClient for LoopbackClient {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, tool_name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult> {
        let wire = serde_json::to_string(&arguments.unwrap_or_default())?;
        println!("{} {}", "[Wire]".dimmed(), wire);

        let arguments: JsonObject = serde_json::from_str(&wire)?;
        let output = in_context_async(Context::new(), || self.registry.call_logged(tool_name, arguments)).await?;
        Ok(CallToolResult::success(vec![Content::text(output.to_string())]))
    }
}

fn describe_current(label: &str) -> Value {
    let cx = ambient::current();
    let span = cx.span();
    let sc = span.span_context();
    println!(
        "{} {} trace={} parent={}",
        "[Server]".yellow(),
        label,
        sc.trace_id(),
        sc.span_id()
    );
    json!({ "trace_id": sc.trace_id().to_string() })
}

#[tokio::main]
async fn main() -> Result<()> {
    let logging_config = LoggingConfig {
        default_filter: "meta_round_trip=info,mcp_otel=debug".to_string(),
        ..Default::default()
    }
    .with_env_overrides();
    logging::init_logging(&logging_config)?;

    install_propagator();

    // --- Server side ---
    let mut registry = ToolRegistry::new();
    registry.register(
        "search",
        "Blocking search",
        ToolHandler::blocking(|_args| Ok(describe_current("search"))),
    )?;
    registry.register(
        "search_async",
        "Async search",
        ToolHandler::from_async(|_args| async {
            tokio::task::yield_now().await;
            Ok(describe_current("search_async"))
        }),
    )?;
    for tool in registry.list() {
        println!("{} {} - {}", "[Setup]".cyan(), tool.name, tool.description);
    }

    // --- Client side ---
    let provider = build_tracer_provider(&TelemetryConfig::from_env())?;
    let client = TracedMCPServer::new(LoopbackClient {
        registry: Arc::new(registry),
    });

    let cx = Context::current_with_span(provider.tracer("meta_round_trip").start("agent-run"));
    println!(
        "{} trace={} span={}",
        "[Client]".green(),
        cx.span().span_context().trace_id(),
        cx.span().span_context().span_id()
    );

    for tool in ["search", "search_async"] {
        let arguments = json!({ "query": "rust opentelemetry" })
            .as_object()
            .cloned()
            .unwrap_or_default();
        let result = client
            .call_tool(tool, Some(arguments))
            .with_context(cx.clone())
            .await?;
        println!("{} {}", "[Client]".green(), serde_json::to_string(&result)?);
    }

    cx.span().end();
    Ok(())
}
