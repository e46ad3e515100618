//! Traced Tool Call Example
//!
//! Connects to the MCP servers listed in a JSON config and, for every line
//! typed, calls one tool inside a fresh `agent-run` span. The tool call
//! carries that span's trace context in `_meta`, so a server using
//! `ToolRegistry` (or `with_otel_context_from_meta`) records its work in the
//! same trace.
//!
//! Config example:
//! ```json
//! {
//!   "servers": [
//!     { "id": "search", "transport": { "type": "stdio", "command": "search-server" } }
//!   ],
//!   "telemetry": { "otlp_endpoint": "http://localhost:4317" }
//! }
//! ```
//!
//! Run with: cargo run --example traced_tool_call -- mcp.json search search

use anyhow::{Context as _, Result};
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use mcp_otel::{config::MCPConfig, mcp::MCPServerManager, telemetry};
use opentelemetry::trace::{FutureExt, TraceContextExt, Tracer};
use opentelemetry::{global, Context};
use serde_json::json;

const USAGE: &str = "usage: traced_tool_call <config.json> <server-id> <tool-name>";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().context(USAGE)?;
    let server_id = args.next().context(USAGE)?;
    let tool_name = args.next().context(USAGE)?;

    let config = MCPConfig::from_file(&config_path)?;
    let _telemetry = telemetry::init_telemetry(&config.telemetry, &config.logging)?;

    // --- Step 1: Connect servers ---
    let manager = MCPServerManager::new();
    for server in config.enabled_servers() {
        println!("{} Connecting '{}'...", "[Setup]".cyan(), server.id);
        manager.add_server(server.clone()).await?;
    }

    for info in manager.get_all_tools().await? {
        println!(
            "{} {}::{}",
            "[Tool]".cyan(),
            info.server_id,
            info.tool_def.name
        );
    }

    // --- Step 2: Call the tool once per input line ---
    let tracer = global::tracer("traced_tool_call");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{} ", "Enter your query (or 'exit' to quit):".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("q") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let cx = Context::current_with_span(tracer.start("agent-run"));
        let trace_id = cx.span().span_context().trace_id();

        let arguments = json!({ "query": query })
            .as_object()
            .cloned()
            .unwrap_or_default();

        match manager
            .call_tool(&server_id, &tool_name, Some(arguments))
            .with_context(cx.clone())
            .await
        {
            Ok(result) => println!(
                "{} {}",
                "[Result]".green(),
                serde_json::to_string_pretty(&result)?
            ),
            Err(e) => println!("{} {}", "[Error]".red(), e),
        }

        cx.span().end();
        println!("{} {}", "[Trace]".dimmed(), trace_id);
    }

    manager.shutdown().await;
    Ok(())
}
