//! MCP (Model Context Protocol) Support
//!
//! Client side of tool invocation with trace propagation.
//!
//! # Architecture
//!
//! - `ToolClient`: the operations every tool client exposes
//! - `MCPServer`: rmcp client session with a single MCP server
//! - `TracedMCPServer`: wraps any `ToolClient`, injecting the current trace
//!   context into the `_meta` argument of each tool call
//! - `MCPServerManager`: manages multiple servers, tracing the ones whose
//!   config asks for it
//!
//! # Usage
//!
//! ```ignore
//! use mcp_otel::mcp::{MCPServerManager, ToolClient};
//! use mcp_otel::config::MCPServerConfig;
//!
//! mcp_otel::telemetry::install_propagator();
//!
//! let manager = MCPServerManager::new();
//! manager
//!     .add_server(MCPServerConfig::stdio("search", "search-server", ["--stdio"]))
//!     .await?;
//!
//! let result = manager.call_tool("search", "search", Some(args)).await?;
//! ```

mod client;
mod manager;
mod server;
mod traced;

// Public exports
pub use client::ToolClient;
pub use manager::{MCPServerManager, MCPToolInfo};
pub use server::MCPServer;
pub use traced::TracedMCPServer;

// Re-export rmcp types that appear in the public API
pub use rmcp::model::{CallToolResult, ServerInfo, Tool};
