//! Crate error type
//!
//! Errors raised by wrapped tool callables or wrapped clients are never
//! converted into this type; they travel back to the caller as they were.

use thiserror::Error;

/// Errors produced by configuration, transports and dispatch
#[derive(Debug, Error)]
pub enum McpOtelError {
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("MCP server '{0}' already exists")]
    DuplicateServer(String),

    #[error("MCP server '{0}' not found")]
    UnknownServer(String),

    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("tool '{0}' not found")]
    UnknownTool(String),

    #[error("MCP server '{server}' is not connected")]
    NotConnected { server: String },

    #[error("MCP transport error on '{server}': {message}")]
    Transport { server: String, message: String },

    #[error("MCP call to '{server}' timed out after {seconds}s")]
    Timeout { server: String, seconds: u64 },

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

/// Result alias for crate operations
pub type Result<T> = std::result::Result<T, McpOtelError>;
