//! MCP server connection backed by rmcp
//!
//! One `MCPServer` owns one client session, reached either over streamable
//! HTTP or by spawning a child process that speaks MCP on stdio.

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, CallToolResult, ServerInfo, Tool};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

use super::client::ToolClient;
use crate::config::{MCPServerConfig, TransportConfig};
use crate::error::McpOtelError;
use crate::propagation::JsonObject;

/// A connected MCP server
pub struct MCPServer {
    /// Server ID
    id: String,

    /// Per-call timeout
    timeout: Duration,

    /// Handle used for requests
    peer: Peer<RoleClient>,

    /// Owning service, taken on cleanup
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl MCPServer {
    /// Connect to the server described by `config`
    pub async fn connect(config: &MCPServerConfig) -> Result<Self> {
        let service = match &config.transport {
            TransportConfig::Http { uri, headers } => {
                let mut header_map = reqwest::header::HeaderMap::new();
                for (name, value) in headers {
                    header_map.insert(
                        reqwest::header::HeaderName::from_bytes(name.as_bytes())
                            .with_context(|| format!("invalid header name '{}'", name))?,
                        reqwest::header::HeaderValue::from_str(value)
                            .with_context(|| format!("invalid value for header '{}'", name))?,
                    );
                }
                let client = reqwest::Client::builder()
                    .default_headers(header_map)
                    .build()?;

                let transport = StreamableHttpClientTransport::with_client(
                    client,
                    StreamableHttpClientTransportConfig::with_uri(uri.as_str()),
                );
                ().serve(transport).await.map_err(|e| transport_error(&config.id, e))?
            }
            TransportConfig::Stdio { command, args, env } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.args(args).envs(env);

                let transport = TokioChildProcess::new(cmd)
                    .map_err(|e| transport_error(&config.id, e))?;
                ().serve(transport).await.map_err(|e| transport_error(&config.id, e))?
            }
        };

        tracing::info!(
            "[MCPServer] Connected to '{}' ({:?})",
            config.id,
            service.peer_info().map(|info| &info.server_info.name)
        );

        Ok(Self {
            id: config.id.clone(),
            timeout: Duration::from_secs(config.session_timeout_secs),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        })
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the session is still open
    pub async fn is_connected(&self) -> bool {
        self.service.lock().await.is_some()
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(McpOtelError::NotConnected {
                server: self.id.clone(),
            }
            .into())
        }
    }

    async fn with_timeout<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| transport_error(&self.id, e).into()),
            Err(_) => Err(McpOtelError::Timeout {
                server: self.id.clone(),
                seconds: self.timeout.as_secs(),
            }
            .into()),
        }
    }
}

fn transport_error(server: &str, e: impl std::fmt::Display) -> McpOtelError {
    McpOtelError::Transport {
        server: server.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl ToolClient for MCPServer {
    fn name(&self) -> &str {
        &self.id
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.ensure_connected().await?;
        self.with_timeout(self.peer.list_all_tools()).await
    }

    async fn call_tool(&self, tool_name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult> {
        self.ensure_connected().await?;

        let param: CallToolRequestParam = serde_json::from_value(json!({
            "name": tool_name,
            "arguments": arguments.unwrap_or_default(),
        }))?;

        tracing::debug!("[MCPServer] Calling tool '{}' on '{}'", tool_name, self.id);

        self.with_timeout(self.peer.call_tool(param)).await
    }

    async fn server_info(&self) -> Option<ServerInfo> {
        self.peer.peer_info().cloned()
    }

    async fn cleanup(&self) -> Result<()> {
        let service = self.service.lock().await.take();
        match service {
            Some(service) => {
                service
                    .cancel()
                    .await
                    .map_err(|e| anyhow!("failed to stop MCP server '{}': {}", self.id, e))?;
                tracing::info!("[MCPServer] Closed session with '{}'", self.id);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
