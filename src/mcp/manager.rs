//! MCP Server Manager
//!
//! Manages multiple MCP server connections

use anyhow::Result;
use rmcp::model::CallToolResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::client::ToolClient;
use super::server::MCPServer;
use super::traced::TracedMCPServer;
use crate::config::MCPServerConfig;
use crate::error::McpOtelError;
use crate::propagation::{JsonObject, MetaPropagator};

/// Information about an MCP tool from a specific server
#[derive(Clone)]
pub struct MCPToolInfo {
    /// ID of the server this tool belongs to
    pub server_id: String,

    /// Arc reference to the server
    pub server: Arc<dyn ToolClient>,

    /// The tool definition from rmcp
    pub tool_def: rmcp::model::Tool,
}

impl std::fmt::Debug for MCPToolInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCPToolInfo")
            .field("server_id", &self.server_id)
            .field("tool", &self.tool_def.name)
            .finish()
    }
}

/// Manages connections to multiple MCP servers
pub struct MCPServerManager {
    /// Map of server ID to client
    servers: Arc<RwLock<HashMap<String, Arc<dyn ToolClient>>>>,

    /// Propagator given to traced clients
    propagator: MetaPropagator,
}

impl MCPServerManager {
    /// Create a new empty manager using the global propagator
    pub fn new() -> Self {
        Self::with_propagator(MetaPropagator::global())
    }

    /// Create a new empty manager with an explicit propagator
    pub fn with_propagator(propagator: MetaPropagator) -> Self {
        Self {
            servers: Arc::new(RwLock::new(HashMap::new())),
            propagator,
        }
    }

    /// Add an already connected client
    ///
    /// With `propagate_context` the client is wrapped in [`TracedMCPServer`] so
    /// every tool call carries the caller's trace context in `_meta`.
    pub async fn add_client<C>(&self, id: impl Into<String>, client: C, propagate_context: bool) -> Result<()>
    where
        C: ToolClient + 'static,
    {
        let id = id.into();

        let client: Arc<dyn ToolClient> = if propagate_context {
            Arc::new(TracedMCPServer::with_propagator(client, self.propagator.clone()))
        } else {
            Arc::new(client)
        };

        // Check and insert under one lock so concurrent adds cannot both succeed
        let mut servers = self.servers.write().await;
        if servers.contains_key(&id) {
            return Err(McpOtelError::DuplicateServer(id).into());
        }
        servers.insert(id.clone(), client);

        tracing::debug!(
            "[MCPServerManager] Added MCP server '{}' (propagate_context: {})",
            id,
            propagate_context
        );

        Ok(())
    }

    /// Connect to a new MCP server from config and add it
    pub async fn add_server(&self, config: MCPServerConfig) -> Result<()> {
        if !config.enabled {
            tracing::info!(
                "[MCPServerManager] Skipping disabled server '{}'",
                config.id
            );
            return Ok(());
        }

        // Check before connecting to avoid spawning a process for nothing
        if self.servers.read().await.contains_key(&config.id) {
            return Err(McpOtelError::DuplicateServer(config.id).into());
        }

        let server = MCPServer::connect(&config).await?;
        self.add_client(config.id.clone(), server, config.propagate_context)
            .await
    }

    /// Get a server by ID
    pub async fn get_server(&self, id: &str) -> Option<Arc<dyn ToolClient>> {
        self.servers.read().await.get(id).cloned()
    }

    /// Get all server IDs
    pub async fn server_ids(&self) -> Vec<String> {
        self.servers.read().await.keys().cloned().collect()
    }

    /// Get all tools from all connected servers
    pub async fn get_all_tools(&self) -> Result<Vec<MCPToolInfo>> {
        let mut all_tools = Vec::new();

        let servers = self.servers.read().await;

        for (server_id, server) in servers.iter() {
            match server.list_tools().await {
                Ok(tools) => {
                    tracing::info!(
                        "[MCPServerManager] Got {} tools from server '{}'",
                        tools.len(),
                        server_id
                    );

                    for tool_def in tools {
                        all_tools.push(MCPToolInfo {
                            server_id: server_id.clone(),
                            server: server.clone(),
                            tool_def,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "[MCPServerManager] Failed to get tools from server '{}': {}",
                        server_id,
                        e
                    );
                    // Continue with other servers instead of failing completely
                }
            }
        }

        Ok(all_tools)
    }

    /// Call a tool on a specific server
    ///
    /// Errors from the server are returned as they are.
    pub async fn call_tool(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult> {
        let server = self
            .get_server(server_id)
            .await
            .ok_or_else(|| McpOtelError::UnknownServer(server_id.to_string()))?;

        server.call_tool(tool_name, arguments).await
    }

    /// Run health checks on all servers
    pub async fn health_check_all(&self) -> HashMap<String, Result<()>> {
        let mut results = HashMap::new();
        let servers = self.servers.read().await;

        for (server_id, server) in servers.iter() {
            let result = server.health_check().await;
            results.insert(server_id.clone(), result);
        }

        results
    }

    /// Remove a server, closing its session
    pub async fn remove_server(&self, id: &str) -> Result<()> {
        let server = self
            .servers
            .write()
            .await
            .remove(id)
            .ok_or_else(|| McpOtelError::UnknownServer(id.to_string()))?;

        server.cleanup().await?;

        tracing::debug!("[MCPServerManager] Removed MCP server '{}'", id);

        Ok(())
    }

    /// Close every session and empty the manager
    pub async fn shutdown(&self) {
        let servers: Vec<_> = self.servers.write().await.drain().collect();

        for (server_id, server) in servers {
            if let Err(e) = server.cleanup().await {
                tracing::warn!(
                    "[MCPServerManager] Failed to close server '{}': {}",
                    server_id,
                    e
                );
            }
        }
    }

    /// Get the number of connected servers
    pub async fn server_count(&self) -> usize {
        self.servers.read().await.len()
    }

    /// Check if manager has any servers
    pub async fn is_empty(&self) -> bool {
        self.servers.read().await.is_empty()
    }
}

impl Default for MCPServerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = MCPServerManager::new();
        assert!(manager.is_empty().await);
        assert_eq!(manager.server_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_ids() {
        let manager = MCPServerManager::new();
        assert!(manager.server_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_server_is_skipped() {
        let manager = MCPServerManager::new();
        let mut config = MCPServerConfig::stdio("off", "does-not-exist", Vec::<String>::new());
        config.enabled = false;

        manager.add_server(config).await.unwrap();
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let manager = MCPServerManager::new();
        let err = manager.call_tool("missing", "search", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpOtelError>(),
            Some(McpOtelError::UnknownServer(id)) if id == "missing"
        ));

        assert!(manager.remove_server("missing").await.is_err());
    }
}
