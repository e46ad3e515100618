//! Remote tool client capability set
//!
//! Every MCP client in the crate, traced or not, is used through this trait.

use anyhow::Result;
use async_trait::async_trait;
use rmcp::model::{CallToolResult, ServerInfo, Tool};
use std::sync::Arc;

use crate::propagation::JsonObject;

/// Operations a remote tool-invocation client exposes
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Identifier of the server this client talks to
    fn name(&self) -> &str;

    /// List the tools the server offers
    async fn list_tools(&self) -> Result<Vec<Tool>>;

    /// Invoke a tool by name
    ///
    /// `arguments` defaults to an empty object when `None`.
    async fn call_tool(&self, tool_name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult>;

    /// Check the server is reachable
    async fn health_check(&self) -> Result<()> {
        self.list_tools().await.map(|_| ())
    }

    /// Server information returned during initialization, if connected
    async fn server_info(&self) -> Option<ServerInfo> {
        None
    }

    /// Close the session
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: ToolClient + ?Sized> ToolClient for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        (**self).list_tools().await
    }

    async fn call_tool(&self, tool_name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult> {
        (**self).call_tool(tool_name, arguments).await
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }

    async fn server_info(&self) -> Option<ServerInfo> {
        (**self).server_info().await
    }

    async fn cleanup(&self) -> Result<()> {
        (**self).cleanup().await
    }
}
