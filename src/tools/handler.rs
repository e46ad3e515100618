//! Tool handler definition
//!
//! A handler is either blocking or asynchronous. The kind is fixed when the
//! handler is built and decides how the registry scopes trace context around
//! it.

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::propagation::JsonObject;

/// Output of a tool invocation
pub type ToolOutput = Result<Value>;

type BlockingFn = dyn Fn(JsonObject) -> ToolOutput + Send + Sync;
type AsyncFn = dyn Fn(JsonObject) -> BoxFuture<'static, ToolOutput> + Send + Sync;

/// Callable behind a registered tool
#[derive(Clone)]
pub enum ToolHandler {
    /// Runs to completion on the calling thread
    Blocking(Arc<BlockingFn>),
    /// Returns a future that may suspend
    Async(Arc<AsyncFn>),
}

impl ToolHandler {
    /// Handler from a blocking function
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(JsonObject) -> ToolOutput + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }

    /// Handler from an async function
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        Self::Async(Arc::new(move |args| -> BoxFuture<'static, ToolOutput> {
            Box::pin(f(args))
        }))
    }

    /// Whether invocations suspend
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("ToolHandler::Blocking"),
            Self::Async(_) => f.write_str("ToolHandler::Async"),
        }
    }
}

/// Metadata about a registered tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    /// Name of the tool
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the handler is asynchronous
    pub is_async: bool,
}
