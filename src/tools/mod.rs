//! Server-side tool dispatch
//!
//! This module provides the ToolHandler type and the ToolRegistry that runs
//! each tool inside the trace context its caller sent in `_meta`.

mod handler;
mod registry;

pub use handler::{ToolHandler, ToolInfo, ToolOutput};
pub use registry::ToolRegistry;
