//! Tool host trait.

use crate::model::{ToolCall, ToolSpec};
use crate::tools::ToolError;
use serde_json::Value;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// This is the boundary between the conversation step and the process that
/// actually runs tools. Listing is not cached: every call may round-trip.
pub trait ToolHost: Send + Sync {
    /// Fetch the tools currently offered, shaped for the model.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolSpec>, ToolError>> + Send;

    /// Execute a tool call and return its raw result content.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<Value, ToolError>> + Send;
}
