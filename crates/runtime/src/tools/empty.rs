//! Empty tool host implementation.

use crate::model::{ToolCall, ToolSpec};
use crate::tools::{ToolError, ToolHost};
use serde_json::Value;

/// A tool host with no tools.
///
/// The model is never offered anything to call, so every turn is a single
/// model invocation.
#[derive(Debug, Default)]
pub struct EmptyToolHost;

impl ToolHost for EmptyToolHost {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(Vec::new())
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        Err(ToolError::NotFound(call.name.clone()))
    }
}
