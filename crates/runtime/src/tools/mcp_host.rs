//! MCP-backed tool host.
//!
//! Framing, the initialize handshake, and process spawning belong to the
//! rmcp SDK; this host only issues `tools/list` and `tools/call`.

use super::{ToolArguments, ToolError, ToolHost, render_output};
use crate::model::{ToolCall, ToolSpec};
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, Tool},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Error type for spawning and connecting to an MCP server.
pub type McpError = Box<dyn std::error::Error + Send + Sync>;

impl From<Tool> for ToolSpec {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// Tool host backed by a single MCP server child process.
///
/// The tool list is fetched from the server on every request rather than
/// cached at spawn time. Dropping the host stops the server.
pub struct McpToolHost {
    service: RunningService<RoleClient, ()>,
}

impl McpToolHost {
    /// Spawn the MCP server and complete the handshake with it.
    pub async fn spawn(
        command: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, McpError> {
        let command = command.as_ref();
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        debug!(%command, ?args, "spawning MCP server");

        let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
            cmd.args(&args);
        }))?;
        let service = ().serve(transport).await?;
        debug!(%command, "MCP server connected");

        Ok(Self { service })
    }
}

/// Turn an MCP call result into the content handed back to the model.
///
/// A result flagged `is_error` is still content: the model gets to see the
/// failure text rather than the turn aborting.
fn call_output(tool: &str, result: CallToolResult) -> Result<Value, ToolError> {
    let content = serde_json::to_value(&result.content)
        .map_err(|e| ToolError::Execution(format!("serialize result: {e}")))?;

    if result.is_error.unwrap_or(false) {
        warn!(%tool, output = %render_output(&content), "tool reported an error");
    }
    Ok(content)
}

impl ToolHost for McpToolHost {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        let response = self
            .service
            .list_tools(Default::default())
            .await
            .map_err(|e| ToolError::Execution(format!("list tools: {e}")))?;
        debug!(count = response.tools.len(), "listed MCP tools");
        Ok(response.tools.into_iter().map(ToolSpec::from).collect())
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let ToolArguments(arguments) = ToolArguments::try_from(call.input.clone())?;
        info!(tool = %call.name, id = %call.id, "{} is called", call.name);

        let params = CallToolRequestParams {
            name: call.name.clone().into(),
            arguments,
            meta: None,
            task: None,
        };
        let result = self
            .service
            .call_tool(params)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        call_output(&call.name, result)
    }
}
