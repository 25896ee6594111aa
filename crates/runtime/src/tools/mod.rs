//! Tool execution and MCP integration.

mod empty;
pub mod errors;
mod host;
mod mcp_host;
mod types;

pub use empty::EmptyToolHost;
pub use errors::ToolError;
pub use host::ToolHost;
pub use mcp_host::{McpError, McpToolHost};
pub use types::{ToolArguments, render_output};
