//! Toolchat runtime: conversation turns over a model backend and MCP tools.
//!
//! # Overview
//!
//! - **Session**: owns the message history, the model backend, and the tool
//!   host. Each call to [`Session::chat`] runs one turn.
//! - **Backend**: a trait abstracting LLM providers; [`OpenAiBackend`] speaks
//!   the Chat Completions API.
//! - **ToolHost**: a trait abstracting where tools come from;
//!   [`McpToolHost`] spawns an MCP server and forwards calls to it.
//!
//! A turn lists the tools, prompts the model, runs at most one requested
//! tool, and prompts the model again with the tool's result.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{McpToolHost, OpenAiBackend, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let backend = OpenAiBackend::builder("sk-...", "gpt-4o").build();
//! let tools = McpToolHost::spawn("node", ["./weather-server.js"]).await?;
//!
//! let mut session = Session::new(backend, tools, "You are an assistant.");
//! let turn = session.chat("What's the weather in Tokyo?").await?;
//! println!("{}", turn.reply);
//! # Ok(())
//! # }
//! ```

pub mod conversation;
mod error;
pub mod model;
pub mod providers;
mod session;
pub mod tools;

pub use conversation::Turn;
pub use error::{Error, Result};
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Role, ToolCall, ToolSpec, Usage,
};
pub use providers::{OpenAiBackend, OpenAiBackendBuilder};
pub use session::{Session, SessionId};
pub use tools::{EmptyToolHost, McpError, McpToolHost, ToolError, ToolHost};
