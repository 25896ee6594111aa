//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The MCP tool server could not be spawned or did not complete the
    /// handshake.
    #[error("failed to connect to tool server '{command}': {reason}")]
    Connect { command: String, reason: String },

    /// An error occurred while running a turn.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An I/O error occurred on stdin or stdout.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
