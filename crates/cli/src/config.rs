//! Configuration loading from toolchat.toml and the environment.

use runtime::providers::DEFAULT_BASE_URL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "toolchat.toml";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an assistant. Please support users by following their instructions.";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Model backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// How to launch the MCP tool server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Instruction that seeds every session.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Model backend configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Usually supplied through `OPENAI_API_KEY` instead.
    pub api_key: Option<String>,

    pub max_tokens: Option<u32>,
}

/// MCP server launch settings.
#[derive(Debug, Deserialize, Default)]
pub struct ServerConfig {
    /// Executable to spawn. Empty means unset; spawning will fail.
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            max_tokens: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            server: ServerConfig::default(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load an explicitly requested file, or `toolchat.toml` if it exists,
    /// or fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Overlay environment settings on top of the file values.
    ///
    /// `COMMAND_PATH` and `DIR_PATH` select the tool server command and its
    /// single argument; `OPENAI_*` variables configure the backend.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(command) = var("COMMAND_PATH") {
            self.server.command = command;
        }
        if let Some(dir) = var("DIR_PATH") {
            self.server.args = vec![dir];
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.backend.model = model;
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.backend.base_url = url;
        }
    }

    /// The API key, which must be set by the file or the environment.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.backend
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("API key not configured: set OPENAI_API_KEY or backend.api_key")]
    MissingApiKey,
}
