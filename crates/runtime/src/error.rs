use crate::model::ModelError;
use crate::tools::ToolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

pub type Result<T> = std::result::Result<T, Error>;
