//! LLM provider backends.
//!
//! Each provider implements [`Backend`](crate::model::Backend) for its API.

mod openai;

pub use openai::{DEFAULT_BASE_URL, OpenAiBackend, OpenAiBackendBuilder};
