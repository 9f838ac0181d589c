//! Language model integration
//!
//! A narrow text-completion interface plus the OpenAI chat-completions client
//! that backs it in production.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a completion backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to language model failed: {0}")]
    Transport(String),

    #[error("OpenAI API error: {0}")]
    Api(String),

    #[error("Malformed completion response: {0}")]
    Malformed(String),
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Prompt plus sampling parameters for one completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text-completion capability.
///
/// Implementations perform exactly one upstream call per `complete`; callers
/// decide whether anything is retried.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
