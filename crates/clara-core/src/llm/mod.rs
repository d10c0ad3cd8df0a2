//! LLM backend clients
//!
//! Clara talks to three backends: a local Ollama model and the hosted
//! Claude and Gemini APIs. Each implements [`ChatBackend`]; Ollama also
//! implements [`ModelCatalog`] for runtime model switching.

mod claude;
mod gemini;
mod ollama;
mod types;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use types::*;

use async_trait::async_trait;

use crate::{Error, Result};

/// A chat-capable model backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Model currently in use
    async fn model(&self) -> String;

    /// Whether the backend can take requests right now
    async fn is_available(&self) -> bool;

    /// Send `message` with prior `context` and return the reply text
    async fn chat(&self, message: &str, context: &[ContextMessage]) -> Result<String>;

    /// In-character reply shown to the user when `chat` fails
    fn fallback_reply(&self, error: &Error) -> String;
}

/// Model listing and switching (local backend only)
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Names of installed models; empty when unreachable
    async fn list_models(&self) -> Vec<String>;

    /// Switch the active model, failing if it is not installed
    async fn switch_model(&self, model_name: &str) -> Result<()>;

    /// Whether the model server answers
    async fn test_connection(&self) -> bool;
}
