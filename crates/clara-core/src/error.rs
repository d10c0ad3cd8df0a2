//! Error types for clara-core

use thiserror::Error;

use crate::llm::BackendKind;

/// Main error type for clara-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    #[error("{backend} rate limit hit")]
    RateLimited { backend: BackendKind },

    #[error("Backend not configured: {0}")]
    BackendUnavailable(BackendKind),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),

    #[error("Model {0} not available")]
    ModelNotAvailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for clara-core
pub type Result<T> = std::result::Result<T, Error>;
