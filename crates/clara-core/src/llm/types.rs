//! Shared backend types

use serde::{Deserialize, Serialize};

/// Backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    Claude,
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }

    /// USD per million (input, output) tokens
    pub fn pricing(&self) -> (f64, f64) {
        match self {
            Self::Ollama => (0.0, 0.0),
            Self::Claude => (3.00, 15.00),
            Self::Gemini => (1.25, 5.00),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" | "local" => Ok(Self::Ollama),
            "claude" | "anthropic" => Ok(Self::Claude),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}

/// Speaker of a context message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of conversation context sent to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

impl ContextMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Rough token count: one token per four characters
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

/// Cost estimate for sending a message to a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEstimate {
    pub estimated_tokens: u64,
    /// Formatted as `$0.0000`
    pub estimated_cost: String,
    pub model: String,
}

impl UsageEstimate {
    /// Estimate assuming the reply is about as long as the message
    pub fn for_message(backend: BackendKind, model: impl Into<String>, message: &str) -> Self {
        let tokens = estimate_tokens(message);
        let (input_price, output_price) = backend.pricing();
        let millions = tokens as f64 / 1_000_000.0;
        let cost = millions * input_price + millions * output_price;

        Self {
            estimated_tokens: tokens,
            estimated_cost: format!("${:.4}", cost),
            model: model.into(),
        }
    }
}
