//! Anthropic Claude client
//!
//! Used for queries that need frontier-level reasoning.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClaudeConfig;
use crate::error::{Error, Result};

use super::{BackendKind, ChatBackend, ContextMessage, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u64,
    temperature: f32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Claude API client
pub struct ClaudeClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u64,
    temperature: f32,
    system_prompt: String,
}

impl ClaudeClient {
    /// Create a new Claude client. Without an API key the client reports itself unavailable.
    pub fn new(config: &ClaudeConfig, system_prompt: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        if config.api_key.is_some() {
            info!("Anthropic client initialized");
        } else {
            warn!("No Anthropic API key found");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system_prompt: system_prompt.into(),
        })
    }

    /// Convert context to Messages API turns. System turns travel in the `system` field.
    fn build_messages<'a>(context: &'a [ContextMessage], message: &'a str) -> Vec<ApiMessage<'a>> {
        context
            .iter()
            .filter(|ctx| ctx.role != Role::System)
            .map(|ctx| ApiMessage {
                role: ctx.role.as_str(),
                content: &ctx.content,
            })
            .chain(std::iter::once(ApiMessage {
                role: "user",
                content: message,
            }))
            .collect()
    }
}

#[async_trait]
impl ChatBackend for ClaudeClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Claude
    }

    async fn model(&self) -> String {
        self.model.clone()
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn chat(&self, message: &str, context: &[ContextMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(Error::BackendUnavailable(BackendKind::Claude))?;

        let url = format!("{}/messages", self.base_url);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: &self.system_prompt,
            messages: Self::build_messages(context, message),
        };

        debug!("Sending request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Claude API rate limit hit");
            return Err(Error::RateLimited {
                backend: BackendKind::Claude,
            });
        }
        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::ClaudeApi(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            Error::ClaudeApi(format!("Failed to parse response: {} - {}", e, body))
        })?;

        info!(
            "Claude API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed
                .usage
                .as_ref()
                .map(|u| u.input_tokens + u.output_tokens)
                .unwrap_or(0)
        );

        parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| Error::ClaudeApi("Response contained no text".to_string()))
    }

    fn fallback_reply(&self, error: &Error) -> String {
        match error {
            Error::RateLimited { .. } => {
                "I need to pace myself - too many complex thoughts at once. Try again in a moment."
            }
            Error::ClaudeApi(_) => "Having trouble accessing my extended capabilities right now.",
            Error::BackendUnavailable(_) => {
                "Claude integration not configured. Add ANTHROPIC_API_KEY to .env"
            }
            _ => "Something went wrong connecting to my extended processing.",
        }
        .to_string()
    }
}
