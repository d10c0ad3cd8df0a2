//! Ollama local model client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::OllamaConfig;
use crate::error::{Error, Result};

use super::{BackendKind, ChatBackend, ContextMessage, ModelCatalog};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: String,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaReply,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for a local Ollama server
pub struct OllamaClient {
    client: Client,
    host: String,
    current_model: RwLock<String>,
    system_prompt: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &OllamaConfig, system_prompt: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            current_model: RwLock::new(config.model.clone()),
            system_prompt: system_prompt.into(),
        })
    }

    async fn fetch_tags(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .client
            .get(&url)
            .timeout(CONNECTION_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::OllamaApi(format!("{} from {}", status, url)));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    async fn model(&self) -> String {
        self.current_model.read().await.clone()
    }

    async fn is_available(&self) -> bool {
        self.test_connection().await
    }

    async fn chat(&self, message: &str, context: &[ContextMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.host);
        let model = self.model().await;

        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(OllamaMessage {
            role: "system",
            content: &self.system_prompt,
        });
        messages.extend(context.iter().map(|ctx| OllamaMessage {
            role: ctx.role.as_str(),
            content: &ctx.content,
        }));
        messages.push(OllamaMessage {
            role: "user",
            content: message,
        });

        debug!("Sending {} messages to Ollama model {}", messages.len(), model);

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Ollama API error: {} - {}", status, body);
            return Err(Error::OllamaApi(format!("{}: {}", status, body)));
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&body).map_err(|e| {
            Error::OllamaApi(format!("Failed to parse response: {} - {}", e, body))
        })?;

        Ok(parsed.message.content)
    }

    fn fallback_reply(&self, _error: &Error) -> String {
        "Having trouble accessing my local processing. Check if Ollama is running.".to_string()
    }
}

#[async_trait]
impl ModelCatalog for OllamaClient {
    async fn list_models(&self) -> Vec<String> {
        match self.fetch_tags().await {
            Ok(models) => models,
            Err(e) => {
                error!("Error listing models: {}", e);
                Vec::new()
            }
        }
    }

    async fn switch_model(&self, model_name: &str) -> Result<()> {
        let available = self.list_models().await;
        if !available.iter().any(|m| m == model_name) {
            warn!("Model {} not available", model_name);
            return Err(Error::ModelNotAvailable(model_name.to_string()));
        }

        *self.current_model.write().await = model_name.to_string();
        info!("Switched to model: {}", model_name);
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        self.fetch_tags().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        let config = OllamaConfig {
            host: server.uri(),
            model: "dolphin-mistral:7b".to_string(),
        };
        OllamaClient::new(&config, "You are Clara.").unwrap()
    }

    async fn mount_tags(server: &MockServer, names: &[&str]) {
        let models: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_chat_sends_system_context_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "dolphin-mistral:7b",
                "stream": false,
                "messages": [
                    { "role": "system", "content": "You are Clara." },
                    { "role": "user", "content": "earlier question" },
                    { "role": "assistant", "content": "earlier answer" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "dolphin-mistral:7b",
                "message": { "role": "assistant", "content": "Hello there." },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let context = vec![
            ContextMessage::user("earlier question"),
            ContextMessage::assistant("earlier answer"),
        ];
        let reply = client.chat("hello", &context).await.unwrap();
        assert_eq!(reply, "Hello there.");
    }

    #[tokio::test]
    async fn test_chat_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat("hello", &[]).await.unwrap_err();
        assert!(matches!(err, Error::OllamaApi(_)));
        assert!(client.fallback_reply(&err).contains("Check if Ollama is running"));
    }

    #[tokio::test]
    async fn test_list_models_and_connection() {
        let server = MockServer::start().await;
        mount_tags(&server, &["dolphin-mistral:7b", "mixtral:8x7b"]).await;

        let client = client_for(&server);
        assert!(client.test_connection().await);
        assert!(client.is_available().await);
        assert_eq!(
            client.list_models().await,
            vec!["dolphin-mistral:7b".to_string(), "mixtral:8x7b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let config = OllamaConfig {
            host: "http://127.0.0.1:9".to_string(),
            model: "dolphin-mistral:7b".to_string(),
        };
        let client = OllamaClient::new(&config, "prompt").unwrap();
        assert!(!client.test_connection().await);
        assert!(client.list_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_switch_model() {
        let server = MockServer::start().await;
        mount_tags(&server, &["dolphin-mistral:7b", "mixtral:8x7b"]).await;

        let client = client_for(&server);
        client.switch_model("mixtral:8x7b").await.unwrap();
        assert_eq!(client.model().await, "mixtral:8x7b");

        let err = client.switch_model("llama3:70b").await.unwrap_err();
        assert!(matches!(err, Error::ModelNotAvailable(ref name) if name == "llama3:70b"));
        assert_eq!(client.model().await, "mixtral:8x7b");
    }
}
