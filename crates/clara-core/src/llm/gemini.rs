//! Google Gemini client
//!
//! Backup frontier backend when Claude is unavailable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::{BackendKind, ChatBackend, ContextMessage, Role};

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    system_prompt: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, system_prompt: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        if config.api_key.is_some() {
            info!("Gemini client initialized");
        } else {
            warn!("No Google API key found");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            system_prompt: system_prompt.into(),
        })
    }

    /// Build the generateContent body. Assistant turns use the `model` role.
    fn build_request_body(&self, message: &str, context: &[ContextMessage]) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = context
            .iter()
            .filter_map(|ctx| {
                let role = match ctx.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(serde_json::json!({
                    "role": role,
                    "parts": [{ "text": ctx.content }],
                }))
            })
            .collect();

        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": message }],
        }));

        serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": self.system_prompt }],
            },
            "contents": contents,
        })
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
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
            .ok_or(Error::BackendUnavailable(BackendKind::Gemini))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(message, context);

        debug!("Sending request to Gemini API: {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limit hit");
            return Err(Error::RateLimited {
                backend: BackendKind::Gemini,
            });
        }
        if !status.is_success() {
            warn!("Gemini API error: {} - {}", status, text);
            return Err(Error::GeminiApi(format!("{}: {}", status, text)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            Error::GeminiApi(format!("Failed to parse response: {} - {}", e, text))
        })?;

        let reply = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| Error::GeminiApi("Response contained no candidates".to_string()))?;

        Ok(reply)
    }

    fn fallback_reply(&self, error: &Error) -> String {
        match error {
            Error::BackendUnavailable(_) => {
                "Gemini integration not configured. Add GOOGLE_API_KEY to .env".to_string()
            }
            _ => "Having trouble accessing Gemini consciousness right now.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig {
            api_key: Some("g-test".to_string()),
            base_url: server.uri(),
            ..GeminiConfig::default()
        };
        GeminiClient::new(&config, "You are Clara.").unwrap()
    }

    #[test]
    fn test_request_body_roles() {
        let client = GeminiClient::new(&GeminiConfig::default(), "You are Clara.").unwrap();
        let context = vec![
            ContextMessage::system("skip me"),
            ContextMessage::user("q"),
            ContextMessage::assistant("a"),
        ];
        let body = client.build_request_body("next", &context);

        assert_eq!(body["system_instruction"]["parts"][0]["text"], "You are Clara.");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "a");
        assert_eq!(contents[2]["parts"][0]["text"], "next");
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:generateContent"))
            .and(query_param("key", "g-test"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "Hello " }, { "text": "from Gemini." }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).chat("hello", &[]).await.unwrap();
        assert_eq!(reply, "Hello from Gemini.");
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat("hello", &[]).await.unwrap_err();
        assert!(matches!(err, Error::GeminiApi(_)));
        assert_eq!(
            client.fallback_reply(&err),
            "Having trouble accessing Gemini consciousness right now."
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).chat("hello", &[]).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited { backend: BackendKind::Gemini }));
    }
}
