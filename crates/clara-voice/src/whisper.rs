//! Speech recognition using a Whisper-compatible transcription API

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, VoiceError};

/// Configuration for Whisper client
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// API key
    pub api_key: String,
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model to use (e.g., "whisper-1", "whisper-large-v3")
    pub model: String,
    /// Language hint (ISO 639-1 code, e.g., "en", "ja")
    pub language: Option<String>,
}

impl WhisperConfig {
    /// Build from the `[voice]` section; `None` when no key is configured
    pub fn from_voice_config(config: &clara_core::VoiceConfig) -> Option<Self> {
        let api_key = config.whisper_api_key.clone()?;
        Some(Self {
            api_key,
            base_url: config.whisper_base_url.trim_end_matches('/').to_string(),
            model: config.whisper_model.clone(),
            language: config.whisper_language.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Whisper client for speech recognition
pub struct WhisperClient {
    client: Client,
    config: WhisperConfig,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Transcribe audio bytes. Blank transcripts come back as `None`.
    pub async fn transcribe(&self, audio_data: &[u8], filename: &str) -> Result<Option<String>> {
        let url = format!("{}/audio/transcriptions", self.config.base_url);

        info!("Transcribing audio: {} bytes, filename: {}", audio_data.len(), filename);
        debug!("Using model: {}", self.config.model);

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "json")
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data.to_vec())
                    .file_name(filename.to_string())
                    .mime_str(mime_for(filename))
                    .map_err(|e| VoiceError::DecodingError(format!("Failed to set mime type: {}", e)))?,
            );

        if let Some(ref lang) = self.config.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::RecognitionFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            VoiceError::RecognitionFailed(format!("Failed to parse response: {}", e))
        })?;

        let text = result.text.trim();
        if text.is_empty() {
            info!("Transcription contained no speech");
            return Ok(None);
        }

        info!("Recognized: {}", text);
        Ok(Some(text.to_string()))
    }
}

/// Decode uploaded base64 audio, tolerating a `data:` URL prefix
pub fn decode_base64_audio(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, payload.trim())
        .map_err(|e| VoiceError::DecodingError(format!("Invalid base64: {}", e)))
}

fn mime_for(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WhisperConfig {
        WhisperConfig {
            api_key: "sk-test".to_string(),
            base_url: server.uri(),
            model: "whisper-1".to_string(),
            language: None,
        }
    }

    fn client_for(server: &MockServer) -> WhisperClient {
        WhisperClient::new(config_for(server)).unwrap()
    }

    #[test]
    fn test_whisper_config_from_voice_config() {
        let mut voice = clara_core::VoiceConfig::default();
        assert!(WhisperConfig::from_voice_config(&voice).is_none());

        voice.whisper_api_key = Some("k".to_string());
        voice.whisper_base_url = "http://localhost:9000/v1/".to_string();
        voice.whisper_language = Some("en".to_string());
        let config = WhisperConfig::from_voice_config(&voice).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.model, "whisper-1");
        assert_eq!(config.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("clip.WAV"), "audio/wav");
        assert_eq!(mime_for("clip.webm"), "audio/webm");
        assert_eq!(mime_for("noext"), "audio/mpeg");
    }

    #[test]
    fn test_decode_base64_audio() {
        assert_eq!(decode_base64_audio("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_audio("data:audio/webm;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            decode_base64_audio("not base64!"),
            Err(VoiceError::DecodingError(_))
        ));
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "  hello Clara  " })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).transcribe(b"RIFF", "clip.wav").await.unwrap();
        assert_eq!(text.as_deref(), Some("hello Clara"));
    }

    #[tokio::test]
    async fn test_transcribe_sends_language_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(body_string_contains("name=\"language\"\r\n\r\nja"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "konnichiwa" })))
            .expect(1)
            .mount(&server)
            .await;

        let config = WhisperConfig {
            language: Some("ja".to_string()),
            ..config_for(&server)
        };
        let text = WhisperClient::new(config).unwrap().transcribe(b"RIFF", "clip.wav").await.unwrap();
        assert_eq!(text.as_deref(), Some("konnichiwa"));
    }

    #[tokio::test]
    async fn test_transcribe_blank_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": " " })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).transcribe(b"RIFF", "clip.wav").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transcribe_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client_for(&server).transcribe(b"RIFF", "clip.wav").await.unwrap_err();
        assert!(matches!(err, VoiceError::RecognitionFailed(msg) if msg.contains("bad key")));
    }
}
