//! ElevenLabs text-to-speech

use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, VoiceError};

/// ElevenLabs voice settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.75,
            similarity_boost: 0.85,
            style: 0.5,
            use_speaker_boost: true,
        }
    }
}

/// TTS configuration
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice_id: String,
    pub settings: VoiceSettings,
}

impl ElevenLabsConfig {
    /// Build from the `[voice]` section; `None` when no key is configured
    pub fn from_voice_config(config: &clara_core::VoiceConfig) -> Option<Self> {
        let api_key = config.elevenlabs_api_key.clone()?;
        Some(Self {
            api_key,
            base_url: config.elevenlabs_base_url.trim_end_matches('/').to_string(),
            model: config.elevenlabs_model.clone(),
            voice_id: config.elevenlabs_voice_id.clone(),
            settings: VoiceSettings::default(),
        })
    }
}

/// ElevenLabs client. The voice can be changed while running.
pub struct ElevenLabsClient {
    client: Client,
    config: ElevenLabsConfig,
    voice_id: RwLock<String>,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        check_voice_id(&config.voice_id)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        info!("ElevenLabs TTS initialized");
        Ok(Self {
            client,
            voice_id: RwLock::new(config.voice_id.clone()),
            config,
        })
    }

    pub async fn voice_id(&self) -> String {
        self.voice_id.read().await.clone()
    }

    pub async fn set_voice_id(&self, voice_id: &str) -> Result<()> {
        check_voice_id(voice_id)?;
        *self.voice_id.write().await = voice_id.to_string();
        info!("Voice changed to: {}", voice_id);
        Ok(())
    }

    /// Synthesize speech from text, returning MP3 bytes
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let voice_id = self.voice_id().await;
        let url = format!("{}/text-to-speech/{}", self.config.base_url, voice_id);

        info!("Synthesizing speech: {} chars using ElevenLabs", text.len());
        debug!("Model: {}, Voice: {}", self.config.model, voice_id);

        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model,
            "voice_settings": self.config.settings,
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::SynthesisFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let audio_data = response.bytes().await.map_err(|e| {
            VoiceError::SynthesisFailed(format!("Failed to read audio data: {}", e))
        })?;

        info!("Synthesis complete: {} bytes", audio_data.len());
        Ok(audio_data.to_vec())
    }
}

fn check_voice_id(voice_id: &str) -> Result<()> {
    if clara_core::is_valid_voice_id(voice_id) {
        Ok(())
    } else {
        Err(VoiceError::ConfigError(format!("Invalid voice id: {:?}", voice_id)))
    }
}
