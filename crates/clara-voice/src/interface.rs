//! Voice interface: the `VoiceChannel` the orchestrator talks to

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use clara_core::{VoiceChannel, VoiceConfig, VoiceInfo, VoiceList};
use tracing::{error, info, warn};

use crate::error::{Result, VoiceError};
use crate::system::SystemAudio;
use crate::tts::{ElevenLabsClient, ElevenLabsConfig};
use crate::whisper::{WhisperClient, WhisperConfig};

/// Voices offered when ElevenLabs is configured
const ELEVENLABS_VOICES: &[(&str, &str)] = &[
    ("EXAVITQu4vr4xnSDxMaL", "Bella"),
    ("MF3mGyEYCl7XYWbV9V6O", "Elli"),
    ("XB0fDUnXU5powFXDhCwa", "Charlotte"),
];

/// Speech in and out: Whisper for recognition, ElevenLabs with a system TTS
/// fallback for synthesis
pub struct VoiceInterface {
    whisper: Option<WhisperClient>,
    elevenlabs: Option<ElevenLabsClient>,
    system: SystemAudio,
}

impl VoiceInterface {
    pub fn new(
        whisper: Option<WhisperClient>,
        elevenlabs: Option<ElevenLabsClient>,
        system: SystemAudio,
    ) -> Self {
        Self {
            whisper,
            elevenlabs,
            system,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        let elevenlabs = match ElevenLabsConfig::from_voice_config(config) {
            Some(tts) => Some(ElevenLabsClient::new(tts)?),
            None => {
                warn!("No ElevenLabs API key - using system TTS");
                None
            }
        };

        let whisper = match WhisperConfig::from_voice_config(config) {
            Some(stt) => Some(WhisperClient::new(stt)?),
            None => {
                warn!("No Whisper API key - speech recognition disabled");
                None
            }
        };

        Ok(Self::new(whisper, elevenlabs, SystemAudio::from_voice_config(config)))
    }

    /// Synthesise with ElevenLabs and play through the system player
    async fn speak_elevenlabs(&self, client: &ElevenLabsClient, text: &str) -> Result<()> {
        let audio = client.synthesize(text).await?;

        let mut file = tempfile::Builder::new()
            .prefix("clara-tts-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(&audio)?;
        file.flush()?;

        self.system.play(file.path()).await
    }

    async fn speak_system(&self, text: &str) -> bool {
        match self.system.speak(text).await {
            Ok(()) => true,
            Err(e) => {
                error!("System TTS error: {}", e);
                false
            }
        }
    }

    async fn record_and_transcribe(&self, whisper: &WhisperClient, timeout: Duration) -> Result<Option<String>> {
        let file = tempfile::Builder::new()
            .prefix("clara-mic-")
            .suffix(".wav")
            .tempfile()?;

        info!("Listening...");
        self.system.record(timeout, file.path()).await?;

        let audio = tokio::fs::read(file.path()).await?;
        if audio.is_empty() {
            return Err(VoiceError::RecognitionFailed("Recorder produced no audio".to_string()));
        }

        whisper.transcribe(&audio, "recording.wav").await
    }
}

#[async_trait]
impl VoiceChannel for VoiceInterface {
    async fn listen(&self, timeout: Duration) -> Option<String> {
        let Some(whisper) = &self.whisper else {
            warn!("Speech recognition not configured");
            return None;
        };

        match self.record_and_transcribe(whisper, timeout).await {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                info!("Listening timeout - no speech detected");
                None
            }
            Err(e) => {
                error!("Microphone error: {}", e);
                None
            }
        }
    }

    async fn transcribe(&self, audio: &[u8], filename: &str) -> clara_core::Result<Option<String>> {
        let whisper = self
            .whisper
            .as_ref()
            .ok_or_else(|| VoiceError::ConfigError("Speech recognition not configured".to_string()))?;
        Ok(whisper.transcribe(audio, filename).await?)
    }

    async fn speak(&self, text: &str) -> bool {
        if let Some(client) = &self.elevenlabs {
            match self.speak_elevenlabs(client, text).await {
                Ok(()) => return true,
                Err(e) => error!("ElevenLabs TTS error: {}", e),
            }
        }
        self.speak_system(text).await
    }

    fn tts_provider(&self) -> &'static str {
        if self.elevenlabs.is_some() { "elevenlabs" } else { "system" }
    }

    fn tts_available(&self) -> bool {
        self.elevenlabs.is_some()
    }

    fn stt_available(&self) -> bool {
        self.whisper.is_some()
    }

    async fn voices(&self) -> VoiceList {
        let system = vec![VoiceInfo {
            id: "default".to_string(),
            name: self.system.speak_program().to_string(),
        }];

        let elevenlabs = if self.elevenlabs.is_some() {
            ELEVENLABS_VOICES
                .iter()
                .map(|(id, name)| VoiceInfo {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        VoiceList { system, elevenlabs }
    }

    async fn set_voice(&self, voice_id: &str) {
        match &self.elevenlabs {
            Some(client) => {
                if let Err(e) = client.set_voice_id(voice_id).await {
                    warn!("Voice change rejected: {}", e);
                }
            }
            None => warn!("Voice change ignored, ElevenLabs not configured: {}", voice_id),
        }
    }
}
