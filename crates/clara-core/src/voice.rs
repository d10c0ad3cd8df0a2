//! Voice channel abstraction
//!
//! The orchestrator only sees this trait; `clara-voice` provides the
//! real implementation backed by Whisper, ElevenLabs and system audio.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// A selectable TTS voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
}

/// Voices grouped by provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceList {
    pub system: Vec<VoiceInfo>,
    pub elevenlabs: Vec<VoiceInfo>,
}

/// Hosted voice ids are opaque alphanumeric tokens that end up in a URL path
pub fn is_valid_voice_id(voice_id: &str) -> bool {
    !voice_id.is_empty() && voice_id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Speech input and output
#[async_trait]
pub trait VoiceChannel: Send + Sync {
    /// Record from the microphone for up to `timeout` and transcribe.
    ///
    /// `None` means nothing intelligible was heard.
    async fn listen(&self, timeout: Duration) -> Option<String>;

    /// Transcribe uploaded audio. `Ok(None)` means no speech was found.
    async fn transcribe(&self, audio: &[u8], filename: &str) -> Result<Option<String>>;

    /// Speak `text` with the best available engine; returns whether anything was spoken
    async fn speak(&self, text: &str) -> bool;

    /// `"elevenlabs"` or `"system"`
    fn tts_provider(&self) -> &'static str;

    /// Whether high-quality hosted TTS is configured
    fn tts_available(&self) -> bool;

    /// Whether speech recognition is configured
    fn stt_available(&self) -> bool;

    /// Available voices
    async fn voices(&self) -> VoiceList;

    /// Change the hosted TTS voice. Ids failing `is_valid_voice_id` are ignored.
    async fn set_voice(&self, voice_id: &str);
}
