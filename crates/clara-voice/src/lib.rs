//! clara-voice: speech input and output for Clara
//!
//! This crate implements [`clara_core::VoiceChannel`] on top of:
//!
//! - **Speech Recognition**: a Whisper-compatible transcription API, fed either
//!   by uploaded audio or by a recorder command (`arecord`, `sox`, ...)
//! - **Text-to-Speech**: ElevenLabs, falling back to a system TTS command
//!   (`espeak`, `say`, ...)
//! - **Playback**: a player command for synthesised audio
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clara_core::{Config, VoiceChannel};
//! use clara_voice::VoiceInterface;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let voice = VoiceInterface::from_config(&config.voice)?;
//!
//!     voice.speak("Hello, I'm Clara.").await;
//!     if let Some(text) = voice.listen(std::time::Duration::from_secs(5)).await {
//!         println!("Heard: {}", text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod interface;
pub mod system;
pub mod tts;
pub mod whisper;

pub use error::{Result, VoiceError};
pub use interface::VoiceInterface;
pub use system::{render_command, SystemAudio};
pub use tts::{ElevenLabsClient, ElevenLabsConfig, VoiceSettings};
pub use whisper::{decode_base64_audio, WhisperClient, WhisperConfig};
