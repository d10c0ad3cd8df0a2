//! Error types for clara-voice

use thiserror::Error;

/// clara-voice error type
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Speech recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Audio decoding error: {0}")]
    DecodingError(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<VoiceError> for clara_core::Error {
    fn from(err: VoiceError) -> Self {
        clara_core::Error::Voice(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VoiceError>;
