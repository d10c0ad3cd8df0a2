//! clara-core: Clara AI companion core library
//!
//! Backend clients (Ollama, Claude, Gemini), SQLite conversation memory,
//! routing heuristics and the orchestrator that ties them together.

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod routing;
pub mod voice;

pub use config::{
    ClaudeConfig, Config, GeminiConfig, MemoryConfig, OllamaConfig, ServerConfig, VoiceConfig,
};
pub use error::{Error, Result};
pub use llm::{
    BackendKind, ChatBackend, ClaudeClient, ContextMessage, GeminiClient, ModelCatalog,
    OllamaClient, Role, UsageEstimate,
};
pub use memory::{ConversationRecord, ImportantMemory, MemoryStats, MemoryStore, SearchHit, Topic};
pub use orchestrator::{
    ChatOutcome, Orchestrator, Preference, SystemStatus, VoiceInput, VoiceOutcome,
};
pub use voice::{is_valid_voice_id, VoiceChannel, VoiceInfo, VoiceList};
