//! Memory system for clara-core
//!
//! Persistent conversation history in SQLite, with automatic importance
//! detection and simple topic grouping.

mod importance;
mod store;
mod types;

pub use importance::importance_score;
pub use store::MemoryStore;
pub use types::{ConversationRecord, ImportantMemory, MemoryStats, SearchHit, Topic};
