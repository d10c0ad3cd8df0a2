//! Memory type definitions for clara-core

use serde::{Deserialize, Serialize};

/// A stored user/assistant exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub user_message: String,
    pub assistant_response: String,
    pub backend: Option<String>,
    pub model: Option<String>,
}

/// A keyword search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub conversation_id: i64,
    pub timestamp: String,
    pub user_message: String,
    pub assistant_response: String,
    /// Importance score, 0.0 when never marked
    pub importance: f64,
}

/// A conversation marked as important
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantMemory {
    pub conversation_id: i64,
    pub timestamp: String,
    pub user_message: String,
    pub assistant_response: String,
    pub importance: f64,
    pub note: Option<String>,
}

/// Aggregate counts over the memory database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_conversations: u64,
    pub important_memories: u64,
    pub days_active: u64,
}

/// A named topic with how many conversations touch it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub last_discussed: Option<String>,
    pub conversation_count: u64,
}
