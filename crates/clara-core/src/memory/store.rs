//! Memory storage implementation using SQLite

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::memory::importance::{IMPORTANCE_THRESHOLD, importance_score};
use crate::memory::{ConversationRecord, ImportantMemory, MemoryStats, SearchHit, Topic};
use crate::{Error, Result};

/// SQLite-based conversation memory.
///
/// The connection sits behind a mutex so the store can be shared across
/// request handlers.
pub struct MemoryStore {
    conn: Mutex<Connection>,
}

impl MemoryStore {
    /// Open (or create) the memory database at `db_path`
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening memory database at: {}", db_path);
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        info!("Memory database initialized");
        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("memory database lock poisoned".to_string()))
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                user_message TEXT NOT NULL,
                assistant_response TEXT NOT NULL,
                backend TEXT,
                model TEXT,
                content_hash TEXT,
                metadata TEXT
            );

            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                description TEXT,
                created_at TEXT,
                last_discussed TEXT
            );

            CREATE TABLE IF NOT EXISTS conversation_topics (
                conversation_id INTEGER,
                topic_id INTEGER,
                FOREIGN KEY (conversation_id) REFERENCES conversations (id),
                FOREIGN KEY (topic_id) REFERENCES topics (id)
            );

            CREATE TABLE IF NOT EXISTS important_memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER,
                importance_score REAL,
                note TEXT,
                created_at TEXT,
                FOREIGN KEY (conversation_id) REFERENCES conversations (id)
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp);
            CREATE INDEX IF NOT EXISTS idx_important_conversation ON important_memories(conversation_id);",
        )?;
        Ok(())
    }

    /// Store an exchange and auto-mark it if the user message looks important.
    ///
    /// Returns the new conversation id.
    pub fn store_conversation(
        &self,
        user_message: &str,
        assistant_response: &str,
        backend: Option<&str>,
        model: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        self.store_conversation_at(
            Utc::now(),
            user_message,
            assistant_response,
            backend,
            model,
            metadata,
        )
    }

    pub(crate) fn store_conversation_at(
        &self,
        at: DateTime<Utc>,
        user_message: &str,
        assistant_response: &str,
        backend: Option<&str>,
        model: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        let content_hash = content_hash(user_message, assistant_response);
        let metadata_json = match metadata {
            Some(value) => serde_json::to_string(value)?,
            None => "{}".to_string(),
        };

        let conversation_id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO conversations
                 (timestamp, user_message, assistant_response, backend, model, content_hash, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    format_timestamp(at),
                    user_message,
                    assistant_response,
                    backend,
                    model,
                    content_hash,
                    metadata_json,
                ],
            )?;
            conn.last_insert_rowid()
        };

        debug!("Stored conversation {}", conversation_id);

        let score = importance_score(user_message);
        if score > IMPORTANCE_THRESHOLD {
            self.mark_important(conversation_id, score, None)?;
            debug!("Conversation {} auto-marked important ({})", conversation_id, score);
        }

        Ok(conversation_id)
    }

    /// Mark a conversation as important
    pub fn mark_important(&self, conversation_id: i64, importance: f64, note: Option<&str>) -> Result<()> {
        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
            params![conversation_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::ConversationNotFound(conversation_id));
        }

        conn.execute(
            "INSERT INTO important_memories (conversation_id, importance_score, note, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, importance, note, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Most recent `limit` conversations, oldest first
    pub fn get_recent_conversations(&self, limit: usize) -> Result<Vec<ConversationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, user_message, assistant_response, backend, model
             FROM conversations
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let mut conversations = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ConversationRecord {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user_message: row.get(2)?,
                    assistant_response: row.get(3)?,
                    backend: row.get(4)?,
                    model: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        conversations.reverse();
        Ok(conversations)
    }

    /// Substring search over both sides of each exchange, most important first
    pub fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.timestamp, c.user_message, c.assistant_response, im.importance_score
             FROM conversations c
             LEFT JOIN important_memories im ON c.id = im.conversation_id
             WHERE c.user_message LIKE ?1 OR c.assistant_response LIKE ?1
             ORDER BY im.importance_score DESC NULLS LAST, c.timestamp DESC
             LIMIT ?2",
        )?;

        let pattern = format!("%{}%", query);
        let hits = stmt
            .query_map(params![pattern, limit as i64], |row| {
                let importance: Option<f64> = row.get(4)?;
                Ok(SearchHit {
                    conversation_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user_message: row.get(2)?,
                    assistant_response: row.get(3)?,
                    importance: importance.unwrap_or(0.0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Found {} memories matching query: {}", hits.len(), query);
        Ok(hits)
    }

    /// All important memories, highest score first
    pub fn get_important_memories(&self) -> Result<Vec<ImportantMemory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.timestamp, c.user_message, c.assistant_response,
                    im.importance_score, im.note
             FROM important_memories im
             JOIN conversations c ON im.conversation_id = c.id
             ORDER BY im.importance_score DESC, im.id ASC",
        )?;

        let memories = stmt
            .query_map([], |row| {
                Ok(ImportantMemory {
                    conversation_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user_message: row.get(2)?,
                    assistant_response: row.get(3)?,
                    importance: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                    note: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(memories)
    }

    /// Counts of conversations, important memories and distinct active days
    pub fn get_statistics(&self) -> Result<MemoryStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        Ok(MemoryStats {
            total_conversations: count("SELECT COUNT(*) FROM conversations")?,
            important_memories: count("SELECT COUNT(*) FROM important_memories")?,
            days_active: count("SELECT COUNT(DISTINCT DATE(timestamp)) FROM conversations")?,
        })
    }

    /// Attach a conversation to a named topic, creating the topic on first use.
    ///
    /// Returns the topic id.
    pub fn link_topic(&self, conversation_id: i64, name: &str, description: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Other("Topic name must not be empty".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = format_timestamp(Utc::now());

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
            params![conversation_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::ConversationNotFound(conversation_id));
        }

        tx.execute(
            "INSERT INTO topics (name, description, created_at, last_discussed)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET
                last_discussed = excluded.last_discussed,
                description = COALESCE(excluded.description, topics.description)",
            params![name, description, now],
        )?;

        let topic_id: i64 = tx.query_row(
            "SELECT id FROM topics WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        let linked: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM conversation_topics WHERE conversation_id = ?1 AND topic_id = ?2",
                params![conversation_id, topic_id],
                |row| row.get(0),
            )
            .optional()?;
        if linked.is_none() {
            tx.execute(
                "INSERT INTO conversation_topics (conversation_id, topic_id) VALUES (?1, ?2)",
                params![conversation_id, topic_id],
            )?;
        }

        tx.commit()?;
        Ok(topic_id)
    }

    /// All topics, most recently discussed first
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.description, t.created_at, t.last_discussed,
                    COUNT(ct.conversation_id)
             FROM topics t
             LEFT JOIN conversation_topics ct ON ct.topic_id = t.id
             GROUP BY t.id
             ORDER BY t.last_discussed DESC, t.id DESC",
        )?;

        let topics = stmt
            .query_map([], topic_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(topics)
    }
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    let count: i64 = row.get(5)?;
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        last_discussed: row.get(4)?,
        conversation_count: count as u64,
    })
}

/// Fixed-width UTC timestamp so text ordering matches time ordering
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fingerprint of an exchange, kept for later deduplication or embedding lookups
fn content_hash(user_message: &str, assistant_response: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_message.as_bytes());
    hasher.update(assistant_response.as_bytes());
    hex::encode(hasher.finalize())
}
