//! Query routing heuristics and memory context assembly

use crate::llm::ContextMessage;
use crate::memory::{ConversationRecord, SearchHit};

/// Keywords that suggest a query needs a frontier model
const COMPLEX_INDICATORS: &[&str] = &[
    "analyze",
    "complex",
    "detailed",
    "explain in depth",
    "strategy",
    "comprehensive",
    "evaluate",
    "compare",
    "create",
    "write",
    "design",
    "plan",
    "research",
    "critique",
    "review",
    "assess",
    "synthesize",
];

/// Messages longer than this (in characters) always go to a frontier model
pub const LONG_MESSAGE_CHARS: usize = 500;

/// Maximum number of context messages handed to a backend
pub const MAX_CONTEXT_MESSAGES: usize = 20;

/// Recent exchanges included in every context
pub const RECENT_CONVERSATIONS: usize = 5;

/// Keywords searched in memory per message
pub const MAX_KEYWORDS: usize = 3;

/// Memory hits fetched per keyword
pub const HITS_PER_KEYWORD: usize = 2;

/// Only hits scored above this join the context
pub const CONTEXT_IMPORTANCE_THRESHOLD: f64 = 0.5;

/// Whether `message` looks complex enough for Claude or Gemini
pub fn needs_frontier(message: &str) -> bool {
    let lowered = message.to_lowercase();
    COMPLEX_INDICATORS.iter().any(|indicator| lowered.contains(indicator))
        || message.chars().count() > LONG_MESSAGE_CHARS
}

/// Words longer than four characters, first three only
pub fn extract_keywords(message: &str) -> Vec<&str> {
    message
        .split_whitespace()
        .filter(|word| word.chars().count() > 4)
        .take(MAX_KEYWORDS)
        .collect()
}

/// Build the context window from recent exchanges and important memory hits.
///
/// Recent exchanges keep chronological order. Each important hit is placed at
/// the very front, so later hits precede earlier ones. Only the last
/// [`MAX_CONTEXT_MESSAGES`] messages are kept.
pub fn assemble_context(recent: &[ConversationRecord], hits: &[SearchHit]) -> Vec<ContextMessage> {
    let mut context = Vec::with_capacity(recent.len() * 2 + hits.len() * 2);

    for conversation in recent {
        context.push(ContextMessage::user(&conversation.user_message));
        context.push(ContextMessage::assistant(&conversation.assistant_response));
    }

    for hit in hits.iter().filter(|h| h.importance > CONTEXT_IMPORTANCE_THRESHOLD) {
        context.insert(0, ContextMessage::user(&hit.user_message));
        context.insert(1, ContextMessage::assistant(&hit.assistant_response));
    }

    let excess = context.len().saturating_sub(MAX_CONTEXT_MESSAGES);
    context.drain(..excess);
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn record(id: i64, user: &str, reply: &str) -> ConversationRecord {
        ConversationRecord {
            id,
            timestamp: format!("2024-10-01T00:00:{:02}.000000Z", id),
            user_message: user.to_string(),
            assistant_response: reply.to_string(),
            backend: None,
            model: None,
        }
    }

    fn hit(user: &str, reply: &str, importance: f64) -> SearchHit {
        SearchHit {
            conversation_id: 0,
            timestamp: String::new(),
            user_message: user.to_string(),
            assistant_response: reply.to_string(),
            importance,
        }
    }

    #[test]
    fn test_needs_frontier_keywords() {
        assert!(needs_frontier("Can you ANALYZE this poem?"));
        assert!(needs_frontier("please explain in depth how TCP works"));
        assert!(needs_frontier("help me plan a trip"));
        assert!(!needs_frontier("hi, how are you?"));
    }

    #[test]
    fn test_needs_frontier_length() {
        assert!(!needs_frontier(&"a ".repeat(250)));
        assert!(needs_frontier(&"a ".repeat(251)));
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("tell me about quantum physics and relativity theory today"),
            vec!["about", "quantum", "physics"]
        );
        assert!(extract_keywords("hi there you").is_empty());
    }

    #[test]
    fn test_assemble_context_recent_only() {
        let recent = vec![record(1, "q1", "a1"), record(2, "q2", "a2")];
        let context = assemble_context(&recent, &[]);

        assert_eq!(context.len(), 4);
        assert_eq!(context[0], ContextMessage::user("q1"));
        assert_eq!(context[1], ContextMessage::assistant("a1"));
        assert_eq!(context[3].role, Role::Assistant);
        assert_eq!(context[3].content, "a2");
    }

    #[test]
    fn test_assemble_context_important_hits_prepended() {
        let recent = vec![record(1, "q1", "a1")];
        let hits = vec![
            hit("first hit", "r1", 1.0),
            hit("unimportant", "r2", 0.5),
            hit("second hit", "r3", 0.8),
        ];
        let context = assemble_context(&recent, &hits);

        assert_eq!(context.len(), 6);
        assert_eq!(context[0].content, "second hit");
        assert_eq!(context[1].content, "r3");
        assert_eq!(context[2].content, "first hit");
        assert_eq!(context[4].content, "q1");
    }

    #[test]
    fn test_assemble_context_truncates_oldest() {
        let recent: Vec<_> = (0..12).map(|i| record(i, &format!("q{}", i), &format!("a{}", i))).collect();
        let context = assemble_context(&recent, &[]);

        assert_eq!(context.len(), MAX_CONTEXT_MESSAGES);
        assert_eq!(context[0].content, "q2");
        assert_eq!(context[19].content, "a11");
    }
}
