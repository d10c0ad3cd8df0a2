//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    chat, estimate, health, important_memories, link_topic, list_models, list_voices,
    mark_important, recent_memories, search_memories, set_voice, speak, status, switch_model,
    topics, voice,
};
use crate::page::index;
use crate::server::AppState;

/// Unauthenticated routes
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// `/api/*` routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Conversation
        .route("/api/chat", post(chat))
        .route("/api/voice", post(voice))
        .route("/api/speak", post(speak))
        // Memory
        .route("/api/memory/recent", get(recent_memories))
        .route("/api/memory/important", get(important_memories).post(mark_important))
        .route("/api/memory/search", get(search_memories))
        .route("/api/memory/topics", get(topics).post(link_topic))
        // System
        .route("/api/status", get(status))
        .route("/api/switch_model", post(switch_model))
        .route("/api/models", get(list_models))
        .route("/api/estimate", get(estimate))
        .route("/api/voices", get(list_voices).post(set_voice))
}
