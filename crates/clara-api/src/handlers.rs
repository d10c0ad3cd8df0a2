//! HTTP API handlers

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clara_core::{
    is_valid_voice_id, BackendKind, ConversationRecord, ImportantMemory, Preference, SearchHit,
    SystemStatus, Topic, UsageEstimate, VoiceInput, VoiceList, VoiceOutcome,
};

use crate::error::{ApiError, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub use_claude: bool,
    #[serde(default)]
    pub use_gemini: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub status: &'static str,
    pub response: String,
    pub backend: BackendKind,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    /// Uploaded audio; the server microphone is used when absent
    pub audio_base64: Option<String>,
    pub filename: Option<String>,
    #[serde(default = "default_true")]
    pub speak: bool,
    /// Listening timeout in seconds, `1..=MAX_LISTEN_TIMEOUT`
    #[serde(default = "default_listen_timeout")]
    pub timeout: u64,
}

impl Default for VoiceRequest {
    fn default() -> Self {
        Self {
            audio_base64: None,
            filename: None,
            speak: true,
            timeout: default_listen_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen_timeout() -> u64 {
    10
}

/// Longest microphone capture a request may ask for, in seconds
pub const MAX_LISTEN_TIMEOUT: u64 = 60;

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}

fn default_recent_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct MarkImportantRequest {
    pub conversation_id: i64,
    #[serde(default = "default_importance")]
    pub importance: f64,
    pub note: Option<String>,
}

fn default_importance() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct LinkTopicRequest {
    pub conversation_id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchModelRequest {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_estimate_backend")]
    pub backend: String,
}

fn default_estimate_backend() -> String {
    "claude".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SetVoiceRequest {
    pub voice_id: String,
}

/// `{status, message}` acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    fn success(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
        })
    }
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Chat with Clara
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(req) = payload.map_err(bad_json)?;
    debug!("Chat request: {:?}", req);

    let message = req
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No message provided".to_string()))?;

    let orchestrator = &state.orchestrator;
    let outcome = if req.use_claude {
        orchestrator.chat(&message, Preference::Claude).await?
    } else if req.use_gemini {
        orchestrator.chat(&message, Preference::Gemini).await?
    } else {
        orchestrator.smart_routing(&message).await?
    };

    info!("Chat response from {} ({})", outcome.backend, outcome.model);

    Ok(Json(ChatResponse {
        status: "success",
        response: outcome.response,
        backend: outcome.backend,
        model: outcome.model,
    }))
}

/// Voice round trip: uploaded audio or the server microphone
pub async fn voice(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VoiceRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => VoiceRequest::default(),
        Err(rejection) => return Err(bad_json(rejection)),
    };

    let input = match req.audio_base64 {
        Some(encoded) => VoiceInput::Audio {
            bytes: clara_voice::decode_base64_audio(&encoded)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            filename: req.filename.unwrap_or_else(|| "audio.webm".to_string()),
        },
        None => {
            if !(1..=MAX_LISTEN_TIMEOUT).contains(&req.timeout) {
                return Err(ApiError::BadRequest(format!(
                    "Timeout must be between 1 and {} seconds",
                    MAX_LISTEN_TIMEOUT
                )));
            }
            VoiceInput::Microphone {
                timeout: Duration::from_secs(req.timeout),
            }
        }
    };

    let body = match state.orchestrator.voice_chat(input, req.speak).await? {
        VoiceOutcome::NoSpeech => serde_json::json!({
            "status": "error",
            "message": "No speech detected",
        }),
        VoiceOutcome::Replied {
            input,
            outcome,
            voice_output,
        } => serde_json::json!({
            "status": "success",
            "input": input,
            "response": outcome.response,
            "backend": outcome.backend,
            "model": outcome.model,
            "voice_output": voice_output,
        }),
    };

    Ok(Json(body))
}

/// Text-to-speech only
pub async fn speak(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(req) = payload.map_err(bad_json)?;
    let text = req
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;

    let spoken = state.orchestrator.speak(&text).await;
    Ok(Json(serde_json::json!({
        "status": if spoken { "success" } else { "error" },
        "spoken": spoken,
    })))
}

/// Recent conversations, oldest first
pub async fn recent_memories(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ConversationRecord>>> {
    let conversations = state.orchestrator.memory().get_recent_conversations(query.limit)?;
    Ok(Json(conversations))
}

pub async fn important_memories(State(state): State<AppState>) -> Result<Json<Vec<ImportantMemory>>> {
    Ok(Json(state.orchestrator.memory().get_important_memories()?))
}

/// Manually flag a conversation as important
pub async fn mark_important(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MarkImportantRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>> {
    let Json(req) = payload.map_err(bad_json)?;
    if !(0.0..=1.0).contains(&req.importance) {
        return Err(ApiError::BadRequest("Importance must be between 0.0 and 1.0".to_string()));
    }

    state
        .orchestrator
        .memory()
        .mark_important(req.conversation_id, req.importance, req.note.as_deref())?;

    Ok(StatusMessage::success(format!(
        "Conversation {} marked important",
        req.conversation_id
    )))
}

pub async fn search_memories(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>> {
    if query.query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let hits = state.orchestrator.memory().search_memories(&query.query, query.limit)?;
    Ok(Json(hits))
}

pub async fn topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>> {
    Ok(Json(state.orchestrator.memory().list_topics()?))
}

/// File a conversation under a topic
pub async fn link_topic(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LinkTopicRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(req) = payload.map_err(bad_json)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("No topic name provided".to_string()));
    }

    let topic_id = state.orchestrator.memory().link_topic(
        req.conversation_id,
        &req.name,
        req.description.as_deref(),
    )?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "topic_id": topic_id,
    })))
}

/// System status
pub async fn status(State(state): State<AppState>) -> Result<Json<SystemStatus>> {
    Ok(Json(state.orchestrator.status().await?))
}

/// Switch the local model
pub async fn switch_model(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SwitchModelRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>> {
    let Json(req) = payload.map_err(bad_json)?;
    let model = req.model.unwrap_or_default();

    state.orchestrator.switch_model(&model).await?;
    Ok(StatusMessage::success(format!("Switched to {}", model)))
}

/// Installed local models
pub async fn list_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let models = state.orchestrator.list_models().await;
    Json(serde_json::json!({ "models": models }))
}

/// Token and cost estimate for a message
pub async fn estimate(
    State(state): State<AppState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<UsageEstimate>> {
    let backend: BackendKind = query.backend.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(state.orchestrator.usage_estimate(&query.message, backend).await))
}

pub async fn list_voices(State(state): State<AppState>) -> Json<VoiceList> {
    Json(state.orchestrator.voice().voices().await)
}

pub async fn set_voice(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SetVoiceRequest>, JsonRejection>,
) -> Result<Json<StatusMessage>> {
    let Json(req) = payload.map_err(bad_json)?;
    if req.voice_id.is_empty() {
        return Err(ApiError::BadRequest("No voice_id provided".to_string()));
    }
    if !is_valid_voice_id(&req.voice_id) {
        return Err(ApiError::BadRequest(format!("Invalid voice_id: {}", req.voice_id)));
    }

    state.orchestrator.voice().set_voice(&req.voice_id).await;
    Ok(StatusMessage::success(format!("Voice changed to {}", req.voice_id)))
}
