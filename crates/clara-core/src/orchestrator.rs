//! Orchestrator: routes chat between the local model and the frontier
//! backends, feeds them memory context and records every exchange.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::llm::{
    BackendKind, ChatBackend, ClaudeClient, ContextMessage, GeminiClient, ModelCatalog,
    OllamaClient, UsageEstimate,
};
use crate::memory::{MemoryStats, MemoryStore, SearchHit};
use crate::routing::{self, HITS_PER_KEYWORD, RECENT_CONVERSATIONS};
use crate::voice::VoiceChannel;
use crate::Result;

/// Which backend the caller would like
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preference {
    /// Local model, falling back to a frontier backend when it is down
    #[default]
    Auto,
    /// Claude if available, otherwise the `Auto` chain
    Claude,
    /// Gemini if available, otherwise the `Auto` chain
    Gemini,
    /// Always the local model
    Local,
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub backend: BackendKind,
    pub model: String,
    /// False when the backend failed and `response` is a fallback apology
    pub stored: bool,
}

/// Where spoken input comes from
#[derive(Debug, Clone)]
pub enum VoiceInput {
    /// Record from the server's microphone
    Microphone { timeout: Duration },
    /// Audio uploaded by the client
    Audio { bytes: Vec<u8>, filename: String },
}

/// Result of a voice turn
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    NoSpeech,
    Replied {
        input: String,
        outcome: ChatOutcome,
        voice_output: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub backends: BackendsStatus,
    pub memory: MemoryStats,
    pub voice: VoiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendsStatus {
    pub ollama: LocalStatus,
    pub claude: RemoteStatus,
    pub gemini: RemoteStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalStatus {
    pub connected: bool,
    pub model: String,
    pub models_available: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteStatus {
    pub available: bool,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceStatus {
    pub tts_available: bool,
    pub tts_provider: &'static str,
    pub stt_available: bool,
}

/// Coordinates backends, memory and voice
pub struct Orchestrator {
    ollama: Arc<dyn ChatBackend>,
    catalog: Arc<dyn ModelCatalog>,
    claude: Arc<dyn ChatBackend>,
    gemini: Arc<dyn ChatBackend>,
    memory: Arc<MemoryStore>,
    voice: Arc<dyn VoiceChannel>,
}

impl Orchestrator {
    /// Build all backends from configuration
    pub fn new(config: &Config, memory: Arc<MemoryStore>, voice: Arc<dyn VoiceChannel>) -> Result<Self> {
        let system_prompt = config.system_prompt();

        let ollama = Arc::new(OllamaClient::new(&config.ollama, system_prompt.clone())?);
        let claude = Arc::new(ClaudeClient::new(&config.claude, system_prompt.clone())?);
        let gemini = Arc::new(GeminiClient::new(&config.gemini, system_prompt)?);

        info!("Clara orchestrator initialized");
        Ok(Self::from_parts(ollama, claude, gemini, memory, voice))
    }

    /// Assemble from already-built parts
    pub fn from_parts<L>(
        ollama: Arc<L>,
        claude: Arc<dyn ChatBackend>,
        gemini: Arc<dyn ChatBackend>,
        memory: Arc<MemoryStore>,
        voice: Arc<dyn VoiceChannel>,
    ) -> Self
    where
        L: ChatBackend + ModelCatalog + 'static,
    {
        Self {
            ollama: ollama.clone(),
            catalog: ollama,
            claude,
            gemini,
            memory,
            voice,
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn voice(&self) -> &Arc<dyn VoiceChannel> {
        &self.voice
    }

    fn backend(&self, kind: BackendKind) -> &Arc<dyn ChatBackend> {
        match kind {
            BackendKind::Ollama => &self.ollama,
            BackendKind::Claude => &self.claude,
            BackendKind::Gemini => &self.gemini,
        }
    }

    /// Recent exchanges plus important memories matching keywords of `message`
    pub fn relevant_context(&self, message: &str) -> Result<Vec<ContextMessage>> {
        let recent = self.memory.get_recent_conversations(RECENT_CONVERSATIONS)?;

        let mut hits: Vec<SearchHit> = Vec::new();
        for keyword in routing::extract_keywords(message) {
            hits.extend(self.memory.search_memories(keyword, HITS_PER_KEYWORD)?);
        }

        Ok(routing::assemble_context(&recent, &hits))
    }

    /// Pick a backend for `preference`, honouring availability
    pub async fn select_backend(&self, preference: Preference) -> BackendKind {
        if preference == Preference::Local {
            return BackendKind::Ollama;
        }

        let claude_available = self.claude.is_available().await;
        let gemini_available = self.gemini.is_available().await;

        if preference == Preference::Claude && claude_available {
            return BackendKind::Claude;
        }
        if preference == Preference::Gemini && gemini_available {
            return BackendKind::Gemini;
        }

        if (claude_available || gemini_available) && !self.ollama.is_available().await {
            if claude_available {
                warn!("Ollama unreachable, falling back to Claude");
                return BackendKind::Claude;
            }
            warn!("Ollama unreachable, falling back to Gemini");
            return BackendKind::Gemini;
        }

        BackendKind::Ollama
    }

    /// Send `message` to the backend chosen for `preference` and record the exchange
    pub async fn chat(&self, message: &str, preference: Preference) -> Result<ChatOutcome> {
        let context = self.relevant_context(message)?;
        let kind = self.select_backend(preference).await;
        let backend = self.backend(kind);
        let model = backend.model().await;

        match backend.chat(message, &context).await {
            Ok(response) => {
                self.memory.store_conversation(
                    message,
                    &response,
                    Some(kind.as_str()),
                    Some(model.as_str()),
                    None,
                )?;
                Ok(ChatOutcome {
                    response,
                    backend: kind,
                    model,
                    stored: true,
                })
            }
            Err(e) => {
                error!("{} chat error: {}", kind, e);
                Ok(ChatOutcome {
                    response: backend.fallback_reply(&e),
                    backend: kind,
                    model,
                    stored: false,
                })
            }
        }
    }

    /// Route by query complexity: frontier backends for complex or long
    /// messages, the local model otherwise
    pub async fn smart_routing(&self, message: &str) -> Result<ChatOutcome> {
        if routing::needs_frontier(message) {
            if self.claude.is_available().await {
                info!("Routing to Claude for complex query");
                return self.chat(message, Preference::Claude).await;
            }
            if self.gemini.is_available().await {
                info!("Routing to Gemini as Claude unavailable");
                return self.chat(message, Preference::Gemini).await;
            }
        }

        self.chat(message, Preference::Auto).await
    }

    /// Listen (or transcribe an upload), answer, and optionally speak the answer
    pub async fn voice_chat(&self, input: VoiceInput, speak_reply: bool) -> Result<VoiceOutcome> {
        let text = match input {
            VoiceInput::Microphone { timeout } => {
                info!("Listening for voice input...");
                self.voice.listen(timeout).await
            }
            VoiceInput::Audio { bytes, filename } => self.voice.transcribe(&bytes, &filename).await?,
        };

        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(VoiceOutcome::NoSpeech);
        };

        let outcome = self.smart_routing(&text).await?;

        if speak_reply && !self.voice.speak(&outcome.response).await {
            warn!("TTS failed");
        }

        Ok(VoiceOutcome::Replied {
            input: text,
            outcome,
            voice_output: speak_reply,
        })
    }

    /// Speak arbitrary text
    pub async fn speak(&self, text: &str) -> bool {
        self.voice.speak(text).await
    }

    /// Installed local models
    pub async fn list_models(&self) -> Vec<String> {
        self.catalog.list_models().await
    }

    /// Switch the local model
    pub async fn switch_model(&self, model_name: &str) -> Result<()> {
        self.catalog.switch_model(model_name).await
    }

    /// Cost estimate for sending `message` to `backend`
    pub async fn usage_estimate(&self, message: &str, backend: BackendKind) -> UsageEstimate {
        let model = self.backend(backend).model().await;
        UsageEstimate::for_message(backend, model, message)
    }

    /// Status of every component
    pub async fn status(&self) -> Result<SystemStatus> {
        let remote = |available: bool, model: String| RemoteStatus {
            available,
            model: available.then_some(model),
        };

        let claude_available = self.claude.is_available().await;
        let gemini_available = self.gemini.is_available().await;

        Ok(SystemStatus {
            backends: BackendsStatus {
                ollama: LocalStatus {
                    connected: self.catalog.test_connection().await,
                    model: self.ollama.model().await,
                    models_available: self.catalog.list_models().await,
                },
                claude: remote(claude_available, self.claude.model().await),
                gemini: remote(gemini_available, self.gemini.model().await),
            },
            memory: self.memory.get_statistics()?,
            voice: VoiceStatus {
                tts_available: self.voice.tts_available(),
                tts_provider: self.voice.tts_provider(),
                stt_available: self.voice.stt_available(),
            },
        })
    }

    /// Log availability of every component
    pub async fn log_status(&self) {
        match self.status().await {
            Ok(status) => {
                info!("Ollama available: {}", status.backends.ollama.connected);
                info!("Claude available: {}", status.backends.claude.available);
                info!("Gemini available: {}", status.backends.gemini.available);
                info!(
                    "Memory initialized: {} conversations, {} important",
                    status.memory.total_conversations, status.memory.important_memories
                );
                info!("Voice: {} TTS", status.voice.tts_provider);
            }
            Err(e) => warn!("Could not collect status: {}", e),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted backends and voice for orchestrator and API tests

    use super::*;
    use crate::voice::{VoiceInfo, VoiceList};
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub struct ScriptedBackend {
        pub kind: BackendKind,
        pub model: Mutex<String>,
        pub available: bool,
        pub reply: std::result::Result<String, String>,
        pub seen_context: Mutex<Vec<Vec<ContextMessage>>>,
        pub installed: Vec<String>,
    }

    impl ScriptedBackend {
        pub fn new(kind: BackendKind, available: bool, reply: &str) -> Self {
            Self {
                kind,
                model: Mutex::new(format!("{}-model", kind)),
                available,
                reply: Ok(reply.to_string()),
                seen_context: Mutex::new(Vec::new()),
                installed: vec![format!("{}-model", kind), "mixtral:8x7b".to_string()],
            }
        }

        pub fn failing(kind: BackendKind, available: bool) -> Self {
            Self {
                reply: Err("boom".to_string()),
                ..Self::new(kind, available, "")
            }
        }

        pub fn calls(&self) -> usize {
            self.seen_context.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn model(&self) -> String {
            self.model.lock().unwrap().clone()
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn chat(&self, _message: &str, context: &[ContextMessage]) -> Result<String> {
            self.seen_context.lock().unwrap().push(context.to_vec());
            self.reply.clone().map_err(Error::Other)
        }

        fn fallback_reply(&self, _error: &Error) -> String {
            format!("{} is having trouble", self.kind)
        }
    }

    #[async_trait]
    impl ModelCatalog for ScriptedBackend {
        async fn list_models(&self) -> Vec<String> {
            if self.available { self.installed.clone() } else { Vec::new() }
        }

        async fn switch_model(&self, model_name: &str) -> Result<()> {
            if !self.list_models().await.iter().any(|m| m == model_name) {
                return Err(Error::ModelNotAvailable(model_name.to_string()));
            }
            *self.model.lock().unwrap() = model_name.to_string();
            Ok(())
        }

        async fn test_connection(&self) -> bool {
            self.available
        }
    }

    #[derive(Default)]
    pub struct ScriptedVoice {
        pub heard: Option<String>,
        pub spoken: Mutex<Vec<String>>,
        pub voice_id: Mutex<String>,
    }

    #[async_trait]
    impl VoiceChannel for ScriptedVoice {
        async fn listen(&self, _timeout: Duration) -> Option<String> {
            self.heard.clone()
        }

        async fn transcribe(&self, audio: &[u8], _filename: &str) -> Result<Option<String>> {
            Ok(Some(String::from_utf8_lossy(audio).to_string()).filter(|t| !t.is_empty()))
        }

        async fn speak(&self, text: &str) -> bool {
            self.spoken.lock().unwrap().push(text.to_string());
            true
        }

        fn tts_provider(&self) -> &'static str {
            "system"
        }

        fn tts_available(&self) -> bool {
            false
        }

        fn stt_available(&self) -> bool {
            true
        }

        async fn voices(&self) -> VoiceList {
            VoiceList {
                system: vec![VoiceInfo {
                    id: "default".to_string(),
                    name: "System default".to_string(),
                }],
                elevenlabs: Vec::new(),
            }
        }

        async fn set_voice(&self, voice_id: &str) {
            *self.voice_id.lock().unwrap() = voice_id.to_string();
        }
    }

    pub struct Harness {
        pub orchestrator: Orchestrator,
        pub local: Arc<ScriptedBackend>,
        pub claude: Arc<ScriptedBackend>,
        pub gemini: Arc<ScriptedBackend>,
        pub voice: Arc<ScriptedVoice>,
    }

    pub fn harness(local: ScriptedBackend, claude: ScriptedBackend, gemini: ScriptedBackend) -> Harness {
        harness_with_voice(local, claude, gemini, ScriptedVoice::default())
    }

    pub fn harness_with_voice(
        local: ScriptedBackend,
        claude: ScriptedBackend,
        gemini: ScriptedBackend,
        voice: ScriptedVoice,
    ) -> Harness {
        let local = Arc::new(local);
        let claude = Arc::new(claude);
        let gemini = Arc::new(gemini);
        let voice = Arc::new(voice);
        let memory = Arc::new(MemoryStore::in_memory().unwrap());

        let orchestrator = Orchestrator::from_parts(
            local.clone(),
            claude.clone(),
            gemini.clone(),
            memory,
            voice.clone(),
        );

        Harness {
            orchestrator,
            local,
            claude,
            gemini,
            voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn all_up() -> Harness {
        harness(
            ScriptedBackend::new(BackendKind::Ollama, true, "local reply"),
            ScriptedBackend::new(BackendKind::Claude, true, "claude reply"),
            ScriptedBackend::new(BackendKind::Gemini, true, "gemini reply"),
        )
    }

    #[tokio::test]
    async fn test_default_goes_local_and_is_stored() {
        let h = all_up();
        let outcome = h.orchestrator.chat("hello", Preference::Auto).await.unwrap();

        assert_eq!(outcome.backend, BackendKind::Ollama);
        assert_eq!(outcome.response, "local reply");
        assert_eq!(outcome.model, "ollama-model");
        assert!(outcome.stored);

        let recent = h.orchestrator.memory().get_recent_conversations(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].backend.as_deref(), Some("ollama"));
        assert_eq!(recent[0].model.as_deref(), Some("ollama-model"));
    }

    #[tokio::test]
    async fn test_explicit_preferences() {
        let h = all_up();
        let claude = h.orchestrator.chat("hi", Preference::Claude).await.unwrap();
        assert_eq!(claude.backend, BackendKind::Claude);

        let gemini = h.orchestrator.chat("hi", Preference::Gemini).await.unwrap();
        assert_eq!(gemini.backend, BackendKind::Gemini);
    }

    #[tokio::test]
    async fn test_unavailable_preference_falls_back_to_local() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, true, "local reply"),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, false, ""),
        );
        let outcome = h.orchestrator.chat("hi", Preference::Claude).await.unwrap();
        assert_eq!(outcome.backend, BackendKind::Ollama);
        assert_eq!(h.claude.calls(), 0);
    }

    #[tokio::test]
    async fn test_local_down_falls_back_to_claude_then_gemini() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, false, ""),
            ScriptedBackend::new(BackendKind::Claude, true, "claude reply"),
            ScriptedBackend::new(BackendKind::Gemini, true, "gemini reply"),
        );
        assert_eq!(h.orchestrator.select_backend(Preference::Auto).await, BackendKind::Claude);

        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, false, ""),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, true, "gemini reply"),
        );
        assert_eq!(h.orchestrator.select_backend(Preference::Auto).await, BackendKind::Gemini);

        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, false, ""),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, false, ""),
        );
        assert_eq!(h.orchestrator.select_backend(Preference::Auto).await, BackendKind::Ollama);
    }

    #[tokio::test]
    async fn test_local_preference_ignores_availability() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, false, ""),
            ScriptedBackend::new(BackendKind::Claude, true, ""),
            ScriptedBackend::new(BackendKind::Gemini, true, ""),
        );
        assert_eq!(h.orchestrator.select_backend(Preference::Local).await, BackendKind::Ollama);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_fallback_and_skips_memory() {
        let h = harness(
            ScriptedBackend::failing(BackendKind::Ollama, true),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, false, ""),
        );
        let outcome = h.orchestrator.chat("hello", Preference::Auto).await.unwrap();

        assert_eq!(outcome.response, "ollama is having trouble");
        assert!(!outcome.stored);
        assert_eq!(h.orchestrator.memory().get_statistics().unwrap().total_conversations, 0);
    }

    #[tokio::test]
    async fn test_smart_routing() {
        let h = all_up();
        let simple = h.orchestrator.smart_routing("how are you?").await.unwrap();
        assert_eq!(simple.backend, BackendKind::Ollama);

        let complex = h.orchestrator.smart_routing("Please analyze this argument").await.unwrap();
        assert_eq!(complex.backend, BackendKind::Claude);

        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, true, "local"),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, true, "gemini"),
        );
        let long = "a ".repeat(300);
        assert_eq!(h.orchestrator.smart_routing(&long).await.unwrap().backend, BackendKind::Gemini);

        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, true, "local"),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, false, ""),
        );
        assert_eq!(
            h.orchestrator.smart_routing("design a house").await.unwrap().backend,
            BackendKind::Ollama
        );
    }

    #[tokio::test]
    async fn test_context_includes_recent_and_important_memories() {
        let h = all_up();
        let memory = h.orchestrator.memory();
        memory
            .store_conversation("My favorite planet is Saturn", "Lovely rings.", None, None, None)
            .unwrap();
        memory.store_conversation("what's up", "not much", None, None, None).unwrap();

        h.orchestrator.chat("tell me about Saturn again", Preference::Auto).await.unwrap();

        let seen = h.local.seen_context.lock().unwrap();
        let context = &seen[0];
        // important hit is prepended ahead of the two recent exchanges
        assert_eq!(context.len(), 6);
        assert_eq!(context[0], ContextMessage::user("My favorite planet is Saturn"));
        assert_eq!(context[2], ContextMessage::user("My favorite planet is Saturn"));
        assert_eq!(context[4], ContextMessage::user("what's up"));
    }

    #[tokio::test]
    async fn test_voice_chat_microphone() {
        let voice = ScriptedVoice {
            heard: Some("good morning".to_string()),
            ..ScriptedVoice::default()
        };
        let h = harness_with_voice(
            ScriptedBackend::new(BackendKind::Ollama, true, "morning!"),
            ScriptedBackend::new(BackendKind::Claude, true, ""),
            ScriptedBackend::new(BackendKind::Gemini, true, ""),
            voice,
        );

        let outcome = h
            .orchestrator
            .voice_chat(VoiceInput::Microphone { timeout: Duration::from_secs(10) }, true)
            .await
            .unwrap();

        match outcome {
            VoiceOutcome::Replied { input, outcome, voice_output } => {
                assert_eq!(input, "good morning");
                assert_eq!(outcome.response, "morning!");
                assert!(voice_output);
            }
            VoiceOutcome::NoSpeech => panic!("expected a reply"),
        }
        assert_eq!(*h.voice.spoken.lock().unwrap(), vec!["morning!".to_string()]);
    }

    #[tokio::test]
    async fn test_voice_chat_no_speech() {
        let h = all_up();
        let outcome = h
            .orchestrator
            .voice_chat(VoiceInput::Microphone { timeout: Duration::from_secs(1) }, true)
            .await
            .unwrap();
        assert_eq!(outcome, VoiceOutcome::NoSpeech);
        assert_eq!(h.local.calls(), 0);
    }

    #[tokio::test]
    async fn test_voice_chat_upload_without_speaking() {
        let h = all_up();
        let outcome = h
            .orchestrator
            .voice_chat(
                VoiceInput::Audio {
                    bytes: b"uploaded words".to_vec(),
                    filename: "clip.wav".to_string(),
                },
                false,
            )
            .await
            .unwrap();

        assert!(matches!(outcome, VoiceOutcome::Replied { ref input, voice_output: false, .. } if input == "uploaded words"));
        assert!(h.voice.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch_model_and_status() {
        let h = all_up();
        h.orchestrator.switch_model("mixtral:8x7b").await.unwrap();
        assert!(h.orchestrator.switch_model("nope").await.is_err());

        let status = h.orchestrator.status().await.unwrap();
        assert!(status.backends.ollama.connected);
        assert_eq!(status.backends.ollama.model, "mixtral:8x7b");
        assert_eq!(status.backends.claude.model.as_deref(), Some("claude-model"));
        assert_eq!(status.voice.tts_provider, "system");

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["backends"]["gemini"]["available"], true);
        assert_eq!(json["memory"]["total_conversations"], 0);
    }

    #[tokio::test]
    async fn test_status_hides_unavailable_models() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Ollama, false, ""),
            ScriptedBackend::new(BackendKind::Claude, false, ""),
            ScriptedBackend::new(BackendKind::Gemini, false, ""),
        );
        let status = h.orchestrator.status().await.unwrap();
        assert!(!status.backends.ollama.connected);
        assert!(status.backends.ollama.models_available.is_empty());
        assert!(status.backends.claude.model.is_none());
        assert!(status.backends.gemini.model.is_none());
    }

    #[tokio::test]
    async fn test_usage_estimate_uses_backend_model() {
        let h = all_up();
        let estimate = h.orchestrator.usage_estimate("abcdefgh", BackendKind::Claude).await;
        assert_eq!(estimate.model, "claude-model");
        assert_eq!(estimate.estimated_tokens, 2);
    }
}
