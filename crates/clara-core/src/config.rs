//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables (after `.env` has been loaded by the binary)
//! 2. `clara.toml` in the working directory
//! 3. Built-in defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::{Error, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "clara.toml";

/// Personality used when no prompt file is present
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Clara, an AI companion and intellectual partner.";

/// Main configuration for Clara
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Local Ollama backend
    pub ollama: OllamaConfig,
    /// Anthropic Claude backend
    pub claude: ClaudeConfig,
    /// Google Gemini backend
    pub gemini: GeminiConfig,
    /// Conversation memory
    pub memory: MemoryConfig,
    /// System prompt location
    pub prompt: PromptConfig,
    /// Speech input/output
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. `None` allows any origin.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    /// Bearer key required on `/api/*` when set
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model used until switched at runtime
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// API key; the backend is unavailable without one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_claude_model")]
    pub model: String,

    #[serde(default = "default_claude_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_claude_model(),
            base_url: default_claude_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// File holding Clara's personality
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt_path: default_system_prompt_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default, skip_serializing)]
    pub elevenlabs_api_key: Option<String>,

    #[serde(default = "default_voice_id")]
    pub elevenlabs_voice_id: String,

    #[serde(default = "default_elevenlabs_model")]
    pub elevenlabs_model: String,

    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,

    /// Key for the Whisper-compatible transcription API
    #[serde(default, skip_serializing)]
    pub whisper_api_key: Option<String>,

    #[serde(default = "default_whisper_base_url")]
    pub whisper_base_url: String,

    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// ISO 639-1 language hint for transcription
    #[serde(default)]
    pub whisper_language: Option<String>,

    /// Recorder template; `{seconds}` and `{output}` are substituted
    #[serde(default = "default_record_command")]
    pub record_command: String,

    /// System TTS template; `{text}` is substituted
    #[serde(default = "default_speak_command")]
    pub speak_command: String,

    /// Audio player template; `{input}` is substituted
    #[serde(default = "default_play_command")]
    pub play_command: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            elevenlabs_voice_id: default_voice_id(),
            elevenlabs_model: default_elevenlabs_model(),
            elevenlabs_base_url: default_elevenlabs_base_url(),
            whisper_api_key: None,
            whisper_base_url: default_whisper_base_url(),
            whisper_model: default_whisper_model(),
            whisper_language: None,
            record_command: default_record_command(),
            speak_command: default_speak_command(),
            play_command: default_play_command(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "dolphin-mistral:7b".to_string()
}

fn default_claude_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_claude_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_gemini_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_db_path() -> String {
    "clara_memory.db".to_string()
}

fn default_system_prompt_path() -> String {
    "prompts/clara_system.txt".to_string()
}

fn default_voice_id() -> String {
    // "Bella"
    "EXAVITQu4vr4xnSDxMaL".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_turbo_v2".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_whisper_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_whisper_model() -> String {
    "whisper-1".to_string()
}

fn default_record_command() -> String {
    "arecord -q -f cd -t wav -d {seconds} {output}".to_string()
}

fn default_speak_command() -> String {
    "espeak -s 175 -a 180 {text}".to_string()
}

fn default_play_command() -> String {
    "ffplay -nodisp -autoexit -loglevel quiet {input}".to_string()
}

impl Config {
    /// Replace `${VAR_NAME}` with the environment value.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse TOML content, expanding environment references first
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `./clara.toml` if present, otherwise from the environment only
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_non_empty);
    }

    /// Apply overrides from `var`, which yields non-empty values only
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server
        if let Some(host) = var("CLARA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("CLARA_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = var("CLARA_ALLOWED_ORIGINS") {
            self.server.allowed_origins = Some(split_list(&origins));
        }
        if let Some(key) = var("CLARA_API_KEY") {
            self.server.api_key = Some(key);
        }

        // Ollama
        if let Some(host) = var("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.ollama.model = model;
        }

        // Claude
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.claude.api_key = Some(key);
        }
        if let Some(model) = var("CLAUDE_MODEL") {
            self.claude.model = model;
        }
        if let Some(url) = var("CLAUDE_BASE_URL") {
            self.claude.base_url = url;
        }

        // Gemini
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(url) = var("GEMINI_BASE_URL") {
            self.gemini.base_url = url;
        }

        // Memory / prompt
        if let Some(path) = var("CLARA_DB_PATH") {
            self.memory.db_path = path;
        }
        if let Some(path) = var("CLARA_SYSTEM_PROMPT") {
            self.prompt.system_prompt_path = path;
        }

        // Voice
        if let Some(key) = var("ELEVENLABS_API_KEY") {
            self.voice.elevenlabs_api_key = Some(key);
        }
        if let Some(id) = var("ELEVENLABS_VOICE_ID") {
            self.voice.elevenlabs_voice_id = id;
        }
        if let Some(key) = var("WHISPER_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.voice.whisper_api_key = Some(key);
        }
        if let Some(url) = var("WHISPER_BASE_URL") {
            self.voice.whisper_base_url = url;
        }
        if let Some(lang) = var("WHISPER_LANGUAGE") {
            self.voice.whisper_language = Some(lang);
        }
        if let Some(cmd) = var("CLARA_RECORD_COMMAND") {
            self.voice.record_command = cmd;
        }
        if let Some(cmd) = var("CLARA_SPEAK_COMMAND") {
            self.voice.speak_command = cmd;
        }
        if let Some(cmd) = var("CLARA_PLAY_COMMAND") {
            self.voice.play_command = cmd;
        }
    }

    /// Read Clara's personality from the configured prompt file
    pub fn system_prompt(&self) -> String {
        match std::fs::read_to_string(&self.prompt.system_prompt_path) {
            Ok(prompt) if !prompt.trim().is_empty() => prompt,
            Ok(_) | Err(_) => {
                warn!(
                    "System prompt not found at {}, using default",
                    self.prompt.system_prompt_path
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.ollama.model, "dolphin-mistral:7b");
        assert_eq!(config.claude.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.claude.max_tokens, 4096);
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.memory.db_path, "clara_memory.db");
        assert_eq!(config.voice.elevenlabs_voice_id, "EXAVITQu4vr4xnSDxMaL");
        assert!(config.claude.api_key.is_none());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("CLARA_TEST_EXPAND_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${CLARA_TEST_EXPAND_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${CLARA_TEST_MISSING_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("CLARA_TEST_EXPAND_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_passthrough() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("cost: $5"), "cost: $5");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
    }

    #[test]
    fn test_toml_parsing() {
        let content = r#"
[server]
port = 8080
allowed_origins = ["http://localhost:3000"]

[ollama]
host = "http://gpu-box:11434"
model = "mixtral:8x7b"

[claude]
api_key = "sk-test"
temperature = 0.2

[memory]
db_path = "/var/lib/clara/memory.db"

[voice]
speak_command = "say {text}"
"#;

        let config = Config::from_toml_str(content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.server.allowed_origins,
            Some(vec!["http://localhost:3000".to_string()])
        );
        assert_eq!(config.ollama.model, "mixtral:8x7b");
        assert_eq!(config.claude.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.claude.temperature, 0.2);
        assert_eq!(config.claude.max_tokens, 4096);
        assert_eq!(config.memory.db_path, "/var/lib/clara/memory.db");
        assert_eq!(config.voice.speak_command, "say {text}");
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_toml_invalid() {
        let result = Config::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_system_prompt_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "You are Clara, a test persona.").unwrap();

        let mut config = Config::default();
        config.prompt.system_prompt_path = file.path().to_string_lossy().to_string();
        assert_eq!(config.system_prompt(), "You are Clara, a test persona.");
    }

    #[test]
    fn test_system_prompt_fallback() {
        let mut config = Config::default();
        config.prompt.system_prompt_path = "/nonexistent/clara_system.txt".to_string();
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_overrides_beat_toml() {
        let mut config = Config::from_toml_str(
            r#"
[server]
port = 8080

[ollama]
model = "mixtral:8x7b"
"#,
        )
        .unwrap();

        config.apply_overrides(lookup(&[
            ("OLLAMA_MODEL", "llama3:8b"),
            ("CLARA_PORT", "9090"),
            ("CLARA_ALLOWED_ORIGINS", "http://a.com,http://b.com"),
            ("WHISPER_LANGUAGE", "en"),
        ]));
        assert_eq!(config.ollama.model, "llama3:8b");
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.server.allowed_origins,
            Some(vec!["http://a.com".to_string(), "http://b.com".to_string()])
        );
        assert_eq!(config.voice.whisper_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_unparsable_port_is_ignored() {
        let mut config = Config::from_toml_str("[server]\nport = 8080\n").unwrap();
        config.apply_overrides(lookup(&[("CLARA_PORT", "eighty")]));
        assert_eq!(config.server.port, 8080);

        config.apply_overrides(lookup(&[("CLARA_PORT", "70000")]));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_whisper_key_falls_back_to_openai_key() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("OPENAI_API_KEY", "sk-openai")]));
        assert_eq!(config.voice.whisper_api_key.as_deref(), Some("sk-openai"));

        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("WHISPER_API_KEY", "sk-whisper"),
        ]));
        assert_eq!(config.voice.whisper_api_key.as_deref(), Some("sk-whisper"));
    }

    #[test]
    fn test_toml_file_with_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[memory]\ndb_path = \"${{CLARA_TEST_FILE_DB}}\"\n\n[server]\nport = 8080\n"
        )
        .unwrap();

        unsafe {
            std::env::set_var("CLARA_TEST_FILE_DB", "/tmp/from-env.db");
            std::env::set_var("CLARA_PORT", "9191");
        }

        let config = Config::from_toml_file(file.path());

        unsafe {
            std::env::remove_var("CLARA_TEST_FILE_DB");
            std::env::remove_var("CLARA_PORT");
        }

        let config = config.unwrap();
        assert_eq!(config.memory.db_path, "/tmp/from-env.db");
        assert_eq!(config.server.port, 9191);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://a.com, http://b.com ,"),
            vec!["http://a.com".to_string(), "http://b.com".to_string()]
        );
    }
}
