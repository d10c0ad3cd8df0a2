//! clara: AI companion main binary
//!
//! Usage:
//!   clara           - Start server mode (HTTP API + web chat page)
//!   clara --cli     - Start interactive CLI mode
//!   clara --help    - Show help

mod cli;

use clara_api::AppState;
use clara_core::{Config, MemoryStore, Orchestrator};
use clara_voice::VoiceInterface;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Server mode (HTTP API + web chat page)
    Server,
    /// Interactive CLI mode
    Cli,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("clara {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Load .env file before anything reads the environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            cli::run_cli(orchestrator).await
        }
        RunMode::Server => run_server(config, orchestrator).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--cli" | "-c" => return RunMode::Cli,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("clara - AI companion with long-term memory");
    println!();
    println!("Usage:");
    println!("  clara           Start server mode (HTTP API + web chat page)");
    println!("  clara --cli     Start interactive CLI mode");
    println!("  clara --help    Show this help message");
    println!("  clara --version Show version");
    println!();
    println!("Configuration is read from ./clara.toml when present, then the environment:");
    println!("  OLLAMA_HOST          Ollama server (default: http://localhost:11434)");
    println!("  OLLAMA_MODEL         Local model (default: dolphin-mistral:7b)");
    println!("  ANTHROPIC_API_KEY    Enables Claude");
    println!("  GOOGLE_API_KEY       Enables Gemini");
    println!("  ELEVENLABS_API_KEY   Enables ElevenLabs TTS");
    println!("  WHISPER_API_KEY      Enables speech recognition (falls back to OPENAI_API_KEY)");
    println!("  CLARA_DB_PATH        Memory database (default: clara_memory.db)");
    println!("  CLARA_HOST           Bind address (default: 0.0.0.0)");
    println!("  CLARA_PORT           HTTP port (default: 5000)");
    println!("  CLARA_API_KEY        Require a bearer key on /api/*");
    println!("  RUST_LOG             Log filter (default: info)");
}

/// Wire backends, memory and voice together
fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let memory = MemoryStore::new(&config.memory.db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open memory database: {}", e))?;
    let voice = VoiceInterface::from_config(&config.voice)
        .map_err(|e| anyhow::anyhow!("Failed to initialize voice: {}", e))?;

    Orchestrator::new(config, Arc::new(memory), Arc::new(voice))
        .map_err(|e| anyhow::anyhow!("Failed to create orchestrator: {}", e))
}

/// Run server mode
async fn run_server(config: Config, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    tracing::info!("{}", "=".repeat(50));
    tracing::info!("Starting Clara AI System...");
    tracing::info!("Intellectual Companion & Knowledge Manager");
    tracing::info!("{}", "=".repeat(50));

    orchestrator.log_status().await;

    let display_host = match config.server.host.as_str() {
        "0.0.0.0" | "::" => "localhost",
        host => host,
    };
    tracing::info!("{}", "=".repeat(50));
    tracing::info!("Clara is ready at http://{}:{}", display_host, config.server.port);
    tracing::info!("Press Ctrl+C to exit");
    tracing::info!("{}", "=".repeat(50));

    let state = AppState::new(config, orchestrator);
    clara_api::start_server(state, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
