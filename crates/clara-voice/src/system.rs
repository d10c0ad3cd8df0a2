//! Local audio through external commands
//!
//! Recording, system TTS and playback are delegated to configurable command
//! templates such as `arecord -d {seconds} {output}`. Templates are split on
//! whitespace and placeholders are substituted per argument, so a value with
//! spaces stays a single argument and is never seen by a shell.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, VoiceError};

/// Upper bound for system TTS and playback
const PLAYBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Extra time the recorder gets beyond the requested duration
const RECORD_GRACE: Duration = Duration::from_secs(5);

/// Split `template` into argv and substitute `{name}` placeholders
pub fn render_command(template: &str, vars: &[(&str, &str)]) -> Vec<String> {
    template
        .split_whitespace()
        .map(|arg| {
            vars.iter().fold(arg.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        })
        .collect()
}

/// Command-backed recorder, speaker and player
#[derive(Debug, Clone)]
pub struct SystemAudio {
    record_command: String,
    speak_command: String,
    play_command: String,
}

impl SystemAudio {
    pub fn new(
        record_command: impl Into<String>,
        speak_command: impl Into<String>,
        play_command: impl Into<String>,
    ) -> Self {
        Self {
            record_command: record_command.into(),
            speak_command: speak_command.into(),
            play_command: play_command.into(),
        }
    }

    pub fn from_voice_config(config: &clara_core::VoiceConfig) -> Self {
        Self::new(
            config.record_command.clone(),
            config.speak_command.clone(),
            config.play_command.clone(),
        )
    }

    /// Program behind the speak command, shown as the system voice name
    pub fn speak_program(&self) -> &str {
        self.speak_command.split_whitespace().next().unwrap_or("system")
    }

    /// Record `duration` of microphone audio into `output`
    pub async fn record(&self, duration: Duration, output: &Path) -> Result<()> {
        let seconds = duration.as_secs().max(1).to_string();
        let output = output.to_string_lossy();
        let argv = render_command(
            &self.record_command,
            &[("seconds", seconds.as_str()), ("output", output.as_ref())],
        );
        run(argv, duration.saturating_add(RECORD_GRACE)).await
    }

    /// Speak `text` with the system TTS
    pub async fn speak(&self, text: &str) -> Result<()> {
        let argv = render_command(&self.speak_command, &[("text", text)]);
        run(argv, PLAYBACK_TIMEOUT).await
    }

    /// Play an audio file
    pub async fn play(&self, input: &Path) -> Result<()> {
        let input = input.to_string_lossy();
        let argv = render_command(&self.play_command, &[("input", input.as_ref())]);
        run(argv, PLAYBACK_TIMEOUT).await
    }
}

async fn run(argv: Vec<String>, limit: Duration) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(VoiceError::ConfigError("Empty command template".to_string()));
    };

    debug!("Running {} {:?}", program, args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| VoiceError::CommandFailed(format!("{}: {}", program, e)))?;

    let stderr = child.stderr.take();
    let status = match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            warn!("{} timed out after {:?}", program, limit);
            let _ = child.kill().await;
            return Err(VoiceError::CommandFailed(format!("{} timed out", program)));
        }
    };

    if !status.success() {
        let mut detail = String::new();
        if let Some(mut stderr) = stderr {
            use tokio::io::AsyncReadExt;
            let _ = stderr.read_to_string(&mut detail).await;
        }
        return Err(VoiceError::CommandFailed(format!(
            "{} exited with {}: {}",
            program,
            status,
            detail.trim()
        )));
    }

    Ok(())
}
