//! CLI (Command Line Interface) mode
//!
//! Interactive REPL with slash-command completion.

use clara_core::{ChatOutcome, Orchestrator, Preference};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use std::sync::Arc;
use tracing::info;

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show this help"),
    ("/exit", "Quit"),
    ("/quit", "Quit"),
    ("/status", "Backend, memory and voice status"),
    ("/models", "List local models"),
    ("/model", "Switch local model: /model <name>"),
    ("/recent", "Recent conversations"),
    ("/important", "Important memories"),
    ("/search", "Search memory: /search <query>"),
    ("/claude", "Ask Claude: /claude <message>"),
    ("/gemini", "Ask Gemini: /gemini <message>"),
    ("/local", "Ask the local model only: /local <message>"),
    ("/voice", "Toggle speaking replies"),
];

/// How many recent conversations `/recent` prints
const RECENT_LIMIT: usize = 10;

/// Hits printed by `/search`
const SEARCH_LIMIT: usize = 5;

/// A parsed line of input
#[derive(Debug, PartialEq, Eq)]
enum CliCommand<'a> {
    Help,
    Exit,
    Status,
    Models,
    SwitchModel(&'a str),
    Recent,
    Important,
    Search(&'a str),
    Ask(Preference, &'a str),
    ToggleVoice,
    Usage(&'static str),
    Unknown(&'a str),
    Chat(&'a str),
}

fn parse_command(input: &str) -> CliCommand<'_> {
    if !input.starts_with('/') {
        return CliCommand::Chat(input);
    }

    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };

    match (command.to_lowercase().as_str(), arg.is_empty()) {
        ("/help" | "/?", _) => CliCommand::Help,
        ("/exit" | "/quit" | "/q", _) => CliCommand::Exit,
        ("/status", _) => CliCommand::Status,
        ("/models", _) => CliCommand::Models,
        ("/model", false) => CliCommand::SwitchModel(arg),
        ("/model", true) => CliCommand::Usage("/model <name>"),
        ("/recent", _) => CliCommand::Recent,
        ("/important", _) => CliCommand::Important,
        ("/search", false) => CliCommand::Search(arg),
        ("/search", true) => CliCommand::Usage("/search <query>"),
        ("/claude", false) => CliCommand::Ask(Preference::Claude, arg),
        ("/claude", true) => CliCommand::Usage("/claude <message>"),
        ("/gemini", false) => CliCommand::Ask(Preference::Gemini, arg),
        ("/gemini", true) => CliCommand::Usage("/gemini <message>"),
        ("/local", false) => CliCommand::Ask(Preference::Local, arg),
        ("/local", true) => CliCommand::Usage("/local <message>"),
        ("/voice", _) => CliCommand::ToggleVoice,
        _ => CliCommand::Unknown(command),
    }
}

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt showing whether replies are spoken
struct ColoredPrompt {
    style: Style,
    speaking: bool,
}

impl ColoredPrompt {
    fn new() -> Self {
        Self {
            style: Color::Magenta.bold(),
            speaking: false,
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        let marker = if self.speaking { "clara (voice)> " } else { "clara> " };
        std::borrow::Cow::Owned(self.style.paint(marker).to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// Run CLI interactive mode
pub async fn run_cli(orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    info!("Starting CLI mode");
    print_welcome();

    let mut keybindings = default_keybindings();

    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let mut prompt = ColoredPrompt::new();

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match parse_command(input) {
                    CliCommand::Exit => {
                        println!("\nGoodbye.\n");
                        break;
                    }
                    CliCommand::ToggleVoice => {
                        prompt.speaking = !prompt.speaking;
                        let state = if prompt.speaking { "on" } else { "off" };
                        println!("\nSpoken replies {}.\n", state);
                    }
                    command => {
                        if let Err(e) = execute(&orchestrator, command, prompt.speaking).await {
                            eprintln!("\n{} {}\n", Color::Red.paint("Error:"), e);
                        }
                    }
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\nGoodbye.\n");
                break;
            }
            Err(err) => {
                eprintln!("\n{} {}\n", Color::Red.paint("Error:"), err);
                break;
            }
        }
    }

    Ok(())
}

/// Run one command against the orchestrator
async fn execute(orchestrator: &Orchestrator, command: CliCommand<'_>, speak: bool) -> anyhow::Result<()> {
    let memory = orchestrator.memory();

    match command {
        CliCommand::Help => print_help(),
        CliCommand::Status => print_status(orchestrator).await?,
        CliCommand::Models => {
            let models = orchestrator.list_models().await;
            if models.is_empty() {
                println!("\nNo local models found. Is Ollama running?\n");
            } else {
                println!();
                for model in models {
                    println!("  {}", model);
                }
                println!();
            }
        }
        CliCommand::SwitchModel(name) => {
            orchestrator.switch_model(name).await?;
            println!("\nSwitched to {}\n", name);
        }
        CliCommand::Recent => {
            println!();
            for conversation in memory.get_recent_conversations(RECENT_LIMIT)? {
                println!("{} {}", Color::DarkGray.paint(&conversation.timestamp), conversation.user_message);
                println!("  {}", preview(&conversation.assistant_response));
            }
            println!();
        }
        CliCommand::Important => {
            println!();
            for item in memory.get_important_memories()? {
                println!("[{:.1}] {}", item.importance, item.user_message);
                if let Some(note) = item.note {
                    println!("  note: {}", note);
                }
            }
            println!();
        }
        CliCommand::Search(query) => {
            let hits = memory.search_memories(query, SEARCH_LIMIT)?;
            println!("\n{} match(es):", hits.len());
            for hit in hits {
                println!("  #{} {}", hit.conversation_id, preview(&hit.user_message));
            }
            println!();
        }
        CliCommand::Ask(preference, message) => {
            let outcome = orchestrator.chat(message, preference).await?;
            reply(orchestrator, &outcome, speak).await;
        }
        CliCommand::Chat(message) => {
            let outcome = orchestrator.smart_routing(message).await?;
            reply(orchestrator, &outcome, speak).await;
        }
        CliCommand::Usage(usage) => println!("\nUsage: {}\n", usage),
        CliCommand::Unknown(command) => {
            eprintln!("\nUnknown command: {}. Type /help for a list.\n", command);
        }
        CliCommand::Exit | CliCommand::ToggleVoice => {}
    }

    Ok(())
}

async fn reply(orchestrator: &Orchestrator, outcome: &ChatOutcome, speak: bool) {
    let label = format!("[{} / {}]", outcome.backend, outcome.model);
    println!("\n{}\n{}\n", Color::DarkGray.paint(label), outcome.response);

    if speak && !orchestrator.speak(&outcome.response).await {
        eprintln!("{}", Color::Yellow.paint("(could not speak the reply)"));
    }
}

async fn print_status(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let status = orchestrator.status().await?;
    let flag = |on: bool| if on { Color::Green.paint("up") } else { Color::Red.paint("down") };
    let backends = &status.backends;

    println!();
    println!("  Ollama  {} ({})", flag(backends.ollama.connected), backends.ollama.model);
    println!(
        "  Claude  {} {}",
        flag(backends.claude.available),
        backends.claude.model.as_deref().unwrap_or("")
    );
    println!(
        "  Gemini  {} {}",
        flag(backends.gemini.available),
        backends.gemini.model.as_deref().unwrap_or("")
    );
    println!(
        "  Memory  {} conversations, {} important, {} days active",
        status.memory.total_conversations, status.memory.important_memories, status.memory.days_active
    );
    println!(
        "  Voice   {} TTS, speech recognition {}",
        status.voice.tts_provider,
        flag(status.voice.stt_available)
    );
    println!();
    Ok(())
}

/// First line, at most 100 characters
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > 100 {
        format!("{}...", line.chars().take(100).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn print_welcome() {
    println!();
    println!("{}", Color::Magenta.bold().paint("Clara - interactive mode"));
    println!("Type a message and press Enter. Commands start with /, try /help.");
    println!();
}

fn print_help() {
    println!();
    println!("Commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {:<12} {}", cmd, desc);
    }
    println!();
    println!("Anything else is sent to Clara, routed by complexity.");
    println!();
}
