//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent input history.
//! The provider stays initialized for the whole loop through a `ProviderScope`.

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use llmchat_core::config::Config;
use llmchat_core::utils::truncate_string;
use llmchat_providers::{LlmProvider, ProviderScope};

use crate::chat::{ChatSession, ChatSettings};
use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Resets the current conversation.
const CLEAR_COMMAND: &str = "/clear";

/// Run the interactive REPL loop.
pub async fn run(
    provider: &dyn LlmProvider,
    config: &Config,
    settings: ChatSettings,
) -> Result<()> {
    let scope = ProviderScope::enter(provider)
        .await
        .with_context(|| format!("failed to initialize {}", provider.display_name()))?;

    let mut session = ChatSession::open(provider, config, &settings)?;
    helpers::print_banner(scope.display_name(), &scope.config().name);
    if !session.messages().is_empty() {
        println!(
            "{}",
            format!("Resumed {} saved messages.", session.messages().len()).dimmed()
        );
        println!();
    }

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl-C: exit cleanly
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                // Ctrl-D: exit cleanly
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if trimmed.eq_ignore_ascii_case(CLEAR_COMMAND) {
            match session.clear() {
                Ok(()) => println!("{}\n", "Conversation cleared.".dimmed()),
                Err(e) => eprintln!("\n❌ Error: {e:#}\n"),
            }
            continue;
        }

        debug!(
            conversation = %settings.conversation,
            input = %truncate_string(trimmed, 80),
            "processing input"
        );
        helpers::print_thinking();

        let mut printer = helpers::ReplyPrinter::new(scope.display_name());
        let result = session.send(trimmed, |fragment| printer.fragment(fragment)).await;
        printer.finish();

        if let Err(e) = result {
            eprintln!("\n❌ Error: {e:#}\n");
        }
    }

    save_history(&mut editor);
    drop(session);
    drop(scope);

    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the readline input history file.
fn history_path() -> std::path::PathBuf {
    llmchat_core::utils::get_data_path().join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
