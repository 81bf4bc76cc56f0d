//! llm-chat CLI: entry point.
//!
//! # Commands
//!
//! - `llmchat chat [-m MESSAGE] [-p PROVIDER] [--stream]`: single-shot or REPL
//! - `llmchat status`: show configuration and provider status
//! - `llmchat validate [-p PROVIDER]`: check a provider's credentials
//! - `llmchat onboard`: write a default config and create data directories
//! - `llmchat params -p PROVIDER [-t TEMP] [--max-tokens N]`: persist generation parameters
//! - `llmchat transcribe FILE [--send]`: speech-to-text, optionally chatting with the result
//! - `llmchat cleanup`: remove temporary audio clips

mod chat;
mod helpers;
mod onboard;
mod params;
mod repl;
mod status;
mod transcribe;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use llmchat_core::config::load_config;
use llmchat_providers::create_from_config;

use crate::chat::{ChatSession, ChatSettings};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Chat with hosted and local LLMs from the terminal
#[derive(Parser)]
#[command(name = "llmchat", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a model (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        #[command(flatten)]
        settings: ChatArgs,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,

    /// Check that a provider's credentials or endpoint work
    Validate {
        /// Provider to check (defaults to the configured default provider)
        #[arg(short, long)]
        provider: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Initialize configuration and data directories
    Onboard,

    /// Persist generation parameters for a provider
    Params {
        /// Provider to update
        #[arg(short, long)]
        provider: String,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Transcribe an audio file with Whisper
    Transcribe {
        /// Audio file to transcribe
        file: std::path::PathBuf,

        /// Send the transcript as a chat message
        #[arg(long, default_value_t = false)]
        send: bool,

        #[command(flatten)]
        settings: ChatArgs,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Remove temporary audio clips
    Cleanup,
}

/// Options shared by every command that talks to a model.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ChatArgs {
    /// Provider (mistral, gemini, deepseek, lm_studio, ollama)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Stream the reply as it is generated
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Sampling temperature (overrides config)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Maximum tokens to generate (overrides config)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Conversation identifier used for saved history
    #[arg(short, long, default_value = "cli:default")]
    pub conversation: String,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            settings,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, settings).await
        }
        Commands::Status => status::run(),
        Commands::Validate { provider, logs } => {
            init_logging(logs);
            validate::run(provider).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Params {
            provider,
            temperature,
            max_tokens,
        } => params::run(&provider, temperature, max_tokens),
        Commands::Transcribe {
            file,
            send,
            settings,
            logs,
        } => {
            init_logging(logs);
            transcribe::run(&file, send, settings).await
        }
        Commands::Cleanup => transcribe::cleanup(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, args: ChatArgs) -> Result<()> {
    let config = load_config(None);
    let settings = ChatSettings::resolve(&config, &args)?;
    let provider = create_from_config(&config, &settings.provider)
        .with_context(|| format!("cannot create provider '{}'", settings.provider))?;

    match message {
        Some(msg) => {
            // Single-shot mode
            info!(provider = %settings.provider, "processing single message");
            send_once(provider.as_ref(), &config, &settings, &msg).await
        }
        None => {
            // Interactive REPL mode
            repl::run(provider.as_ref(), &config, settings).await
        }
    }
}

/// Send one message, print the reply, close the session.
pub(crate) async fn send_once(
    provider: &dyn llmchat_providers::LlmProvider,
    config: &llmchat_core::config::Config,
    settings: &ChatSettings,
    message: &str,
) -> Result<()> {
    let mut session = ChatSession::open(provider, config, settings)?;
    let mut printer = helpers::ReplyPrinter::new(provider.display_name());
    let result = session.send(message, |fragment| printer.fragment(fragment)).await;
    printer.finish();
    provider.close();
    result.map(|_| ()).context("chat completion failed")
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("llmchat=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
