//! CLI command definitions for the `confab` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod catalog;
pub mod chat;
pub mod history;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use confab_types::conversation::ConversationKey;
use confab_types::persona::CUSTOM_PERSONA;

/// Chat with historical and fictional personas.
#[derive(Parser)]
#[command(name = "confab", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Keep history in memory only; nothing is written to disk.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Export tracing spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Interactive chat in the terminal.
    Chat {
        /// Persona to talk to.
        #[arg(short, long, default_value = CUSTOM_PERSONA)]
        persona: String,

        /// Model to use (defaults to the configured default model).
        #[arg(short, long)]
        model: Option<String>,

        /// Resume an existing session instead of starting a new one.
        #[arg(short, long)]
        session: Option<String>,

        /// System prompt for the Custom persona.
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Show the messages of a conversation.
    History {
        #[command(flatten)]
        target: ConversationArgs,
    },

    /// Export a conversation transcript as plain text.
    Export {
        #[command(flatten)]
        target: ConversationArgs,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List past conversations, most recent first.
    #[command(alias = "ls")]
    Conversations,

    /// List available personas.
    Personas,

    /// List selectable models.
    Models,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Arguments identifying one stored conversation.
#[derive(Args)]
pub struct ConversationArgs {
    /// Session id.
    #[arg(short, long)]
    pub session: String,

    /// Persona name.
    #[arg(short, long)]
    pub persona: String,

    /// Model (defaults to the configured default model).
    #[arg(short, long)]
    pub model: Option<String>,
}

impl ConversationArgs {
    pub fn key(&self, default_model: &str) -> ConversationKey {
        let model = self.model.as_deref().unwrap_or(default_model);
        ConversationKey::resolve(&self.session, &self.persona, model)
    }
}
