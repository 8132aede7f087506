//! Interactive terminal chat loop.
//!
//! Reads lines from stdin. Lines starting with `/` are commands; anything
//! else is sent as a turn in the current session.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use confab_core::chat::session::ChatSession;
use confab_types::error::ChatError;
use confab_types::persona::BuiltinPersona;

use crate::cli::history::print_messages;
use crate::state::AppState;

/// Slash commands available in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Quit,
    /// Start a new session with the same persona and model.
    New,
    /// Switch persona (starts a different thread).
    Persona(String),
    /// Set the Custom persona's system prompt.
    Prompt(String),
    History,
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim().to_string()),
        None => (trimmed.to_lowercase(), String::new()),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/quit" | "/exit" | "/q" => ChatCommand::Quit,
        "/new" => ChatCommand::New,
        "/history" => ChatCommand::History,
        "/persona" if !arg.is_empty() => ChatCommand::Persona(arg),
        "/persona" => ChatCommand::Unknown("/persona requires a name".to_string()),
        "/prompt" if !arg.is_empty() => ChatCommand::Prompt(arg),
        "/prompt" => ChatCommand::Unknown("/prompt requires text".to_string()),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Run the chat loop until `/quit` or end of input.
pub async fn run_chat(state: &AppState, mut session: ChatSession, json: bool) -> Result<()> {
    if !json {
        print_banner(&session);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !json {
            print!("{} ", style(format!("{} ›", session.persona)).green().bold());
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Help) => print_help(),
            Some(ChatCommand::New) => {
                session.restart();
                tracing::info!(session_id = %session.session_id, "New session");
                if !json {
                    print_banner(&session);
                }
            }
            Some(ChatCommand::Persona(name)) => {
                session = session.with_persona(name);
                if !json {
                    print_banner(&session);
                }
            }
            Some(ChatCommand::Prompt(prompt)) => {
                session = session.with_custom_prompt(prompt);
                if !json {
                    println!("  {} Custom prompt set", style("✓").green().bold());
                    println!();
                }
            }
            Some(ChatCommand::History) => {
                let messages = state.orchestrator.history(&session.key()).await?;
                if json {
                    println!("{}", serde_json::to_string(&messages)?);
                } else {
                    println!();
                    print_messages(&session.persona, &messages);
                }
            }
            Some(ChatCommand::Unknown(cmd)) => {
                eprintln!(
                    "  {} Unknown command: {} (try {})",
                    style("!").yellow().bold(),
                    cmd,
                    style("/help").cyan()
                );
            }
            None => send_turn(state, &session, &line, json).await?,
        }
    }

    if !json {
        println!();
        println!("  {}", style(format!("Session {}", session.session_id)).dim());
    }
    Ok(())
}

/// Send one message. Turn errors are reported and the loop continues.
async fn send_turn(state: &AppState, session: &ChatSession, text: &str, json: bool) -> Result<()> {
    let request = session.turn(text);

    let spinner = if json {
        None
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.set_message(format!("{} is thinking...", session.persona));
        spinner.enable_steady_tick(Duration::from_millis(80));
        Some(spinner)
    };

    let result = state.orchestrator.respond(&request).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match result {
        Ok(reply) if json => println!("{}", serde_json::to_string(&reply)?),
        Ok(reply) => {
            println!();
            println!(
                "  {} {}",
                style(format!("{}:", session.persona)).cyan().bold(),
                reply.reply_text
            );
            println!();
        }
        Err(e) => {
            eprintln!("  {} {e}", style("✗").red().bold());
            if matches!(e, ChatError::InvalidPersonaPrompt { .. }) {
                eprintln!(
                    "  {}",
                    style("Set a system prompt with /prompt <text>").dim()
                );
            }
        }
    }
    Ok(())
}

fn print_banner(session: &ChatSession) {
    let kind = if BuiltinPersona::lookup(&session.persona).is_some() {
        "built-in persona"
    } else {
        "custom persona"
    };
    println!();
    println!(
        "  {} Chatting with {} {}",
        style("💬").bold(),
        style(&session.persona).cyan().bold(),
        style(format!("({kind})")).dim()
    );
    println!(
        "  {}",
        style(format!("{} · {}", session.display_name(), session.model)).dim()
    );
    println!("  {}", style("Type /help for commands, /quit to leave").dim());
    println!();
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}             {}", style("/help").cyan(), "Show this help message");
    println!("  {}              {}", style("/new").cyan(), "Start a new session");
    println!("  {}  {}", style("/persona <name>").cyan(), "Switch persona");
    println!("  {}   {}", style("/prompt <text>").cyan(), "Set the Custom persona's prompt");
    println!("  {}          {}", style("/history").cyan(), "Show this conversation");
    println!("  {}             {}", style("/quit").cyan(), "Leave the chat");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse("Who are you?"), None);
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse(" /Q "), Some(ChatCommand::Quit));
    }

    #[test]
    fn test_parse_persona_keeps_spaces() {
        assert_eq!(
            parse("/persona Sherlock Holmes"),
            Some(ChatCommand::Persona("Sherlock Holmes".to_string()))
        );
        assert!(matches!(parse("/persona"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_prompt() {
        assert_eq!(
            parse("/prompt You are a pirate."),
            Some(ChatCommand::Prompt("You are a pirate.".to_string()))
        );
        assert!(matches!(parse("/prompt   "), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse("/dance"),
            Some(ChatCommand::Unknown("/dance".to_string()))
        );
    }
}
