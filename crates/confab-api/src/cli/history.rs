//! History CLI commands: show, export, list conversations.
//!
//! These only need the history store, not a generation provider.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use confab_core::chat::transcript::render_transcript;
use confab_core::history::store::HistoryStore;
use confab_types::conversation::{ConversationKey, Message, Role};

/// Print every message of a conversation.
pub async fn show_history<S: HistoryStore>(
    store: &S,
    key: &ConversationKey,
    json: bool,
) -> Result<()> {
    let messages = store.fetch(key).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages for {}",
            style("i").blue().bold(),
            style(key.display_name()).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(key.display_name()).bold(),
        style(format!("· {}", key.model)).dim()
    );
    println!();
    print_messages(&key.persona, &messages);
    Ok(())
}

/// Print a thread in chat style.
pub fn print_messages(persona: &str, messages: &[Message]) {
    for message in messages {
        match message.role {
            Role::Human => println!("  {} {}", style("You:").green().bold(), message.content),
            Role::Ai => println!(
                "  {} {}",
                style(format!("{persona}:")).cyan().bold(),
                message.content
            ),
        }
        println!();
    }
}

/// Write the transcript to `output`, or stdout when `None`.
pub async fn export_transcript<S: HistoryStore>(
    store: &S,
    key: &ConversationKey,
    output: Option<&Path>,
) -> Result<()> {
    let messages = store.fetch(key).await?;
    let transcript = render_transcript(&key.persona, &messages);

    match output {
        Some(path) => {
            tokio::fs::write(path, &transcript).await?;
            eprintln!(
                "  {} Exported {} messages to {}",
                style("✓").green().bold(),
                messages.len(),
                style(path.display()).cyan()
            );
        }
        None => print!("{transcript}"),
    }
    Ok(())
}

/// List stored conversations, most recent first.
pub async fn list_conversations<S: HistoryStore>(store: &S, json: bool) -> Result<()> {
    let conversations = store.list_conversations().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("confab chat --persona \"Iron Man\"").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Conversation").fg(Color::White),
        Cell::new("Session").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Last Active").fg(Color::White),
    ]);

    for conversation in &conversations {
        table.add_row(vec![
            Cell::new(&conversation.display_name),
            Cell::new(&conversation.key.session_id).fg(Color::DarkGrey),
            Cell::new(&conversation.key.model),
            Cell::new(conversation.message_count),
            Cell::new(format_relative_time(&conversation.last_activity_at)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
