//! Persona and model catalog CLI commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use confab_types::config::ChatConfig;
use confab_types::persona::persona_catalog;

/// Print the persona catalog.
pub fn list_personas(json: bool) -> Result<()> {
    let catalog = persona_catalog();

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Persona").fg(Color::White),
        Cell::new("System prompt").fg(Color::White),
    ]);

    for persona in &catalog {
        let prompt_cell = match &persona.system_prompt {
            Some(prompt) => Cell::new(truncate(prompt, 70)),
            None => Cell::new("(your own, via --prompt or /prompt)").fg(Color::DarkGrey),
        };
        table.add_row(vec![Cell::new(&persona.label), prompt_cell]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Print the model catalog, marking the default.
pub fn list_models(config: &ChatConfig, json: bool) -> Result<()> {
    if json {
        let body = serde_json::json!({
            "default_model": config.default_model,
            "models": config.models,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    if config.models.is_empty() {
        println!(
            "  {} Any model accepted by '{}' (default: {})",
            style("i").blue().bold(),
            config.provider.name,
            style(&config.default_model).cyan()
        );
    }
    for model in &config.models {
        if *model == config.default_model {
            println!("  {} {} {}", style("●").green(), model, style("(default)").dim());
        } else {
            println!("  {} {}", style("○").dim(), model);
        }
    }
    println!();
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{head}...")
}
