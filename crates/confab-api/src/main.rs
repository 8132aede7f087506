//! Confab CLI and REST API entry point.
//!
//! Binary name: `confab`
//!
//! Parses CLI arguments, initializes tracing, config, and the history store,
//! then dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use anyhow::bail;
use clap::Parser;
use clap_complete::generate;

use confab_core::chat::session::ChatSession;
use confab_infra::config::{load_config, resolve_data_dir};
use confab_observe::tracing_setup::{init_tracing, shutdown_tracing};
use confab_types::conversation::ConversationKey;

use cli::{Cli, Commands};
use state::{AppState, ChatStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,confab=debug",
        _ => "trace",
    };
    if let Err(e) = init_tracing(filter, cli.otel) {
        eprintln!("Warning: tracing setup failed: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need config or storage
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "confab", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();

    match cli.command {
        Commands::Personas => cli::catalog::list_personas(cli.json)?,

        Commands::Models => {
            let config = load_config(&data_dir).await;
            cli::catalog::list_models(&config, cli.json)?;
        }

        Commands::History { target } => {
            let config = load_config(&data_dir).await;
            let store = ChatStore::open(&data_dir, cli.ephemeral).await?;
            let key = target.key(&config.default_model);
            cli::history::show_history(&store, &key, cli.json).await?;
        }

        Commands::Export { target, output } => {
            let config = load_config(&data_dir).await;
            let store = ChatStore::open(&data_dir, cli.ephemeral).await?;
            let key = target.key(&config.default_model);
            cli::history::export_transcript(&store, &key, output.as_deref()).await?;
        }

        Commands::Conversations => {
            let store = ChatStore::open(&data_dir, cli.ephemeral).await?;
            cli::history::list_conversations(&store, cli.json).await?;
        }

        Commands::Chat {
            persona,
            model,
            session,
            prompt,
        } => {
            let state = AppState::init(cli.ephemeral).await?;

            let model = model.unwrap_or_else(|| state.config.default_model.clone());
            if !state.config.is_known_model(&model) {
                bail!(
                    "unknown model '{model}'; available: {}",
                    state.config.models.join(", ")
                );
            }

            let mut chat_session = match session {
                Some(session_id) => {
                    ChatSession::resume(ConversationKey::resolve(&session_id, &persona, &model))
                }
                None => ChatSession::new(model).with_persona(persona),
            };
            if let Some(prompt) = prompt {
                chat_session = chat_session.with_custom_prompt(prompt);
            }

            cli::chat::run_chat(&state, chat_session, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let state = AppState::init(cli.ephemeral).await?;

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Confab API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {} Generation via {}",
                console::style("🤖").bold(),
                console::style(state.orchestrator.provider_name()).cyan()
            );
            if !cli.ephemeral {
                println!(
                    "  {} History stored in {}",
                    console::style("💾").bold(),
                    console::style(state.data_dir.display()).dim()
                );
            }
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
