#![forbid(unsafe_code)]

//! `cheeseday` — Messenger joke bot binary.
//!
//! Loads configuration and connects the joke store. Then it either serves
//! the webhook with the hourly broadcast scheduler, runs a single broadcast,
//! pushes the page settings, or imports jokes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

use cheeseday::bot::broadcast::BroadcastOutcome;
use cheeseday::bot::scheduler;
use cheeseday::config::GlobalConfig;
use cheeseday::messenger::client::GraphApiClient;
use cheeseday::models::joke::NewJoke;
use cheeseday::persistence::db;
use cheeseday::persistence::joke_repo::JokeRepo;
use cheeseday::server;
use cheeseday::state::AppState;
use cheeseday::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cheeseday", about = "Cheese joke of the day Messenger bot", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Serve the webhook and run the hourly broadcast scheduler.
    Serve,
    /// Run one broadcast for the current hour and exit.
    Broadcast,
    /// Push greeting text, get-started button and persistent menu.
    InitPage,
    /// Append jokes from a JSON array file to the store.
    Import {
        /// File holding `[{"prompt", "button_label", "answer", "answer_image_url"}]`.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!(command = ?args.command, "cheeseday bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.database_path).await?);
    info!(path = %config.database_path.display(), "database connected");

    let command = match args.command {
        Command::Import { path } => return import(&db, &path).await,
        other => other,
    };

    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    let channel = Arc::new(GraphApiClient::new(&config.messenger)?);
    let state = AppState::new(config, db, channel);

    match command {
        Command::Serve => serve(state).await,
        Command::Broadcast => {
            let now = Utc::now();
            let outcome = state
                .broadcast_task()
                .run(now)
                .instrument(info_span!("broadcast", %now))
                .await;
            println!("{outcome}");
            match outcome {
                BroadcastOutcome::Completed(_) => Ok(()),
                BroadcastOutcome::Failed(err) => Err(err),
            }
        }
        Command::InitPage => {
            state.channel.configure_page(&state.page_settings()).await?;
            println!("page settings updated");
            Ok(())
        }
        Command::Import { .. } => Ok(()),
    }
}

async fn import(db: &db::Database, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::Io(format!("cannot read {}: {err}", path.display())))?;
    let jokes: Vec<NewJoke> = serde_json::from_str(&raw)
        .map_err(|err| AppError::Config(format!("invalid joke file: {err}")))?;

    let mut conn = db::acquire(db).await?;
    let mut repo = JokeRepo::new(&mut conn);
    for joke in &jokes {
        let stored = repo.insert(joke).await?;
        info!(joke_id = stored.id, "joke imported");
    }
    println!("imported {} jokes", jokes.len());
    Ok(())
}

async fn serve(state: AppState) -> Result<()> {
    let ct = CancellationToken::new();

    // ── Start broadcast scheduler ───────────────────────
    let scheduler_handle = if state.config.broadcast.enabled {
        info!(
            local_hour = state.config.broadcast.local_hour,
            "broadcast scheduler started"
        );
        Some(scheduler::spawn_broadcast_task(
            state.broadcast_task(),
            ct.clone(),
        ))
    } else {
        info!("broadcast disabled; webhook only");
        None
    };

    // ── Start webhook server ────────────────────────────
    let server_ct = ct.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(state, server_ct).await {
            error!(%err, "webhook server failed");
        }
    });

    info!("cheeseday ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    if let Err(err) = server_handle.await {
        error!(%err, "webhook server task panicked");
    }
    if let Some(handle) = scheduler_handle {
        if let Err(err) = handle.await {
            error!(%err, "broadcast scheduler task panicked");
        }
    }
    info!("cheeseday shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
