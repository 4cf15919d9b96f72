//! Catalist server and operator commands.
//!
//! Usage:
//!   catalist            # same as `catalist serve`
//!   catalist routes     # print the listing endpoints the stored settings yield
//!   catalist resync     # push every configured category once

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use catalist_kernel::sync::PushResult;
use catalist_kernel::{AppState, Config};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run the HTTP server.
    #[default]
    Serve,
    /// Print the listing endpoints registered from stored settings.
    Routes,
    /// Push every configured category to the collector and exit.
    Resync,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, prefix = %config.api_prefix, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    match args.command.unwrap_or_default() {
        Command::Serve => serve(&config, state).await,
        Command::Routes => {
            for path in state.route_table().paths() {
                println!("{path}");
            }
            Ok(())
        }
        Command::Resync => resync(&state).await,
    }
}

async fn serve(config: &Config, state: AppState) -> Result<()> {
    info!(
        endpoints = state.route_table().paths().len(),
        sync_enabled = state.dispatcher().enabled(),
        "Starting Catalist"
    );

    let app = catalist_kernel::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn resync(state: &AppState) -> Result<()> {
    let records = state.dispatcher().resync_all().await?;

    let mut failures = 0;
    for record in &records {
        let outcome = match &record.result {
            PushResult::Delivered { status } => format!("delivered ({status})"),
            PushResult::Rejected { status } => {
                failures += 1;
                format!("rejected ({status})")
            }
            PushResult::Failed { error } | PushResult::NotSent { error } => {
                failures += 1;
                format!("failed: {error}")
            }
        };
        println!("{}\t{} items\t{}\t{}", record.slug, record.items, record.url, outcome);
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} categories failed to sync", records.len());
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
