use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{HttpDeviceClient, SessionController};
use shared::domain::DeviceAddress;
use storage::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod config;
mod panel;

use config::load_settings;
use panel::{parse_command, Command, Panel, HELP};

/// Terminal control panel for an RSHN LED driver.
#[derive(Parser, Debug)]
#[command(name = "rshn")]
struct Args {
    /// Connect to this address instead of the last one used.
    #[arg(long)]
    address: Option<String>,
    /// Config file (default: ./rshn.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-request deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// SQLite url for the remembered device address.
    #[arg(long)]
    state_db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(timeout_ms) = args.timeout_ms {
        settings.request_timeout_ms = timeout_ms;
    }
    if let Some(state_db) = args.state_db {
        settings.state_database_url = state_db;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter)
                .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(
        SqliteStore::open(&settings.state_database_url)
            .await
            .context("failed to open local state")?,
    );
    store
        .health_check()
        .await
        .with_context(|| format!("local state at {} is unusable", settings.state_database_url))?;
    let device = Arc::new(HttpDeviceClient::with_timeout(Duration::from_millis(
        settings.request_timeout_ms,
    )));
    let session = match args.address {
        Some(address) => SessionController::new(device, store, DeviceAddress::new(address)),
        None => {
            SessionController::load(device, store, DeviceAddress::new(settings.default_address))
                .await
        }
    };

    let mut panel = Panel::new(session).await;
    println!("{HELP}\n");
    panel.start().await;
    println!("{}", panel.render().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            command => {
                if let Some(note) = panel.handle(command).await {
                    println!("{note}");
                }
            }
        }
        println!("{}", panel.render().await);
    }

    tracing::info!("control panel closed");
    Ok(())
}
