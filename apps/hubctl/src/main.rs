use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use control_store::{HttpControlStore, HttpStoreOptions};
use reconciler::{ControlReconciler, ReconcilerOptions};
use storage::Storage;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{execute, Command};
use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(about = "Keep a Security Hub standards control in its declared state")]
struct Cli {
    #[arg(long, default_value = "hubctl.toml")]
    config: PathBuf,
    /// Overrides the control plane endpoint from the config.
    #[arg(long)]
    endpoint: Option<String>,
    /// Overrides the state database from the config.
    #[arg(long)]
    state_db: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    if let Some(endpoint) = cli.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(state_db) = cli.state_db {
        settings.state_database_url = state_db;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let storage = Storage::new(&normalize_database_url(&settings.state_database_url)).await?;
    let store = HttpControlStore::with_options(
        &settings.endpoint,
        HttpStoreOptions {
            timeout: Duration::from_secs(settings.request_timeout_secs),
            page_size: settings.page_size,
        },
    )?;
    let reconciler = ControlReconciler::with_options(
        store,
        ReconcilerOptions {
            reason_policy: settings.reason_policy,
        },
    );

    let report = execute(cli.command, &reconciler, &storage).await?;
    print!("{report}");
    Ok(())
}
