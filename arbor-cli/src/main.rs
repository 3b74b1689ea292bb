//! Arbor CLI (`arbor`)
//!
//! Boots an in-process tree store seeded from a JSON snapshot, connects a
//! client to it, runs one command and writes the snapshot back.

mod commands;
mod friends;
mod snapshot;

use anyhow::Context;
use arbor_client::{ClientConfig, TreeClient};
use arbor_store::{StoreConfig, StoreHandle};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arbor", version, about = "Arbor tree store demo")]
struct Args {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Snapshot file the tree is loaded from and saved back to
    #[arg(long)]
    data: Option<PathBuf>,

    /// Client config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store config (JSON)
    #[arg(long)]
    store_config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let client_config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    let store_config: StoreConfig = match &args.store_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text)?
        }
        None => StoreConfig::default(),
    };
    let data_path = args.data.unwrap_or_else(snapshot::default_data_path);

    let store = StoreHandle::spawn(store_config)?;
    snapshot::load(&store, &data_path).await?;

    let client = TreeClient::builder().config(client_config).build(store.clone()).await?;
    tracing::debug!(
        app = %client.config().app_name,
        data = %data_path.display(),
        "Running {:?}",
        args.command
    );
    let result = commands::run(&client, args.command).await;

    // Graceful disconnect lets the store run on-disconnect hooks before saving
    if let Err(e) = client.shutdown().await {
        tracing::error!("Shutdown error: {}", e);
    }
    snapshot::save(&store, &data_path).await?;
    store.shutdown().await;

    result
}

fn init_tracing(verbosity: u8) {
    let mut filter = EnvFilter::from_default_env();

    // Only apply defaults if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        if let Ok(directive) = level.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigint), Ok(mut sigterm)) =
            (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            return std::future::pending().await;
        };
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
