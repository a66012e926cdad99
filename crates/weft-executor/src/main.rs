//! Weft executor daemon entry point.
//!
//! Binary name: `weft-executor`
//!
//! Loads configuration from the data directory, opens the schedule
//! database, connects to the control plane, and runs the poll loop until
//! SIGINT.

mod poll_runner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use poll_runner::PollRunner;
use weft_core::poll::PollCursorTracker;
use weft_infra::config::{decode_private_key, load_executor_config};
use weft_infra::control_plane::ControlPlaneClient;
use weft_infra::sqlite::{DatabasePool, SqliteScheduleStore};

#[derive(Parser)]
#[command(name = "weft-executor", about = "Weft workflow-automation executor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the executor daemon.
    Run {
        /// Data directory holding config.toml and the schedule database.
        /// Defaults to $WEFT_DATA_DIR, then ~/.weft.
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Export traces via the OpenTelemetry stdout exporter.
        #[arg(long)]
        otel: bool,
    },
}

fn default_data_dir() -> PathBuf {
    std::env::var("WEFT_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".weft")
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { data_dir, otel } => run(data_dir, otel).await,
    }
}

async fn run(data_dir: Option<PathBuf>, otel: bool) -> anyhow::Result<()> {
    weft_observe::tracing_setup::init_tracing(otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = data_dir.unwrap_or_else(default_data_dir);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let config = load_executor_config(&data_dir).await;
    info!(executor_id = config.executor_id, "starting executor");

    // The key is required up front so a misconfigured executor fails at
    // startup, not on the first credentialed action.
    let private_key =
        decode_private_key(&config).context("loading executor private key from config")?;
    info!(
        public_key = STANDARD.encode(private_key.public_key().as_bytes()),
        "credential key loaded"
    );

    let database_url = format!(
        "sqlite://{}?mode=rwc",
        data_dir.join(&config.database_path).display()
    );
    let pool = DatabasePool::new(&database_url)
        .await
        .context("opening schedule database")?;
    let store = Arc::new(SqliteScheduleStore::new(pool));

    let control_plane = Arc::new(
        ControlPlaneClient::new(&config.control_plane, config.executor_id.clone())
            .context("building control-plane client")?,
    );

    let tracker = Arc::new(PollCursorTracker::new(
        Arc::clone(&store) as _,
        Arc::clone(&control_plane) as _,
    ));
    let runner = PollRunner::new(
        store,
        tracker,
        Duration::from_secs(config.polling.tick_interval_seconds),
    );
    // Integrations compiled into this build register their poll sources
    // here via `runner.register_source(..)`.

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    runner.run(shutdown).await;
    weft_observe::tracing_setup::shutdown_tracing();
    Ok(())
}
