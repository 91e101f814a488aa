//! Sia explorer daemon.
//!
//! Opens the index database and hash store under the data directory
//! and serves the explorer API. Consensus, the transaction pool, and
//! peer syncing live in external processes; their routes report
//! "not connected" until an adapter is wired in.

use anyhow::{Context, Result};
use clap::Parser;
use sia_api::AppState;
use sia_explorer::{Explorer, FileHashStore, IndexStore};
use sia_types::ConsensusState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod detached;

use config::Config;
use detached::{DetachedSyncer, DetachedTxPool};

/// Sia blockchain explorer daemon.
#[derive(Parser, Debug)]
#[command(name = "sia-explorerd")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sia-explorerd.toml")]
    config: PathBuf,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// API bind address
    #[arg(long)]
    api_bind: Option<String>,

    /// API basic-auth password
    #[arg(long)]
    api_password: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting sia-explorerd v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&args.config, &args)?;
    info!("data directory: {:?}", config.data_dir);
    info!("api: {}", config.api.bind_address);

    std::fs::create_dir_all(&config.data_dir).context("failed to create data directory")?;

    let index_path = config.data_dir.join("index");
    let store = IndexStore::open(index_path.to_str().context("non-utf8 data directory")?)?;
    let hash_store = FileHashStore::open(&config.data_dir)?;

    // the chain manager replays updates from genesis on subscription,
    // so a fresh daemon starts from the zero state
    let explorer = Arc::new(Explorer::new(
        ConsensusState::default(),
        Box::new(store),
        Box::new(hash_store),
    ));

    let mut state = AppState::new(
        explorer,
        Arc::new(DetachedSyncer),
        Arc::new(DetachedTxPool),
    );
    if let Some(password) = config.api.password.clone() {
        state = state.with_password(password);
    }

    let router = sia_api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.api.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.api.bind_address))?;
    info!("listening on {}", config.api.bind_address);

    axum_serve(listener, router).await?;

    info!("sia-explorerd stopped");
    Ok(())
}

async fn axum_serve(listener: tokio::net::TcpListener, router: axum::Router) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
