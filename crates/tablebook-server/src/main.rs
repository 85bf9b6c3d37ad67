//! tablebook server binary.
//!
//! Reads `tablebook.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, seeds the configured tables, and serves the
//! booking API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tablebook_api::AppState;
use tablebook_core::reservations::Reservations;
use tablebook_server::{ServerConfig, seed_tables};
use tablebook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Restaurant table booking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tablebook.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load and check configuration.
  let server_cfg = ServerConfig::load(&cli.config)?;
  let policy = server_cfg.policy()?;
  server_cfg.validate_tables()?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open_with_timeout(&store_path, server_cfg.store_timeout())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  seed_tables(&store, &server_cfg.tables)
    .await
    .context("failed to seed tables")?;

  // Build application state.
  let state = AppState::new(
    Reservations::new(Arc::new(store), policy),
    server_cfg.admin_id,
  );
  if server_cfg.admin_id.is_none() {
    tracing::warn!("no admin_id configured; admin endpoints will reject every caller");
  }

  let app = tablebook_server::app(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
