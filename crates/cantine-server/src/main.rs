//! cantine-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cantine-server --hash-password
//! ```
//!
//! # Seeding an offline device
//!
//! `--export FILE` writes a JSON snapshot of the whole store and exits; the
//! client's `import` command loads it into a local store. `--import FILE`
//! does the reverse on the server.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use cantine_core::snapshot::Snapshot;
use cantine_server::{AppState, ServerConfig, auth::AuthConfig};
use cantine_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cantine meal-tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Write a JSON snapshot of the store to FILE and exit.
  #[arg(long, value_name = "FILE", conflicts_with = "import")]
  export: Option<PathBuf>,

  /// Load a JSON snapshot from FILE into the store and exit. Existing
  /// records are kept.
  #[arg(long, value_name = "FILE")]
  import: Option<PathBuf>,
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

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CANTINE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = cli.export {
    return export(&store, &path).await;
  }
  if let Some(path) = cli.import {
    return import(&store, &path).await;
  }

  let state = AppState::new(
    store,
    AuthConfig {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    },
    server_cfg.session_ttl(),
  );

  let app = cantine_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

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

async fn export(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let snapshot = store.export_snapshot().await.context("failed to read the store")?;
  let json = serde_json::to_vec_pretty(&snapshot)?;
  tokio::fs::write(path, json)
    .await
    .with_context(|| format!("failed to write {path:?}"))?;
  tracing::info!(
    consumers = snapshot.consumers.len(),
    presences = snapshot.presences.len(),
    consumptions = snapshot.consumptions.len(),
    "snapshot written to {}",
    path.display()
  );
  Ok(())
}

async fn import(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read {path:?}"))?;
  let snapshot: Snapshot = serde_json::from_slice(&bytes).context("malformed snapshot")?;
  let summary = store.import_snapshot(snapshot).await.context("import failed")?;
  println!(
    "imported {} consumers, {} presences, {} consumptions ({} skipped)",
    summary.consumers, summary.presences, summary.consumptions, summary.skipped
  );
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "cannot listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
