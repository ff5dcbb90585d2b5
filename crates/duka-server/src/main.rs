//! duka server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `DUKA_*` environment variables, opens the SQLite store and serves the
//! storefront API over HTTP.
//!
//! # Granting the admin role
//!
//! New accounts always get the `user` role. Promote one with:
//!
//! ```
//! cargo run -p duka-server --bin duka -- --grant-admin owner@example.com
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use duka_core::{
  clock::SystemClock,
  identity::{IdentityProvider as _, Role},
};
use duka_server::{AppState, ServerConfig};
use duka_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Duka storefront server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Give the account with this email the admin role and exit.
  #[arg(long, value_name = "EMAIL")]
  grant_admin: Option<String>,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DUKA"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.media_dir = expand_tilde(&server_cfg.media_dir);

  // Open SQLite store.
  let store_path = server_cfg.store_path.clone();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(Arc::new(store), server_cfg, Arc::new(SystemClock));

  // Helper mode: promote an account and exit.
  if let Some(email) = cli.grant_admin {
    let found = state
      .identity
      .set_role(&email, Role::Admin)
      .await
      .with_context(|| format!("failed to update role for {email}"))?;
    anyhow::ensure!(found, "no account registered for {email}");
    println!("{email} is now an admin");
    return Ok(());
  }

  let app = duka_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
