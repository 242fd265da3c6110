//! vitrine-admin-api server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite backend with an elevated handle, and serves the privileged
//! account functions over HTTP.
//!
//! # Bootstrapping the first admin
//!
//! The functions only accept admin callers, so a fresh database needs one
//! seeded out-of-band:
//!
//! ```
//! cargo run -p vitrine-admin-api --bin server -- --seed-admin admin@example.org
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vitrine_admin_api::{AppState, ServerConfig};
use vitrine_core::{
  account::{AdminDirectory as _, NewAccount},
  role::Role,
};
use vitrine_store_sqlite::SqliteBackend;

#[derive(Parser)]
#[command(author, version, about = "Vitrine privileged account functions")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an admin account for this email (password read from stdin)
  /// and exit.
  #[arg(long, value_name = "EMAIL")]
  seed_admin: Option<String>,

  /// Display name for `--seed-admin`.
  #[arg(long, default_value = "Administrator")]
  seed_name: String,
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
    .add_source(config::Environment::with_prefix("VITRINE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in the database path and open the backend.
  let database_path = expand_tilde(&server_cfg.database_path);
  let backend = SqliteBackend::open(&database_path)
    .await
    .with_context(|| format!("failed to open backend at {database_path:?}"))?;

  // Helper mode: seed an admin account and exit.
  if let Some(email) = cli.seed_admin {
    let password = password_from_stdin()?;
    let profile = backend
      .create_account(
        &NewAccount {
          name:       cli.seed_name,
          email,
          department: None,
          role:       Role::Admin,
        },
        &password,
      )
      .await
      .context("failed to seed admin account")?;
    println!("seeded admin {} ({})", profile.email, profile.user_id);
    return Ok(());
  }

  // Build application state and serve.
  let state = AppState {
    store:  Arc::new(backend),
    config: Arc::new(server_cfg.clone()),
  };
  let app = vitrine_admin_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn password_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
