//! muster server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), layered under
//! `MUSTER_*` environment variables, opens the SQLite store, seeds the
//! configured roles, and serves the member site over HTTP.
//!
//! # First staff account
//!
//! ```
//! cargo run -p muster-web --bin server -- create-superuser \
//!   --username admin --email admin@org.domain --first-name Ada --last-name Admin
//! ```
//!
//! The password is read from stdin.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use muster_card::{CardAssets, CardStudio};
use muster_core::validation::EmailPolicy;
use muster_store_sqlite::SqliteStore;
use muster_web::{
  AppState, ServerConfig,
  setup::{self, Superuser},
};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Muster membership server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Create an approved superuser; the password is read from stdin.
  CreateSuperuser {
    #[arg(long)]
    username:   String,
    #[arg(long)]
    email:      String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name:  String,
  },
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
  let server_cfg = load_config(&cli.config)?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  setup::seed_roles(&store, &server_cfg.roles)
    .await
    .context("failed to seed roles")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::CreateSuperuser { username, email, first_name, last_name } => {
      let password = read_password()?;
      let su = Superuser { username, email, first_name, last_name, password };
      let identity = setup::create_superuser(&store, su)
        .await
        .context("failed to create superuser")?;
      println!("created superuser {} ({})", identity.username, identity.public_id);
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let asset_dir = expand_tilde(&server_cfg.asset_dir);
  let assets = CardAssets::load(&asset_dir)
    .with_context(|| format!("failed to load card assets from {asset_dir:?}"))?;
  let media_dir = expand_tilde(&server_cfg.media_dir);
  let studio = CardStudio::new(
    assets,
    &media_dir,
    server_cfg.base_url.clone(),
    server_cfg.card_retention,
  )
  .with_context(|| format!("failed to prepare card studio in {media_dir:?}"))?;
  let policy = EmailPolicy::new(&server_cfg.email_domain)
    .with_context(|| format!("invalid email domain {:?}", server_cfg.email_domain))?;

  // Build application state.
  let state = AppState {
    store:  Arc::new(store),
    studio: Arc::new(studio),
    policy: Arc::new(policy),
    config: Arc::new(server_cfg.clone()),
  };

  let app = muster_web::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// File, then `MUSTER_*` variables, then a bare `URL` for the public origin.
fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("MUSTER"))
    .set_override_option("base_url", std::env::var("URL").ok())
    .context("invalid URL override")?
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Read a password from the first line of stdin.
fn read_password() -> anyhow::Result<String> {
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
