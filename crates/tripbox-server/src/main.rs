//! tripbox server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store and serves the webhook and API over HTTP. The remaining
//! subcommands are small administrative tasks against the same store.
//!
//! ```text
//! tripbox --config /etc/tripbox.toml serve
//! tripbox create-user
//! tripbox grant-credits <user-id> 10
//! tripbox subscribe <user-id> 30
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tripbox_core::store::TravelStore;
use tripbox_ingest::{CreditLedger, Ingestor};
use tripbox_server::{
  AppState, Production, ServerConfig,
  accounts::provision_user,
  blob::FsBlobStore,
  notify::PushNotifier,
  oracle::HttpOracle,
  queue::spawn_worker,
  webhook::EmailProcessor,
};
use tripbox_store_sqlite::SqliteStore;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Tripbox ingestion server")]
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
  /// Create a user and print its id and forwarding address.
  CreateUser,
  /// Add promotional credits to a user's balance.
  GrantCredits { user_id: Uuid, amount: i64 },
  /// Give a user unlimited ingestion for the next `days` days.
  Subscribe { user_id: Uuid, days: i64 },
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

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(config, store).await,
    Command::CreateUser => {
      let user = provision_user(&store, &config.forwarding_domain, config.default_free_credits)
        .await
        .context("failed to create user")?;
      println!("{}\t{}", user.user_id, user.forwarding_address);
      Ok(())
    }
    Command::GrantCredits { user_id, amount } => {
      let ledger = CreditLedger::new(Arc::new(store));
      let balance = ledger.add(user_id, amount).await.context("failed to grant credits")?;
      println!("{user_id}\t{balance}");
      Ok(())
    }
    Command::Subscribe { user_id, days } => {
      if days <= 0 {
        bail!("days must be positive");
      }
      let term = Duration::try_days(days).context("subscription term out of range")?;
      if store.get_user(user_id).await?.is_none() {
        bail!("user {user_id} not found");
      }
      let expires_at = Utc::now() + term;
      store.set_subscription_expiry(user_id, Some(expires_at)).await?;
      println!("{user_id}\t{}", expires_at.to_rfc3339());
      Ok(())
    }
  }
}

async fn serve(config: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  if config.is_production() && config.webhook_signing_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
    tracing::warn!("webhook_signing_key is not set; every email delivery will be rejected");
  }

  let blob_dir = expand_tilde(&config.blob_dir);
  let store = Arc::new(store);
  let oracle = Arc::new(HttpOracle::new(&config.oracle).context("failed to build oracle client")?);
  let blobs = Arc::new(FsBlobStore::new(&blob_dir, config.public_blob_url.clone()));
  let notifier =
    Arc::new(PushNotifier::new(config.push_endpoint.clone()).context("failed to build push client")?);
  let ingestor = Ingestor::new(Arc::clone(&store), oracle);

  let processor = EmailProcessor::<Production>::new(
    Arc::clone(&blobs),
    Arc::clone(&notifier),
    ingestor.clone(),
  );
  let (jobs, worker) = spawn_worker(processor, config.queue_capacity);

  let address = format!("{}:{}", config.host, config.port);

  // Build application state.
  let state = AppState::<Production> {
    store,
    blobs,
    notifier,
    ingestor,
    jobs,
    config: Arc::new(config),
  };

  let app = tripbox_server::router(state).nest_service("/blobs", ServeDir::new(&blob_dir));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router owned the last queue handle; the worker now drains and stops.
  tracing::info!("waiting for queued email jobs");
  worker.await.context("email worker panicked")?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
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
