//! The Tripbox server: ingestion over HTTP.
//!
//! Wires the ingestion pipeline to its production collaborators (SQLite,
//! an HTTP extraction oracle, filesystem blobs, a push gateway) and exposes
//!
//! - `POST /webhooks/email`: inbound email deliveries, processed in the
//!   background;
//! - `POST /api/uploads` and `POST /api/ingest`: upload-triggered ingestion;
//! - the trip and document API from [`tripbox_api`] under `/api`.

#![allow(async_fn_in_trait)]

pub mod accounts;
pub mod blob;
pub mod config;
pub mod error;
pub mod notify;
pub mod oracle;
pub mod queue;
pub mod signature;
pub mod uploads;
pub mod webhook;

pub use crate::{config::ServerConfig, error::Error};

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tripbox_core::{
  blob::BlobStore, notify::Notifier, oracle::ExtractionOracle, store::TravelStore,
};
use tripbox_ingest::Ingestor;
use tripbox_store_sqlite::SqliteStore;

use blob::FsBlobStore;
use notify::PushNotifier;
use oracle::HttpOracle;
use queue::JobQueue;

/// Largest request body accepted: emails with several scanned attachments.
pub const MAX_BODY_BYTES: usize = 40 * 1024 * 1024;

// ─── Backend ─────────────────────────────────────────────────────────────────

/// The set of collaborators a server instance runs against.
pub trait Backend: Send + Sync + 'static {
  type Store: TravelStore + 'static;
  type Oracle: ExtractionOracle + 'static;
  type Blobs: BlobStore + 'static;
  type Push: Notifier + 'static;
}

/// SQLite, the HTTP oracle, filesystem blobs and the push gateway.
pub struct Production;

impl Backend for Production {
  type Store = SqliteStore;
  type Oracle = HttpOracle;
  type Blobs = FsBlobStore;
  type Push = PushNotifier;
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<B: Backend> {
  pub store:    Arc<B::Store>,
  pub blobs:    Arc<B::Blobs>,
  pub notifier: Arc<B::Push>,
  pub ingestor: Ingestor<B::Store, B::Oracle>,
  pub jobs:     JobQueue,
  pub config:   Arc<ServerConfig>,
}

impl<B: Backend> Clone for AppState<B> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      blobs:    Arc::clone(&self.blobs),
      notifier: Arc::clone(&self.notifier),
      ingestor: self.ingestor.clone(),
      jobs:     self.jobs.clone(),
      config:   Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<B: Backend>(state: AppState<B>) -> Router {
  let ingestion = Router::new()
    .route("/uploads", post(uploads::upload::<B>))
    .route("/ingest", post(uploads::ingest::<B>))
    .with_state(state.clone());
  let api = tripbox_api::api_router(Arc::clone(&state.store)).merge(ingestion);

  Router::new()
    .route("/health", get(health))
    .route("/webhooks/email", post(webhook::receive::<B>))
    .with_state(state)
    .nest("/api", api)
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod testing;
