//! JSON REST API for Tripbox.
//!
//! Exposes an axum [`Router`] over any [`tripbox_core::store::TravelStore`]:
//! trips, documents and the caller's account. Ingestion endpoints need an
//! extraction oracle and a blob store and live in the server crate.
//! Authentication, TLS and transport concerns are the caller's
//! responsibility; see [`caller`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tripbox_api::api_router(store.clone()))
//! ```

pub mod account;
pub mod caller;
pub mod documents;
pub mod error;
pub mod trips;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tripbox_core::store::TravelStore;

pub use caller::Caller;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TravelStore + 'static,
{
  Router::new()
    // Trips
    .route("/trips", get(trips::list::<S>).post(trips::create::<S>))
    .route(
      "/trips/{id}",
      get(trips::get_one::<S>).patch(trips::update::<S>).delete(trips::delete::<S>),
    )
    .route("/trips/{id}/archive", post(trips::archive::<S>))
    // Documents
    .route("/documents", get(documents::list::<S>))
    .route("/documents/{id}", get(documents::get_one::<S>).delete(documents::delete::<S>))
    .route("/documents/{id}/read", post(documents::mark_read::<S>))
    .route("/documents/{id}/assign", post(documents::assign::<S>))
    // Account
    .route("/me", get(account::me::<S>))
    .route("/credits", get(account::credits::<S>))
    .with_state(store)
}
