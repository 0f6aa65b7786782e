//! The `TravelStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tripbox-store-sqlite`).
//! The ingestion pipeline and the HTTP layers depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  document::{Category, Document, Fingerprint, NewDocument},
  trip::{NewTrip, Trip, TripDeleteMode, TripUpdate},
  user::{CreditState, User},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Which trip assignment a document listing is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TripFilter {
  #[default]
  Any,
  /// Only unassigned documents.
  Inbox,
  Trip(Uuid),
}

/// Parameters for [`TravelStore::list_documents`]. Results are ordered newest
/// first.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
  pub user_id:     Uuid,
  pub trip:        TripFilter,
  pub category:    Option<Category>,
  pub unread_only: bool,
}

impl DocumentQuery {
  pub fn for_user(user_id: Uuid) -> Self {
    Self { user_id, trip: TripFilter::Any, category: None, unread_only: false }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational storage behind the pipeline.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TravelStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user with the given forwarding address and starting balance.
  fn create_user(
    &self,
    forwarding_address: String,
    initial_credits: i64,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up the owner of an inbound address. Matching is case-insensitive.
  fn find_user_by_forwarding_address<'a>(
    &'a self,
    address: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Credits ───────────────────────────────────────────────────────────

  /// Current balance and subscription expiry; `None` for unknown users.
  fn credit_state(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<CreditState>, Self::Error>> + Send + '_;

  /// Decrement the balance by one iff it is positive, as a single atomic
  /// operation. Returns whether a credit was taken.
  fn try_decrement_credits(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Increment the balance unconditionally and return the new balance.
  fn add_credits(
    &self,
    user_id: Uuid,
    amount: i64,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn set_subscription_expiry(
    &self,
    user_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Trips ─────────────────────────────────────────────────────────────

  fn create_trip(
    &self,
    input: NewTrip,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  fn get_trip(
    &self,
    trip_id: Uuid,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  /// A user's trips ordered by start date.
  fn list_trips(
    &self,
    user_id: Uuid,
    include_archived: bool,
  ) -> impl Future<Output = Result<Vec<Trip>, Self::Error>> + Send + '_;

  /// Apply `update`; returns the updated trip or `None` if it does not exist.
  fn update_trip(
    &self,
    trip_id: Uuid,
    update: TripUpdate,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  fn set_trip_archived(
    &self,
    trip_id: Uuid,
    archived: bool,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + '_;

  /// Delete a trip, detaching or deleting its documents per `mode`, in one
  /// transaction. Returns `false` if the trip did not exist.
  fn delete_trip(
    &self,
    trip_id: Uuid,
    mode: TripDeleteMode,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Non-archived trips of `user_id` whose inclusive range contains `date`,
  /// ordered by `(start_date, trip_id)`.
  fn trips_containing(
    &self,
    user_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Trip>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn insert_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  fn get_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Any one document of `user_id` carrying `fingerprint`.
  fn find_document_by_fingerprint<'a>(
    &'a self,
    user_id: Uuid,
    fingerprint: &'a Fingerprint,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  fn list_documents<'a>(
    &'a self,
    query: &'a DocumentQuery,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Returns `false` if the document does not exist.
  fn mark_document_read(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Move a document to a trip, or back to the inbox with `None`.
  fn assign_document(
    &self,
    document_id: Uuid,
    trip_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn delete_document(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
