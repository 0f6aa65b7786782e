//! Test doubles shared by the unit tests of this crate.

use std::sync::{
  Mutex,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{DateTime, NaiveDate, Utc};
use tripbox_core::{
  document::{Document, Fingerprint, NewDocument},
  oracle::{ExtractionOracle, OracleRequest},
  store::{DocumentQuery, TravelStore},
  trip::{NewTrip, Trip, TripDeleteMode, TripUpdate},
  user::{CreditState, User},
};
use tripbox_store_sqlite::{Error as StoreError, SqliteStore};
use uuid::Uuid;

// ─── Oracle ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("oracle unavailable: {0}")]
pub struct OracleDown(String);

/// An oracle that gives the same answer to every request and remembers what
/// it was asked.
pub struct ScriptedOracle {
  reply:    Result<String, String>,
  calls:    AtomicUsize,
  requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
  pub fn replying(reply: impl Into<String>) -> Self { Self::new(Ok(reply.into())) }

  pub fn failing(message: impl Into<String>) -> Self { Self::new(Err(message.into())) }

  fn new(reply: Result<String, String>) -> Self {
    Self { reply, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn last_request(&self) -> Option<OracleRequest> {
    self.requests.lock().unwrap().last().cloned()
  }
}

impl ExtractionOracle for ScriptedOracle {
  type Error = OracleDown;

  async fn complete(&self, request: &OracleRequest) -> Result<String, OracleDown> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.requests.lock().unwrap().push(request.clone());
    self.reply.clone().map_err(OracleDown)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An in-memory store whose document writes can be made to fail.
pub struct FlakyStore {
  inner:        SqliteStore,
  fail_inserts: AtomicBool,
}

impl FlakyStore {
  pub async fn new() -> Self {
    Self {
      inner:        SqliteStore::open_in_memory().await.unwrap(),
      fail_inserts: AtomicBool::new(false),
    }
  }

  pub fn fail_inserts(&self, fail: bool) { self.fail_inserts.store(fail, Ordering::SeqCst); }
}

impl TravelStore for FlakyStore {
  type Error = StoreError;

  async fn create_user(&self, address: String, credits: i64) -> Result<User, StoreError> {
    self.inner.create_user(address, credits).await
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
    self.inner.get_user(user_id).await
  }

  async fn find_user_by_forwarding_address(
    &self,
    address: &str,
  ) -> Result<Option<User>, StoreError> {
    self.inner.find_user_by_forwarding_address(address).await
  }

  async fn credit_state(&self, user_id: Uuid) -> Result<Option<CreditState>, StoreError> {
    self.inner.credit_state(user_id).await
  }

  async fn try_decrement_credits(&self, user_id: Uuid) -> Result<bool, StoreError> {
    self.inner.try_decrement_credits(user_id).await
  }

  async fn add_credits(&self, user_id: Uuid, amount: i64) -> Result<i64, StoreError> {
    self.inner.add_credits(user_id, amount).await
  }

  async fn set_subscription_expiry(
    &self,
    user_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<(), StoreError> {
    self.inner.set_subscription_expiry(user_id, expires_at).await
  }

  async fn create_trip(&self, input: NewTrip) -> Result<Trip, StoreError> {
    self.inner.create_trip(input).await
  }

  async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, StoreError> {
    self.inner.get_trip(trip_id).await
  }

  async fn list_trips(&self, user_id: Uuid, archived: bool) -> Result<Vec<Trip>, StoreError> {
    self.inner.list_trips(user_id, archived).await
  }

  async fn update_trip(&self, id: Uuid, update: TripUpdate) -> Result<Option<Trip>, StoreError> {
    self.inner.update_trip(id, update).await
  }

  async fn set_trip_archived(&self, id: Uuid, archived: bool) -> Result<Option<Trip>, StoreError> {
    self.inner.set_trip_archived(id, archived).await
  }

  async fn delete_trip(&self, id: Uuid, mode: TripDeleteMode) -> Result<bool, StoreError> {
    self.inner.delete_trip(id, mode).await
  }

  async fn trips_containing(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Trip>, StoreError> {
    self.inner.trips_containing(user_id, date).await
  }

  async fn insert_document(&self, input: NewDocument) -> Result<Document, StoreError> {
    if self.fail_inserts.load(Ordering::SeqCst) {
      return Err(StoreError::Decode("injected write failure".into()));
    }
    self.inner.insert_document(input).await
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
    self.inner.get_document(id).await
  }

  async fn find_document_by_fingerprint(
    &self,
    user_id: Uuid,
    fingerprint: &Fingerprint,
  ) -> Result<Option<Document>, StoreError> {
    self.inner.find_document_by_fingerprint(user_id, fingerprint).await
  }

  async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Document>, StoreError> {
    self.inner.list_documents(query).await
  }

  async fn mark_document_read(&self, id: Uuid) -> Result<bool, StoreError> {
    self.inner.mark_document_read(id).await
  }

  async fn assign_document(
    &self,
    id: Uuid,
    trip_id: Option<Uuid>,
  ) -> Result<Option<Document>, StoreError> {
    self.inner.assign_document(id, trip_id).await
  }

  async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
    self.inner.delete_document(id).await
  }
}
