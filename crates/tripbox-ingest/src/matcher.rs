//! Auto-filing of dated documents.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tripbox_core::{store::TravelStore, trip::Trip};
use uuid::Uuid;

use crate::{IngestError, Result};

pub struct TripMatcher<S> {
  store: Arc<S>,
}

impl<S> Clone for TripMatcher<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: TravelStore> TripMatcher<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The non-archived trip of `user_id` whose inclusive date range contains
  /// the calendar date of `date`. When several qualify, the earliest-starting
  /// one wins, ties broken by id. `None` is an ordinary outcome.
  pub async fn find_matching_trip(
    &self,
    user_id: Uuid,
    date: NaiveDateTime,
  ) -> Result<Option<Trip>> {
    let day = date.date();
    let candidates = self
      .store
      .trips_containing(user_id, day)
      .await
      .map_err(IngestError::store)?;

    Ok(
      candidates
        .into_iter()
        .filter(|trip| trip.user_id == user_id && !trip.is_archived && trip.contains(day))
        .min_by_key(|trip| (trip.start_date, trip.trip_id)),
    )
  }
}
