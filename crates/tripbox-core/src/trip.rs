//! Trip — a user-defined date range that documents are filed under.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
  pub trip_id:     Uuid,
  pub user_id:     Uuid,
  pub name:        String,
  pub start_date:  NaiveDate,
  pub end_date:    NaiveDate,
  /// Archived trips are hidden and never auto-matched; nothing is deleted.
  pub is_archived: bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Trip {
  /// Whether `date` lies within `[start_date, end_date]`, both ends inclusive.
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start_date <= date && date <= self.end_date
  }
}

/// Input to [`crate::store::TravelStore::create_trip`]. The caller validates
/// that `start_date <= end_date`.
#[derive(Debug, Clone)]
pub struct NewTrip {
  pub user_id:    Uuid,
  pub name:       String,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
  pub name:       Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
}

/// What happens to a trip's documents when the trip is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripDeleteMode {
  /// Documents move back to the inbox.
  #[default]
  DetachDocuments,
  /// Documents are deleted together with the trip.
  DeleteDocuments,
}
