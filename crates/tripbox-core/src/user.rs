//! User records as seen by the ingestion pipeline: a forwarding address and
//! the embedded credit ledger state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_id:            Uuid,
  /// Unique inbound address, e.g. `trip-k3j9x0a2qz@in.example.com`.
  pub forwarding_address: String,
  pub credits:            CreditState,
  pub created_at:         DateTime<Utc>,
}

/// Credit balance plus optional unlimited-use subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditState {
  pub credits:                 i64,
  pub subscription_expires_at: Option<DateTime<Utc>>,
}

impl CreditState {
  /// A subscription is active iff its expiry is present and after `now`.
  pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
    self.subscription_expires_at.is_some_and(|at| at > now)
  }
}
