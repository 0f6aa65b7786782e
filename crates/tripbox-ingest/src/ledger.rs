//! The credit ledger: the only code that mutates a user's balance.
//!
//! Deduction goes through the store's atomic conditional decrement, so
//! concurrent ingestions for one user can never drive the balance below zero.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tripbox_core::{store::TravelStore, user::CreditState};
use uuid::Uuid;

use crate::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
  pub credits:                 i64,
  pub has_active_subscription: bool,
}

/// How a unit of consumption was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
  /// Covered by an active subscription; the balance was not touched.
  Subscription,
  /// One credit was taken from the balance.
  Credit,
  /// Nothing to pay with.
  Declined,
}

impl Charge {
  pub fn succeeded(self) -> bool { !matches!(self, Self::Declined) }
}

pub struct CreditLedger<S> {
  store: Arc<S>,
}

impl<S> Clone for CreditLedger<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: TravelStore> CreditLedger<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn state(&self, user_id: Uuid) -> Result<CreditState> {
    self
      .store
      .credit_state(user_id)
      .await
      .map_err(IngestError::store)?
      .ok_or(IngestError::UserNotFound(user_id))
  }

  pub async fn get_balance(&self, user_id: Uuid) -> Result<Balance> {
    let state = self.state(user_id).await?;
    Ok(Balance {
      credits:                 state.credits,
      has_active_subscription: state.has_active_subscription(Utc::now()),
    })
  }

  /// Whether `user_id` could pay for one document right now.
  pub async fn can_consume(&self, user_id: Uuid) -> Result<bool> {
    let balance = self.get_balance(user_id).await?;
    Ok(balance.has_active_subscription || balance.credits > 0)
  }

  /// Pay for one document, reporting how it was paid.
  pub async fn charge(&self, user_id: Uuid) -> Result<Charge> {
    if self.state(user_id).await?.has_active_subscription(Utc::now()) {
      return Ok(Charge::Subscription);
    }
    let taken = self
      .store
      .try_decrement_credits(user_id)
      .await
      .map_err(IngestError::store)?;
    Ok(if taken { Charge::Credit } else { Charge::Declined })
  }

  /// Pay for one document. Returns `false` (and leaves the balance alone)
  /// when there is neither a subscription nor a credit.
  pub async fn deduct(&self, user_id: Uuid) -> Result<bool> {
    Ok(self.charge(user_id).await?.succeeded())
  }

  /// Add `amount` credits, e.g. after a purchase or promotion. Returns the new
  /// balance.
  pub async fn add(&self, user_id: Uuid, amount: i64) -> Result<i64> {
    if amount <= 0 {
      return Err(IngestError::InvalidCreditAmount(amount));
    }
    self
      .store
      .add_credits(user_id, amount)
      .await
      .map_err(IngestError::store)
  }
}
