//! Handlers for the caller's own account.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | Forwarding address plus credit balance |
//! | `GET`  | `/credits` | `{credits, hasActiveSubscription}` |

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tripbox_core::store::TravelStore;
use tripbox_ingest::{Balance, CreditLedger};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub user_id:                 Uuid,
  pub forwarding_address:      String,
  pub credits:                 i64,
  pub has_active_subscription: bool,
  pub subscription_expires_at: Option<DateTime<Utc>>,
}

/// `GET /me`
pub async fn me<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<Profile>, ApiError> {
  let user = store
    .get_user(caller.0)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", caller.0)))?;

  Ok(Json(Profile {
    user_id:                 user.user_id,
    forwarding_address:      user.forwarding_address,
    credits:                 user.credits.credits,
    has_active_subscription: user.credits.has_active_subscription(Utc::now()),
    subscription_expires_at: user.credits.subscription_expires_at,
  }))
}

/// `GET /credits`
pub async fn credits<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<Balance>, ApiError> {
  let balance = CreditLedger::new(store).get_balance(caller.0).await?;
  Ok(Json(balance))
}
