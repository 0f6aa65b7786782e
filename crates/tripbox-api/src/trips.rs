//! Handlers for `/trips` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/trips` | Optional `?includeArchived=true` |
//! | `POST`   | `/trips` | Body: [`CreateBody`]; returns 201 |
//! | `GET`    | `/trips/{id}` | 404 if missing or not the caller's |
//! | `PATCH`  | `/trips/{id}` | Body: partial `{name, startDate, endDate}` |
//! | `DELETE` | `/trips/{id}` | `?mode=detachDocuments` (default) or `deleteDocuments` |
//! | `POST`   | `/trips/{id}/archive` | Body: `{"archived": bool}`, default `true` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tripbox_core::{
  store::TravelStore,
  trip::{NewTrip, Trip, TripDeleteMode, TripUpdate},
};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// Fetch `trip_id` if it belongs to `caller`. Someone else's trip is
/// indistinguishable from a missing one.
pub(crate) async fn owned_trip<S: TravelStore>(
  store: &S,
  caller: Caller,
  trip_id: Uuid,
) -> Result<Trip, ApiError> {
  store
    .get_trip(trip_id)
    .await
    .map_err(ApiError::store)?
    .filter(|t| t.user_id == caller.0)
    .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
  if start > end {
    return Err(ApiError::BadRequest(format!("startDate {start} is after endDate {end}")));
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  #[serde(default)]
  pub include_archived: bool,
}

/// `GET /trips[?includeArchived=true]`
pub async fn list<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Trip>>, ApiError> {
  let trips = store
    .list_trips(caller.0, params.include_archived)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(trips))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub name:       String,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
}

/// `POST /trips`: 201 with the stored trip.
pub async fn create<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = body.name.trim().to_owned();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  check_range(body.start_date, body.end_date)?;

  let trip = store
    .create_trip(NewTrip {
      user_id: caller.0,
      name,
      start_date: body.start_date,
      end_date: body.end_date,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(trip)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /trips/{id}`
pub async fn get_one<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Trip>, ApiError> {
  Ok(Json(owned_trip(&*store, caller, id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /trips/{id}`
pub async fn update<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(update): Json<TripUpdate>,
) -> Result<Json<Trip>, ApiError> {
  let current = owned_trip(&*store, caller, id).await?;
  check_range(
    update.start_date.unwrap_or(current.start_date),
    update.end_date.unwrap_or(current.end_date),
  )?;
  if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }

  let trip = store
    .update_trip(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("trip {id} not found")))?;
  Ok(Json(trip))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
  #[serde(default)]
  pub mode: TripDeleteMode,
}

/// `DELETE /trips/{id}[?mode=deleteDocuments]`: 204.
pub async fn delete<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
  owned_trip(&*store, caller, id).await?;
  store.delete_trip(id, params.mode).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
  #[serde(default = "default_archived")]
  pub archived: bool,
}

fn default_archived() -> bool { true }

/// `POST /trips/{id}/archive`; send `{"archived": false}` to unarchive.
pub async fn archive<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ArchiveBody>,
) -> Result<Json<Trip>, ApiError> {
  owned_trip(&*store, caller, id).await?;
  let trip = store
    .set_trip_archived(id, body.archived)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("trip {id} not found")))?;
  Ok(Json(trip))
}
