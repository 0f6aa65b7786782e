//! Handlers for `/documents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/documents` | Optional `inbox`, `tripId`, `category`, `unread` |
//! | `GET`    | `/documents/{id}` | 404 if missing or not the caller's |
//! | `DELETE` | `/documents/{id}` | 204 |
//! | `POST`   | `/documents/{id}/read` | Marks read; returns the document |
//! | `POST`   | `/documents/{id}/assign` | Body: `{"tripId": <id> \| null}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde::Deserialize;
use tripbox_core::{
  document::{Category, Document},
  store::{DocumentQuery, TravelStore, TripFilter},
};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError, trips::owned_trip};

async fn owned_document<S: TravelStore>(
  store: &S,
  caller: Caller,
  document_id: Uuid,
) -> Result<Document, ApiError> {
  store
    .get_document(document_id)
    .await
    .map_err(ApiError::store)?
    .filter(|d| d.user_id == caller.0)
    .ok_or_else(|| ApiError::NotFound(format!("document {document_id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// Only unassigned documents. Mutually exclusive with `trip_id`.
  #[serde(default)]
  pub inbox:    bool,
  pub trip_id:  Option<Uuid>,
  pub category: Option<Category>,
  #[serde(default)]
  pub unread:   bool,
}

/// `GET /documents[?inbox=true][&tripId=..][&category=flight][&unread=true]`
pub async fn list<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
  let trip = match (params.inbox, params.trip_id) {
    (true, Some(_)) => {
      return Err(ApiError::BadRequest("inbox and tripId are mutually exclusive".into()));
    }
    (true, None) => TripFilter::Inbox,
    (false, Some(id)) => TripFilter::Trip(id),
    (false, None) => TripFilter::Any,
  };

  let query = DocumentQuery {
    user_id: caller.0,
    trip,
    category: params.category,
    unread_only: params.unread,
  };
  let documents = store.list_documents(&query).await.map_err(ApiError::store)?;
  Ok(Json(documents))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /documents/{id}`
pub async fn get_one<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
  Ok(Json(owned_document(&*store, caller, id).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /documents/{id}`
pub async fn delete<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  owned_document(&*store, caller, id).await?;
  store.delete_document(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Mark read ────────────────────────────────────────────────────────────────

/// `POST /documents/{id}/read`
pub async fn mark_read<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
  owned_document(&*store, caller, id).await?;
  store.mark_document_read(id).await.map_err(ApiError::store)?;
  Ok(Json(owned_document(&*store, caller, id).await?))
}

// ─── Assign ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
  /// `null` moves the document back to the inbox.
  pub trip_id: Option<Uuid>,
}

/// `POST /documents/{id}/assign`
pub async fn assign<S: TravelStore>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Document>, ApiError> {
  owned_document(&*store, caller, id).await?;
  if let Some(trip_id) = body.trip_id {
    owned_trip(&*store, caller, trip_id).await?;
  }

  let document = store
    .assign_document(id, body.trip_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))?;
  Ok(Json(document))
}
