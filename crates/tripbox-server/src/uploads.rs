//! Upload-triggered ingestion: store a file, then ingest it by URL. The
//! stored bytes are read back so extraction and deduplication see the same
//! content an emailed copy of the file would.

use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tripbox_api::Caller;
use tripbox_core::{blob::BlobStore, document::DocumentSource, store::TravelStore};
use tripbox_ingest::{FileSubmission, IngestContent, IngestOutcome, IngestRequest};
use uuid::Uuid;

use crate::{
  AppState, Backend,
  blob::object_key,
  error::{Error, Result},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
  pub url:       String,
  pub key:       String,
  pub file_name: Option<String>,
  pub mime_type: String,
}

/// `POST /api/uploads` with a multipart `file` part.
pub async fn upload<B: Backend>(
  Caller(user_id): Caller,
  State(state): State<AppState<B>>,
  mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFile>)> {
  if state.store.get_user(user_id).await.map_err(Error::store)?.is_none() {
    return Err(Error::NotFound(format!("user {user_id} not found")));
  }

  while let Some(field) = multipart.next_field().await? {
    if field.name() != Some("file") {
      continue;
    }
    let file_name = field.file_name().map(str::to_owned).filter(|n| !n.trim().is_empty());
    let mime_type = field.content_type().unwrap_or("application/octet-stream").to_owned();
    let bytes = field.bytes().await?;
    if bytes.is_empty() {
      return Err(Error::BadRequest("file is empty".into()));
    }

    let key = object_key(user_id, file_name.as_deref());
    let stored = state.blobs.put(&key, bytes, &mime_type).await.map_err(Error::blob)?;
    info!(%user_id, key = %stored.key, %mime_type, "file uploaded");

    let body = UploadedFile { url: stored.url, key: stored.key, file_name, mime_type };
    return Ok((StatusCode::CREATED, Json(body)));
  }

  Err(Error::BadRequest("missing file field".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBody {
  pub file_url:  String,
  pub file_name: Option<String>,
  pub mime_type: String,
  pub trip_id:   Option<Uuid>,
  #[serde(default)]
  pub source:    DocumentSource,
}

/// `POST /api/ingest`: ingest a file stored through `/api/uploads` and answer
/// with the outcome once extraction has finished.
pub async fn ingest<B: Backend>(
  Caller(user_id): Caller,
  State(state): State<AppState<B>>,
  Json(body): Json<IngestBody>,
) -> Result<(StatusCode, Json<IngestOutcome>)> {
  let url = body.file_url.trim();
  if url.is_empty() {
    return Err(Error::BadRequest("fileUrl must not be empty".into()));
  }
  if body.mime_type.trim().is_empty() {
    return Err(Error::BadRequest("mimeType must not be empty".into()));
  }

  let Some(bytes) = state.blobs.fetch(url).await.map_err(Error::blob)? else {
    return Err(Error::BadRequest(format!("no stored file at {url}")));
  };

  let request = IngestRequest {
    source:        body.source,
    content:       IngestContent::File(FileSubmission {
      url:       url.to_owned(),
      file_name: body.file_name,
      mime_type: body.mime_type,
      bytes:     Some(bytes),
    }),
    trip_id:       body.trip_id,
    email_subject: None,
  };

  let outcome = state.ingestor.ingest(user_id, request).await?;
  let status =
    if outcome.created_document_ids.is_empty() { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(outcome)))
}
