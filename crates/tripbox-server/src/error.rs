//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tripbox_ingest::IngestError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing recipient")]
  MissingRecipient,
  #[error("invalid signature")]
  InvalidSignature,
  #[error("unknown recipient: {0}")]
  UnknownRecipient(String),
  #[error("insufficient credits")]
  InsufficientCredits,
  #[error("not found: {0}")]
  NotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("job queue is full")]
  QueueFull,
  #[error("multipart error: {0}")]
  Multipart(#[from] MultipartError),
  #[error("blob store error: {0}")]
  Blob(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn blob(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Blob(Box::new(e))
  }
}

impl From<IngestError> for Error {
  fn from(e: IngestError) -> Self {
    match e {
      IngestError::InsufficientCredits => Self::InsufficientCredits,
      IngestError::UserNotFound(id) => Self::NotFound(format!("user {id} not found")),
      IngestError::TripNotFound(id) => Self::NotFound(format!("trip {id} not found")),
      IngestError::InvalidCreditAmount(_) => Self::BadRequest(e.to_string()),
      IngestError::Store(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::MissingRecipient | Error::BadRequest(_) | Error::Multipart(_) => {
        StatusCode::BAD_REQUEST
      }
      Error::InvalidSignature => StatusCode::UNAUTHORIZED,
      Error::UnknownRecipient(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
      Error::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
      Error::Blob(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &self {
      Error::Blob(_) | Error::Store(_) => {
        tracing::error!(error = %self, "request failed");
        "internal error".to_owned()
      }
      _ => self.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
