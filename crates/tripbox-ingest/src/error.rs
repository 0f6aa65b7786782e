use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
  #[error("insufficient credits")]
  InsufficientCredits,

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("trip not found: {0}")]
  TripNotFound(Uuid),

  #[error("credit amount must be positive, got {0}")]
  InvalidCreditAmount(i64),

  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
