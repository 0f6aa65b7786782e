//! Error types for `tripbox-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid fingerprint: {0:?}")]
  InvalidFingerprint(String),

  #[error("unknown document source: {0:?}")]
  UnknownSource(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
