//! The extraction oracle seam.
//!
//! The oracle is an external service that reads a document together with an
//! instruction prompt and answers with JSON. It is slow, sometimes wrong and
//! sometimes down; callers never trust its reply blindly.

use std::future::Future;

/// The document content handed to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleContent {
  /// An image, by URL or `data:` URL.
  Image { url: String },
  /// A PDF, by URL or `data:` URL.
  Pdf { url: String, file_name: Option<String> },
  /// Already-cleaned text, e.g. an email body.
  Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
  pub instructions: String,
  pub content:      OracleContent,
}

pub trait ExtractionOracle: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Submit `request` and return the raw reply text, expected to hold JSON.
  fn complete<'a>(
    &'a self,
    request: &'a OracleRequest,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
