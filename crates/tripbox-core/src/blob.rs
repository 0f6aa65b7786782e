//! Opaque object storage for original files.

use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Where a blob landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
  pub url: String,
  pub key: String,
}

pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `bytes` under `key`. Keys are namespaced by the caller.
  fn put<'a>(
    &'a self,
    key: &'a str,
    bytes: Bytes,
    mime_type: &'a str,
  ) -> impl Future<Output = Result<StoredBlob, Self::Error>> + Send + 'a;

  /// Load the blob this store published at `url`. `None` when the URL is not
  /// one of this store's or nothing is stored there.
  fn fetch<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;
}
