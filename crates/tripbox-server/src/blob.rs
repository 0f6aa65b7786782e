//! Filesystem-backed blob store. Objects land under a root directory and are
//! addressed by a public URL prefix the deployment serves that directory at.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tripbox_core::blob::{BlobStore, StoredBlob};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
  #[error("invalid blob key: {0:?}")]
  InvalidKey(String),
}

pub struct FsBlobStore {
  root:       PathBuf,
  public_url: String,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
    let public_url = public_url.into().trim_end_matches('/').to_owned();
    Self { root: root.into(), public_url }
  }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
    let relative = Path::new(key);
    let plain = !key.is_empty()
      && relative.components().all(|c| matches!(c, Component::Normal(_)));
    if plain { Ok(self.root.join(relative)) } else { Err(BlobError::InvalidKey(key.to_owned())) }
  }
}

impl BlobStore for FsBlobStore {
  type Error = BlobError;

  async fn put(&self, key: &str, bytes: Bytes, mime_type: &str) -> Result<StoredBlob, BlobError> {
    let path = self.path_for(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;
    tracing::debug!(key, mime_type, len = bytes.len(), "blob stored");

    Ok(StoredBlob { url: format!("{}/{key}", self.public_url), key: key.to_owned() })
  }

  async fn fetch(&self, url: &str) -> Result<Option<Bytes>, BlobError> {
    let Some(key) = url.strip_prefix(&self.public_url).and_then(|rest| rest.strip_prefix('/'))
    else {
      return Ok(None);
    };
    let path = self.path_for(key)?;
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(Some(Bytes::from(bytes))),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// `<user-id>/<uuid>-<sanitised-name>`: namespaced by owner, unique per put.
pub fn object_key(user_id: Uuid, file_name: Option<&str>) -> String {
  let name = file_name.map(sanitize_file_name).filter(|n| !n.is_empty());
  format!("{user_id}/{}-{}", Uuid::new_v4(), name.as_deref().unwrap_or("file"))
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are stripped so a name can never be `..`.
pub fn sanitize_file_name(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
  let cleaned: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  cleaned.trim_start_matches('.').chars().take(120).collect()
}
