//! Content addressing for deduplication.
//!
//! Fingerprints are SHA-256 digests. Identical input always yields the same
//! fingerprint; nothing more is promised about similar inputs.

use sha2::{Digest, Sha256};
use tripbox_core::document::Fingerprint;

/// Hashed in place of empty input so that "nothing" still has a stable,
/// well-formed fingerprint.
const EMPTY_SENTINEL: &[u8] = b"tripbox:empty-content";

pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
  let input = if bytes.is_empty() { EMPTY_SENTINEL } else { bytes };
  Fingerprint::from_digest(Sha256::digest(input).into())
}

pub fn fingerprint_text(text: &str) -> Fingerprint { fingerprint_bytes(text.as_bytes()) }

/// Fingerprint of a stored-file reference, for uploads where only a URL is
/// available. Weaker than hashing the bytes: the same file stored twice under
/// two keys fingerprints differently.
pub fn fingerprint_reference(url: &str) -> Fingerprint { fingerprint_text(url.trim()) }
