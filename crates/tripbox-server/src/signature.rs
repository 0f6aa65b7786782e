//! Inbound-email webhook signatures.
//!
//! The provider signs every delivery with `hex(HMAC-SHA256(key, timestamp ‖ token))`
//! using a pre-shared key.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ServerConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
  #[error("signature fields missing")]
  Missing,
  #[error("timestamp outside the accepted window")]
  Stale,
  #[error("signature mismatch")]
  Mismatch,
  #[error("no signing key configured")]
  NoKey,
}

/// The three signature fields of a delivery, as received.
#[derive(Debug, Clone, Default)]
pub struct SignedFields {
  pub timestamp: Option<String>,
  pub token:     Option<String>,
  pub signature: Option<String>,
}

/// Compute the signature the provider sends for `timestamp` and `token`.
pub fn sign(key: &str, timestamp: &str, token: &str) -> Result<String, SignatureError> {
  Ok(hex::encode(mac(key, timestamp, token)?.finalize().into_bytes()))
}

fn mac(key: &str, timestamp: &str, token: &str) -> Result<HmacSha256, SignatureError> {
  let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SignatureError::NoKey)?;
  mac.update(timestamp.as_bytes());
  mac.update(token.as_bytes());
  Ok(mac)
}

/// Verify `fields` against `key` at `now`. The comparison is constant-time.
pub fn verify(
  key: &str,
  fields: &SignedFields,
  now: DateTime<Utc>,
  max_age_secs: u64,
) -> Result<(), SignatureError> {
  let (Some(timestamp), Some(token), Some(signature)) =
    (fields.timestamp.as_deref(), fields.token.as_deref(), fields.signature.as_deref())
  else {
    return Err(SignatureError::Missing);
  };

  let sent: i64 = timestamp.trim().parse().map_err(|_| SignatureError::Stale)?;
  let age = now.timestamp().saturating_sub(sent).unsigned_abs();
  if age > max_age_secs {
    return Err(SignatureError::Stale);
  }

  let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Mismatch)?;
  mac(key, timestamp, token)?.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Apply the deployment's signature policy to a delivery.
///
/// With a key configured every delivery must verify. Without one (a blank key
/// counts as none), production rejects everything and development lets
/// deliveries through with a warning.
pub fn check(
  config: &ServerConfig,
  fields: &SignedFields,
  now: DateTime<Utc>,
) -> Result<(), SignatureError> {
  let key = config.webhook_signing_key.as_deref().filter(|k| !k.trim().is_empty());
  match key {
    Some(key) => verify(key, fields, now, config.signature_max_age_secs),
    None if config.is_production() => {
      error!("no webhook signing key configured, rejecting delivery");
      Err(SignatureError::NoKey)
    }
    None => {
      warn!("no webhook signing key configured, accepting unsigned delivery");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;
  use crate::config::Environment;

  const KEY: &str = "key-3ax6xnjp29jd6fds4gc373sgvjxteol0";

  fn now() -> DateTime<Utc> { Utc.timestamp_opt(1_760_000_000, 0).unwrap() }

  fn signed(timestamp: i64, token: &str) -> SignedFields {
    let timestamp = timestamp.to_string();
    SignedFields {
      signature: Some(sign(KEY, &timestamp, token).unwrap()),
      timestamp: Some(timestamp),
      token:     Some(token.to_owned()),
    }
  }

  #[test]
  fn fresh_signature_verifies() {
    assert_eq!(verify(KEY, &signed(1_760_000_000 - 30, "tok"), now(), 900), Ok(()));
  }

  #[test]
  fn wrong_key_or_tampered_token_fails() {
    let fields = signed(1_760_000_000, "tok");
    assert_eq!(verify("other", &fields, now(), 900), Err(SignatureError::Mismatch));

    let tampered = SignedFields { token: Some("tok2".into()), ..fields };
    assert_eq!(verify(KEY, &tampered, now(), 900), Err(SignatureError::Mismatch));
  }

  #[test]
  fn old_or_garbled_timestamps_fail() {
    assert_eq!(verify(KEY, &signed(1_760_000_000 - 901, "t"), now(), 900), Err(SignatureError::Stale));

    let mut fields = signed(1_760_000_000, "t");
    fields.timestamp = Some("yesterday".into());
    assert_eq!(verify(KEY, &fields, now(), 900), Err(SignatureError::Stale));
  }

  #[test]
  fn missing_fields_fail() {
    let mut fields = signed(1_760_000_000, "t");
    fields.signature = None;
    assert_eq!(verify(KEY, &fields, now(), 900), Err(SignatureError::Missing));
  }

  #[test]
  fn missing_key_policy_depends_on_environment() {
    let unsigned = SignedFields::default();
    let mut config = ServerConfig::default();
    assert_eq!(check(&config, &unsigned, now()), Err(SignatureError::NoKey));

    config.environment = Environment::Development;
    assert_eq!(check(&config, &unsigned, now()), Ok(()));

    config.webhook_signing_key = Some(KEY.into());
    assert_eq!(check(&config, &unsigned, now()), Err(SignatureError::Missing));
    assert_eq!(check(&config, &signed(1_760_000_000, "t"), now()), Ok(()));
  }

  #[test]
  fn blank_key_is_no_key() {
    let timestamp = "1760000000";
    let forged = SignedFields {
      timestamp: Some(timestamp.into()),
      token:     Some("attacker".into()),
      signature: Some(sign("", timestamp, "attacker").unwrap()),
    };

    for blank in ["", "   "] {
      let config = ServerConfig { webhook_signing_key: Some(blank.into()), ..ServerConfig::default() };
      assert_eq!(check(&config, &forged, now()), Err(SignatureError::NoKey), "{blank:?}");
    }
  }
}
