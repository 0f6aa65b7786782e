//! Forwarding addresses and user provisioning.

use rand_core::{OsRng, RngCore as _};
use tripbox_core::{store::TravelStore, user::User};

const ADDRESS_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ADDRESS_SUFFIX_LEN: usize = 10;

/// A fresh `trip-<10 lowercase alphanumerics>@<domain>` address.
pub fn generate_forwarding_address(domain: &str) -> String {
  // 252 is the largest multiple of 36 below 256; rejecting above it keeps the
  // draw uniform.
  let mut suffix = String::with_capacity(ADDRESS_SUFFIX_LEN);
  while suffix.len() < ADDRESS_SUFFIX_LEN {
    let mut buf = [0u8; 16];
    OsRng.fill_bytes(&mut buf);
    for b in buf.into_iter().filter(|b| *b < 252) {
      if suffix.len() == ADDRESS_SUFFIX_LEN {
        break;
      }
      suffix.push(ADDRESS_ALPHABET[usize::from(b) % ADDRESS_ALPHABET.len()] as char);
    }
  }
  format!("trip-{suffix}@{}", domain.trim().to_ascii_lowercase())
}

/// Bare, lower-cased addresses from a recipient header such as
/// `"Trips <trip-abc@in.example.com>, other@example.com"`.
pub fn recipient_addresses(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .filter_map(|part| {
      let part = part.trim();
      let bare = match (part.rfind('<'), part.rfind('>')) {
        (Some(open), Some(close)) if open < close => &part[open + 1..close],
        _ => part,
      };
      let bare = bare.trim().to_ascii_lowercase();
      bare.contains('@').then_some(bare)
    })
    .collect()
}

/// Create a user with a fresh forwarding address and the free allotment.
pub async fn provision_user<S: TravelStore>(
  store: &S,
  domain: &str,
  free_credits: i64,
) -> Result<User, S::Error> {
  store.create_user(generate_forwarding_address(domain), free_credits).await
}
