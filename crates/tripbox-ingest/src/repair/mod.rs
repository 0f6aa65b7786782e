//! Field repair: turn free-text extractor output into values the clients can
//! act on (tap-to-call, tap-to-navigate, tap-to-email).
//!
//! Nothing in here fails. Every value is either transformed or passed through.

mod address;
mod airports;
mod phone;

pub use address::is_navigable;
pub use airports::resolve_airport;
pub use phone::normalize_phone;
use tripbox_core::document::{Category, DetailKey, Details};

/// `(airport, terminal, address)` key triples of a flight's two ends.
const FLIGHT_ENDPOINTS: [(&str, &str, &str); 2] = [
  (DetailKey::DEPARTURE_AIRPORT, DetailKey::DEPARTURE_TERMINAL, DetailKey::DEPARTURE_ADDRESS),
  (DetailKey::ARRIVAL_AIRPORT, DetailKey::ARRIVAL_TERMINAL, DetailKey::ARRIVAL_ADDRESS),
];

/// Repair `details` in place.
pub fn repair_details(category: Category, details: &mut Details) {
  details.retain(|_, value| !value.trim().is_empty());

  if let Some(phone) = details.get_mut(DetailKey::PHONE_NUMBER) {
    *phone = normalize_phone(phone);
  }

  if let Some(email) = details.get_mut(DetailKey::EMAIL_ADDRESS) {
    let cleaned = email.trim().trim_start_matches("mailto:").trim().to_owned();
    *email = cleaned;
  }

  demote_vague_address(details);

  if category == Category::Flight {
    for (airport_key, terminal_key, address_key) in FLIGHT_ENDPOINTS {
      repair_flight_endpoint(details, airport_key, terminal_key, address_key);
    }
  }
}

/// A non-navigable `address` must never be offered to a map action. Keep the
/// text under `locationName` instead of dropping it.
fn demote_vague_address(details: &mut Details) {
  let vague = details
    .get(DetailKey::ADDRESS)
    .is_some_and(|address| !is_navigable(address));
  if !vague {
    return;
  }
  if let Some(address) = details.remove(DetailKey::ADDRESS) {
    details
      .entry(DetailKey::LOCATION_NAME.to_owned())
      .or_insert(address);
  }
}

fn repair_flight_endpoint(
  details: &mut Details,
  airport_key: &str,
  terminal_key: &str,
  address_key: &str,
) {
  let usable = details.get(address_key).is_some_and(|a| is_navigable(a));
  if usable {
    return;
  }

  let resolved = details.get(airport_key).and_then(|airport| {
    resolve_airport(airport, details.get(terminal_key).map(String::as_str))
  });

  match resolved {
    Some(address) => {
      details.insert(address_key.to_owned(), address);
    }
    None => {
      details.remove(address_key);
    }
  }
}
