//! Document types — one ingested artifact describing a single travel booking.
//!
//! A single uploaded file or forwarded email may yield several documents (a
//! round-trip itinerary produces one per leg). Every document carries the
//! fingerprint of the content it was extracted from so that re-deliveries of
//! the same content can be detected.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Category ────────────────────────────────────────────────────────────────

/// The fixed set of booking categories. Anything the extractor reports outside
/// this set is coerced to [`Category::Other`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum Category {
  Flight,
  #[strum(to_string = "carRental", serialize = "car_rental", serialize = "car rental")]
  CarRental,
  Accommodation,
  Medical,
  Event,
  #[default]
  Other,
}

impl Category {
  pub const ALL: [Category; 6] = [
    Self::Flight,
    Self::CarRental,
    Self::Accommodation,
    Self::Medical,
    Self::Event,
    Self::Other,
  ];

  /// Lenient conversion from extractor output; unrecognised values become
  /// [`Category::Other`].
  pub fn coerce(raw: &str) -> Self { raw.trim().parse().unwrap_or_default() }

  /// The detail keys that consumers of this category may rely on.
  pub fn known_detail_keys(self) -> &'static [&'static str] {
    use DetailKey as K;
    match self {
      Self::Flight => &[
        K::CONFIRMATION_NUMBER,
        K::AIRLINE,
        K::FLIGHT_NUMBER,
        K::DEPARTURE_AIRPORT,
        K::ARRIVAL_AIRPORT,
        K::DEPARTURE_TERMINAL,
        K::ARRIVAL_TERMINAL,
        K::DEPARTURE_ADDRESS,
        K::ARRIVAL_ADDRESS,
        K::DEPARTURE_TIME,
        K::ARRIVAL_TIME,
        K::SEAT,
        K::PASSENGER_NAME,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
      ],
      Self::CarRental => &[
        K::CONFIRMATION_NUMBER,
        K::PROVIDER,
        K::VEHICLE,
        K::PICKUP_LOCATION,
        K::DROPOFF_LOCATION,
        K::PICKUP_TIME,
        K::DROPOFF_TIME,
        K::ADDRESS,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
      ],
      Self::Accommodation => &[
        K::CONFIRMATION_NUMBER,
        K::PROVIDER,
        K::ADDRESS,
        K::CHECK_IN,
        K::CHECK_OUT,
        K::ROOM_TYPE,
        K::GUEST_NAME,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
      ],
      Self::Medical => &[
        K::PROVIDER,
        K::POLICY_NUMBER,
        K::PATIENT_NAME,
        K::ADDRESS,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
      ],
      Self::Event => &[
        K::CONFIRMATION_NUMBER,
        K::VENUE,
        K::EVENT_TIME,
        K::SEAT,
        K::ADDRESS,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
      ],
      Self::Other => &[
        K::CONFIRMATION_NUMBER,
        K::PROVIDER,
        K::ADDRESS,
        K::PHONE_NUMBER,
        K::EMAIL_ADDRESS,
        K::NOTES,
      ],
    }
  }
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// Schema-less, category-dependent booking facts. Kept as a plain string map
/// at the storage boundary; see [`DetailKey`] for the keys the rest of the
/// system understands.
pub type Details = BTreeMap<String, String>;

/// Well-known keys of the [`Details`] map.
pub struct DetailKey;

impl DetailKey {
  pub const ADDRESS: &'static str = "address";
  pub const AIRLINE: &'static str = "airline";
  pub const ARRIVAL_ADDRESS: &'static str = "arrivalAddress";
  pub const ARRIVAL_AIRPORT: &'static str = "arrivalAirport";
  pub const ARRIVAL_TERMINAL: &'static str = "arrivalTerminal";
  pub const ARRIVAL_TIME: &'static str = "arrivalTime";
  pub const CHECK_IN: &'static str = "checkIn";
  pub const CHECK_OUT: &'static str = "checkOut";
  pub const CONFIRMATION_NUMBER: &'static str = "confirmationNumber";
  pub const DEPARTURE_ADDRESS: &'static str = "departureAddress";
  pub const DEPARTURE_AIRPORT: &'static str = "departureAirport";
  pub const DEPARTURE_TERMINAL: &'static str = "departureTerminal";
  pub const DEPARTURE_TIME: &'static str = "departureTime";
  pub const DROPOFF_LOCATION: &'static str = "dropoffLocation";
  pub const DROPOFF_TIME: &'static str = "dropoffTime";
  pub const EMAIL_ADDRESS: &'static str = "emailAddress";
  pub const EVENT_TIME: &'static str = "eventTime";
  pub const FLIGHT_NUMBER: &'static str = "flightNumber";
  pub const GUEST_NAME: &'static str = "guestName";
  /// Holds a place name that was not specific enough to navigate to.
  pub const LOCATION_NAME: &'static str = "locationName";
  pub const NOTES: &'static str = "notes";
  pub const PASSENGER_NAME: &'static str = "passengerName";
  pub const PATIENT_NAME: &'static str = "patientName";
  pub const PHONE_NUMBER: &'static str = "phoneNumber";
  pub const PICKUP_LOCATION: &'static str = "pickupLocation";
  pub const PICKUP_TIME: &'static str = "pickupTime";
  pub const POLICY_NUMBER: &'static str = "policyNumber";
  pub const PROVIDER: &'static str = "provider";
  pub const ROOM_TYPE: &'static str = "roomType";
  pub const SEAT: &'static str = "seat";
  pub const VEHICLE: &'static str = "vehicle";
  pub const VENUE: &'static str = "venue";
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// The entry point through which a document arrived.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentSource {
  #[default]
  Upload,
  Email,
  Camera,
}

impl DocumentSource {
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw).map_err(|_| Error::UnknownSource(raw.to_owned()))
  }
}

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// A fixed-length content digest (64 lowercase hex characters) used to
/// recognise re-submitted content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  pub const HEX_LEN: usize = 64;

  /// Validate and wrap an already-computed hex digest.
  pub fn parse(hex: impl Into<String>) -> Result<Self> {
    let hex = hex.into();
    let valid = hex.len() == Self::HEX_LEN
      && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid { Ok(Self(hex)) } else { Err(Error::InvalidFingerprint(hex)) }
  }

  /// Wrap a raw 32-byte digest.
  pub fn from_digest(digest: [u8; 32]) -> Self { Self(hex::encode(digest)) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Original file ───────────────────────────────────────────────────────────

/// Reference to the stored original a document was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
  pub url:       String,
  pub name:      Option<String>,
  pub mime_type: String,
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub document_id:   Uuid,
  pub user_id:       Uuid,
  /// `None` means the document sits in the inbox.
  pub trip_id:       Option<Uuid>,
  pub category:      Category,
  pub document_type: String,
  pub title:         String,
  pub subtitle:      Option<String>,
  pub details:       Details,
  /// Local wall-clock time of the booking; drives trip matching.
  pub document_date: Option<NaiveDateTime>,
  /// Absent for documents extracted from an email body.
  pub file:          Option<FileRef>,
  pub source:        DocumentSource,
  pub email_subject: Option<String>,
  pub fingerprint:   Fingerprint,
  pub is_read:       bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::TravelStore::insert_document`]. Identity, read
/// flag and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub user_id:       Uuid,
  pub trip_id:       Option<Uuid>,
  pub category:      Category,
  pub document_type: String,
  pub title:         String,
  pub subtitle:      Option<String>,
  pub details:       Details,
  pub document_date: Option<NaiveDateTime>,
  pub file:          Option<FileRef>,
  pub source:        DocumentSource,
  pub email_subject: Option<String>,
  pub fingerprint:   Fingerprint,
}
