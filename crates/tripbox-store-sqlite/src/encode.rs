//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that they sort
//! lexically. Calendar dates use `YYYY-MM-DD`; booking dates use
//! `YYYY-MM-DDTHH:MM:SS` without an offset. UUIDs are stored as hyphenated
//! lowercase strings and details as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use tripbox_core::{
  document::{Category, Details, Document, DocumentSource, FileRef, Fingerprint},
  trip::Trip,
  user::{CreditState, User},
};
use uuid::Uuid;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates and times ──────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_naive_dt(dt: NaiveDateTime) -> String {
  dt.format(NAIVE_DT_FORMAT).to_string()
}

pub fn decode_naive_dt(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, NAIVE_DT_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_category(c: Category) -> &'static str {
  match c {
    Category::Flight => "flight",
    Category::CarRental => "carRental",
    Category::Accommodation => "accommodation",
    Category::Medical => "medical",
    Category::Event => "event",
    Category::Other => "other",
  }
}

pub fn decode_category(s: &str) -> Result<Category> {
  Category::from_str(s).map_err(|_| Error::Decode(format!("unknown category: {s:?}")))
}

pub fn encode_source(s: DocumentSource) -> &'static str {
  match s {
    DocumentSource::Upload => "upload",
    DocumentSource::Email => "email",
    DocumentSource::Camera => "camera",
  }
}

// ─── Details ─────────────────────────────────────────────────────────────────

pub fn encode_details(details: &Details) -> Result<String> {
  Ok(serde_json::to_string(details)?)
}

pub fn decode_details(s: &str) -> Result<Details> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:                 String,
  pub forwarding_address:      String,
  pub credits:                 i64,
  pub subscription_expires_at: Option<String>,
  pub created_at:              String,
}

pub const USER_COLUMNS: &str =
  "user_id, forwarding_address, credits, subscription_expires_at, created_at";

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:                 row.get(0)?,
      forwarding_address:      row.get(1)?,
      credits:                 row.get(2)?,
      subscription_expires_at: row.get(3)?,
      created_at:              row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:            decode_uuid(&self.user_id)?,
      forwarding_address: self.forwarding_address,
      credits:            CreditState {
        credits:                 self.credits,
        subscription_expires_at: self
          .subscription_expires_at
          .as_deref()
          .map(decode_dt)
          .transpose()?,
      },
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `trips` row.
pub struct RawTrip {
  pub trip_id:     String,
  pub user_id:     String,
  pub name:        String,
  pub start_date:  String,
  pub end_date:    String,
  pub is_archived: bool,
  pub created_at:  String,
  pub updated_at:  String,
}

pub const TRIP_COLUMNS: &str =
  "trip_id, user_id, name, start_date, end_date, is_archived, created_at, updated_at";

impl RawTrip {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      trip_id:     row.get(0)?,
      user_id:     row.get(1)?,
      name:        row.get(2)?,
      start_date:  row.get(3)?,
      end_date:    row.get(4)?,
      is_archived: row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_trip(self) -> Result<Trip> {
    Ok(Trip {
      trip_id:     decode_uuid(&self.trip_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      name:        self.name,
      start_date:  decode_date(&self.start_date)?,
      end_date:    decode_date(&self.end_date)?,
      is_archived: self.is_archived,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:    String,
  pub user_id:        String,
  pub trip_id:        Option<String>,
  pub category:       String,
  pub document_type:  String,
  pub title:          String,
  pub subtitle:       Option<String>,
  pub details_json:   String,
  pub document_date:  Option<String>,
  pub file_url:       Option<String>,
  pub file_name:      Option<String>,
  pub file_mime_type: Option<String>,
  pub source:         String,
  pub email_subject:  Option<String>,
  pub fingerprint:    String,
  pub is_read:        bool,
  pub created_at:     String,
  pub updated_at:     String,
}

pub const DOCUMENT_COLUMNS: &str = "document_id, user_id, trip_id, category, \
  document_type, title, subtitle, details_json, document_date, file_url, \
  file_name, file_mime_type, source, email_subject, fingerprint, is_read, \
  created_at, updated_at";

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:    row.get(0)?,
      user_id:        row.get(1)?,
      trip_id:        row.get(2)?,
      category:       row.get(3)?,
      document_type:  row.get(4)?,
      title:          row.get(5)?,
      subtitle:       row.get(6)?,
      details_json:   row.get(7)?,
      document_date:  row.get(8)?,
      file_url:       row.get(9)?,
      file_name:      row.get(10)?,
      file_mime_type: row.get(11)?,
      source:         row.get(12)?,
      email_subject:  row.get(13)?,
      fingerprint:    row.get(14)?,
      is_read:        row.get(15)?,
      created_at:     row.get(16)?,
      updated_at:     row.get(17)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    let file = match (self.file_url, self.file_mime_type) {
      (Some(url), Some(mime_type)) => Some(FileRef { url, name: self.file_name, mime_type }),
      _ => None,
    };

    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      user_id: decode_uuid(&self.user_id)?,
      trip_id: self.trip_id.as_deref().map(decode_uuid).transpose()?,
      category: decode_category(&self.category)?,
      document_type: self.document_type,
      title: self.title,
      subtitle: self.subtitle,
      details: decode_details(&self.details_json)?,
      document_date: self.document_date.as_deref().map(decode_naive_dt).transpose()?,
      file,
      source: DocumentSource::parse(&self.source)?,
      email_subject: self.email_subject,
      fingerprint: Fingerprint::parse(self.fingerprint)?,
      is_read: self.is_read,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
