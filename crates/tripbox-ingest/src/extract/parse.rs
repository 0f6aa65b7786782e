//! Defensive parsing of the oracle's JSON reply.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};
use tracing::warn;
use tripbox_core::document::{Category, Details};

use super::ProposedDocument;
use crate::repair::repair_details;

pub const DEFAULT_DOCUMENT_TYPE: &str = "Document";
pub const DEFAULT_TITLE: &str = "Travel Document";

const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
  #[error("empty reply")]
  Empty,
  #[error("malformed JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("reply has no \"documents\" array")]
  MissingDocuments,
}

/// Parse a reply into proposed documents. A well-formed reply with an empty
/// `documents` array is a valid "nothing found" answer, not an error.
pub fn parse_reply(reply: &str) -> Result<Vec<ProposedDocument>, ReplyError> {
  let json = extract_json(reply).ok_or(ReplyError::Empty)?;
  let value: Value = serde_json::from_str(json)?;
  let documents = value
    .get("documents")
    .and_then(Value::as_array)
    .ok_or(ReplyError::MissingDocuments)?;

  let mut proposed = Vec::with_capacity(documents.len());
  for (idx, entry) in documents.iter().enumerate() {
    match entry.as_object() {
      Some(obj) => proposed.push(proposed_document(obj)),
      None => warn!(index = idx, "skipping non-object entry in oracle reply"),
    }
  }
  Ok(proposed)
}

/// The JSON object inside a reply, tolerating markdown code fences and chatter
/// around it.
fn extract_json(reply: &str) -> Option<&str> {
  let trimmed = reply.trim();
  if trimmed.is_empty() {
    return None;
  }
  let unfenced = match trimmed.strip_prefix("```") {
    Some(rest) => {
      let body = rest.split_once('\n').map_or("", |(_, body)| body);
      body.trim_end().strip_suffix("```").unwrap_or(body).trim()
    }
    None => trimmed,
  };
  if unfenced.starts_with('{') {
    return Some(unfenced);
  }
  match (unfenced.find('{'), unfenced.rfind('}')) {
    (Some(start), Some(end)) if start < end => Some(&unfenced[start..=end]),
    _ => Some(unfenced),
  }
}

fn proposed_document(obj: &Map<String, Value>) -> ProposedDocument {
  let category = text(obj, "category").map_or(Category::Other, |c| Category::coerce(&c));

  let mut details = obj
    .get("details")
    .and_then(Value::as_object)
    .map(details_from_json)
    .unwrap_or_default();
  repair_details(category, &mut details);

  ProposedDocument {
    category,
    document_type: text(obj, "documentType").unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_owned()),
    title: text(obj, "title").unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
    subtitle: text(obj, "subtitle"),
    details,
    document_date: text(obj, "documentDate").and_then(|d| parse_document_date(&d)),
  }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
  obj
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

fn details_from_json(obj: &Map<String, Value>) -> Details {
  obj
    .iter()
    .filter_map(|(key, value)| {
      let value = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      Some((key.clone(), value))
    })
    .collect()
}

/// Parse a booking date. Offsets are dropped in favour of the local wall-clock
/// time they qualify; bare dates mean midnight.
pub fn parse_document_date(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.naive_local());
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
    })
}

#[cfg(test)]
mod tests {
  use tripbox_core::document::DetailKey;

  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
  }

  #[test]
  fn full_reply() {
    let reply = r#"{"documents": [{
      "category": "flight",
      "documentType": "Boarding Pass",
      "title": "BUD → TLV",
      "documentDate": "2025-08-15T06:40:00",
      "details": {"flightNumber": "LY2372", "seat": 14, "departureAirport": "BUD"}
    }]}"#;
    let docs = parse_reply(reply).unwrap();
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.category, Category::Flight);
    assert_eq!(doc.title, "BUD → TLV");
    assert_eq!(doc.document_date, Some(at(2025, 8, 15, 6, 40, 0)));
    assert_eq!(doc.details["seat"], "14");
    assert!(doc.details[DetailKey::DEPARTURE_ADDRESS].contains("Budapest"));
  }

  #[test]
  fn missing_fields_get_defaults() {
    let reply = r#"{"documents": [{"category": "banana", "details": {"notes": null}}, 7]}"#;
    let docs = parse_reply(reply).unwrap();
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.category, Category::Other);
    assert_eq!(doc.document_type, DEFAULT_DOCUMENT_TYPE);
    assert_eq!(doc.title, DEFAULT_TITLE);
    assert_eq!(doc.subtitle, None);
    assert_eq!(doc.document_date, None);
    assert!(doc.details.is_empty());
  }

  #[test]
  fn fenced_and_chatty_replies() {
    let fenced = "```json\n{\"documents\": []}\n```";
    assert!(parse_reply(fenced).unwrap().is_empty());

    let chatty = "Here you go: {\"documents\": [{\"title\": \"Hotel\"}]} Hope it helps!";
    assert_eq!(parse_reply(chatty).unwrap()[0].title, "Hotel");
  }

  #[test]
  fn unusable_replies() {
    assert!(matches!(parse_reply("  "), Err(ReplyError::Empty)));
    assert!(matches!(parse_reply("not json"), Err(ReplyError::Json(_))));
    assert!(matches!(parse_reply(r#"{"bookings": []}"#), Err(ReplyError::MissingDocuments)));
    assert!(matches!(parse_reply("[]"), Err(ReplyError::MissingDocuments)));
  }

  #[test]
  fn date_formats() {
    let expected = at(2025, 8, 22, 23, 59, 59);
    assert_eq!(parse_document_date("2025-08-22T23:59:59"), Some(expected));
    assert_eq!(parse_document_date("2025-08-22 23:59:59"), Some(expected));
    assert_eq!(parse_document_date("2025-08-22T23:59:59+03:00"), Some(expected));
    assert_eq!(parse_document_date("2025-08-22T23:59"), Some(at(2025, 8, 22, 23, 59, 0)));
    assert_eq!(parse_document_date("2025-08-15"), Some(at(2025, 8, 15, 0, 0, 0)));
    assert_eq!(parse_document_date("next Tuesday"), None);
  }
}
