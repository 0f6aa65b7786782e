//! Push notifications: the only channel through which background failures
//! reach the user.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
  EmailReceived,
  IngestionCompleted,
  NoBookingsFound,
  InsufficientCredits,
  ProcessingError,
}

/// A `(title, body, data)` push payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub kind:  NotificationKind,
  pub title: String,
  pub body:  String,
  pub data:  Map<String, Value>,
}

impl Notification {
  fn new(kind: NotificationKind, title: &str, body: String, data: Value) -> Self {
    let mut data = match data {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    data.insert("type".to_owned(), serde_json::to_value(kind).unwrap_or(Value::Null));
    Self { kind, title: title.to_owned(), body, data }
  }

  pub fn email_received(subject: Option<&str>) -> Self {
    let body = match subject {
      Some(s) if !s.trim().is_empty() => format!("Processing \"{}\"", s.trim()),
      _ => "Processing your forwarded email".to_owned(),
    };
    Self::new(NotificationKind::EmailReceived, "Email received", body, json!({}))
  }

  pub fn ingestion_completed(count: usize, trip_name: Option<&str>) -> Self {
    let noun = if count == 1 { "document" } else { "documents" };
    let body = match trip_name {
      Some(name) => format!("Added {count} {noun} to {name}"),
      None => format!("Added {count} {noun} to your inbox"),
    };
    Self::new(
      NotificationKind::IngestionCompleted,
      "Documents ready",
      body,
      json!({ "count": count }),
    )
  }

  pub fn no_bookings_found() -> Self {
    Self::new(
      NotificationKind::NoBookingsFound,
      "No bookings found",
      "We couldn't find any travel bookings in that email".to_owned(),
      json!({}),
    )
  }

  pub fn insufficient_credits() -> Self {
    Self::new(
      NotificationKind::InsufficientCredits,
      "Out of credits",
      "Top up your credits to keep importing documents".to_owned(),
      json!({}),
    )
  }

  pub fn processing_error(content: &str) -> Self {
    Self::new(
      NotificationKind::ProcessingError,
      "Processing failed",
      format!("We couldn't process {content}. Please try again."),
      json!({ "content": content }),
    )
  }
}

pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fire-and-forget delivery; callers log and ignore failures.
  fn notify(
    &self,
    user_id: Uuid,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_carries_kind_tag() {
    let n = Notification::ingestion_completed(2, Some("Lisbon"));
    assert_eq!(n.body, "Added 2 documents to Lisbon");
    assert_eq!(n.data["type"], "ingestionCompleted");
    assert_eq!(n.data["count"], 2);
  }

  #[test]
  fn blank_subject_falls_back() {
    let n = Notification::email_received(Some("   "));
    assert_eq!(n.body, "Processing your forwarded email");
  }
}
