//! Push notifications over a JSON gateway.

use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use tripbox_core::notify::{Notification, Notifier};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PushError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Posts `{userId, title, body, data}` to the configured gateway. Without a
/// gateway, notifications are written to the log instead.
pub struct PushNotifier {
  client:   reqwest::Client,
  endpoint: Option<String>,
}

impl PushNotifier {
  pub fn new(endpoint: Option<String>) -> Result<Self, PushError> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self { client, endpoint })
  }
}

impl Notifier for PushNotifier {
  type Error = PushError;

  async fn notify(&self, user_id: Uuid, notification: Notification) -> Result<(), PushError> {
    let Some(endpoint) = &self.endpoint else {
      info!(
        %user_id,
        kind = ?notification.kind,
        title = %notification.title,
        body = %notification.body,
        "notification"
      );
      return Ok(());
    };

    self
      .client
      .post(endpoint)
      .json(&json!({
        "userId": user_id,
        "title":  notification.title,
        "body":   notification.body,
        "data":   notification.data,
      }))
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

/// Deliver `notification`, logging rather than returning any failure.
pub async fn notify_quietly<N: Notifier>(notifier: &N, user_id: Uuid, notification: Notification) {
  let kind = notification.kind;
  if let Err(e) = notifier.notify(user_id, notification).await {
    warn!(%user_id, ?kind, error = %e, "notification delivery failed");
  }
}
