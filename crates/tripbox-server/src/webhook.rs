//! Inbound email webhook.
//!
//! `received → signature → user → credit gate → 200 → background ingestion`.
//! Everything after the response runs on the job queue; failures from then
//! on reach the user only through notifications.
//!
//! The signature fields precede the attachments in a provider's form, so the
//! signature is checked before the first attachment is buffered.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State},
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use tripbox_core::{blob::BlobStore, document::DocumentSource, notify::Notification, store::TravelStore};
use tripbox_ingest::{
  EmailBody, FileSubmission, IngestContent, IngestError, IngestOutcome, IngestRequest, Ingestor,
  fingerprint::fingerprint_bytes,
};
use uuid::Uuid;

use crate::{
  AppState, Backend, ServerConfig,
  accounts::recipient_addresses,
  blob::object_key,
  error::{Error, Result},
  notify::notify_quietly,
  queue::{Attachment, EmailJob},
  signature::{self, SignedFields},
};

// ─── Delivery ────────────────────────────────────────────────────────────────

/// The multipart form a provider posts for one email.
#[derive(Debug, Default)]
pub struct Delivery {
  pub recipient:   Option<String>,
  pub sender:      Option<String>,
  pub subject:     Option<String>,
  pub body_plain:  Option<String>,
  pub body_html:   Option<String>,
  pub signed:      SignedFields,
  pub attachments: Vec<Attachment>,
  verified:        bool,
}

impl Delivery {
  /// Read every field; parts carrying a file name are attachments. The
  /// signature is checked when the first attachment starts, before its
  /// content is read.
  pub async fn read(mut multipart: Multipart, config: &ServerConfig) -> Result<Self> {
    let mut delivery = Self::default();

    while let Some(field) = multipart.next_field().await? {
      let name = field.name().unwrap_or_default().to_owned();

      if let Some(file_name) = field.file_name().map(str::to_owned) {
        if !delivery.verified {
          delivery.verify(config)?;
        }
        let mime_type =
          field.content_type().unwrap_or("application/octet-stream").to_owned();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
          continue;
        }
        delivery.attachments.push(Attachment {
          file_name: Some(file_name).filter(|n| !n.trim().is_empty()),
          mime_type,
          bytes,
        });
        continue;
      }

      let value = field.text().await?;
      let slot = match name.as_str() {
        "recipient" | "To" => &mut delivery.recipient,
        "sender" | "from" | "From" => &mut delivery.sender,
        "subject" | "Subject" => &mut delivery.subject,
        "body-plain" => &mut delivery.body_plain,
        "body-html" => &mut delivery.body_html,
        "timestamp" => &mut delivery.signed.timestamp,
        "token" => &mut delivery.signed.token,
        "signature" => &mut delivery.signed.signature,
        _ => continue,
      };
      if slot.is_none() && !value.trim().is_empty() {
        *slot = Some(value);
      }
    }

    Ok(delivery)
  }

  fn verify(&mut self, config: &ServerConfig) -> Result<()> {
    signature::check(config, &self.signed, Utc::now()).map_err(|e| {
      warn!(recipient = ?self.recipient, error = %e, "webhook signature rejected");
      Error::InvalidSignature
    })?;
    self.verified = true;
    Ok(())
  }

  fn into_job(self, user_id: Uuid) -> EmailJob {
    EmailJob {
      user_id,
      subject: self.subject,
      sender: self.sender,
      html: self.body_html,
      plain: self.body_plain,
      attachments: self.attachments,
    }
  }
}

impl EmailJob {
  fn body(&self) -> EmailBody {
    EmailBody {
      html:    self.html.clone(),
      plain:   self.plain.clone(),
      subject: self.subject.clone(),
      sender:  self.sender.clone(),
    }
  }
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `POST /webhooks/email`
pub async fn receive<B: Backend>(
  State(state): State<AppState<B>>,
  multipart: Multipart,
) -> Result<Json<Value>> {
  let mut delivery = Delivery::read(multipart, &state.config).await?;

  let recipient = delivery.recipient.clone().ok_or(Error::MissingRecipient)?;

  if !delivery.verified {
    delivery.verify(&state.config)?;
  }

  let mut user = None;
  for address in recipient_addresses(&recipient) {
    user = state.store.find_user_by_forwarding_address(&address).await.map_err(Error::store)?;
    if user.is_some() {
      break;
    }
  }
  let Some(user) = user else {
    info!(%recipient, "delivery for unknown recipient");
    return Err(Error::UnknownRecipient(recipient));
  };
  let user_id = user.user_id;

  if !state.ingestor.ledger().can_consume(user_id).await? {
    info!(%user_id, "delivery refused, no credits");
    notify_quietly(state.notifier.as_ref(), user_id, Notification::insufficient_credits()).await;
    return Err(Error::InsufficientCredits);
  }

  let job = delivery.into_job(user_id);
  if job.attachments.is_empty() {
    let body_chars = job.body().cleaned_text().chars().count();
    if body_chars < state.config.min_email_body_chars {
      info!(%user_id, body_chars, "email has no attachments and too little text, ignoring");
      return Ok(Json(json!({ "status": "ignored" })));
    }
  }

  info!(%user_id, attachments = job.attachments.len(), "email accepted");
  state.jobs.enqueue(job)?;
  Ok(Json(json!({ "status": "accepted" })))
}

// ─── Background processing ───────────────────────────────────────────────────

/// Turns a queued email into ingestion calls and notifications.
pub struct EmailProcessor<B: Backend> {
  blobs:    Arc<B::Blobs>,
  notifier: Arc<B::Push>,
  ingestor: Ingestor<B::Store, B::Oracle>,
}

impl<B: Backend> Clone for EmailProcessor<B> {
  fn clone(&self) -> Self {
    Self {
      blobs:    Arc::clone(&self.blobs),
      notifier: Arc::clone(&self.notifier),
      ingestor: self.ingestor.clone(),
    }
  }
}

/// What one email amounted to, for the closing notification.
#[derive(Debug, Default)]
struct Tally {
  created:      usize,
  trip_name:    Option<String>,
  /// Items that were new content and ingested without error.
  fresh:        usize,
  out_of_funds: bool,
}

impl Tally {
  fn record(&mut self, outcome: IngestOutcome) {
    self.created += outcome.created_document_ids.len();
    if !outcome.is_duplicate() {
      self.fresh += 1;
    }
    self.out_of_funds |= outcome.credits_exhausted;
    self.trip_name = self.trip_name.take().or(outcome.auto_assigned_trip_name);
  }
}

impl<B: Backend> EmailProcessor<B> {
  pub fn new(
    blobs: Arc<B::Blobs>,
    notifier: Arc<B::Push>,
    ingestor: Ingestor<B::Store, B::Oracle>,
  ) -> Self {
    Self { blobs, notifier, ingestor }
  }

  /// Process one email: each attachment in order, or the body when there are
  /// none. Never fails; problems are logged and notified.
  pub async fn process(&self, job: EmailJob) {
    let user_id = job.user_id;
    self.notify(user_id, Notification::email_received(job.subject.as_deref())).await;

    let mut tally = Tally::default();

    if job.attachments.is_empty() {
      let request = IngestRequest {
        source:        DocumentSource::Email,
        content:       IngestContent::EmailBody(job.body()),
        trip_id:       None,
        email_subject: job.subject.clone(),
      };
      self.ingest_one(user_id, "your forwarded email", request, &mut tally).await;
    } else {
      for attachment in &job.attachments {
        let label = match &attachment.file_name {
          Some(name) => format!("\"{name}\""),
          None => "an attachment".to_owned(),
        };
        if self.seen_before(user_id, attachment, &label, &mut tally).await {
          continue;
        }
        let Some(file) = self.store_attachment(user_id, attachment, &label).await else {
          continue;
        };
        let request = IngestRequest {
          source:        DocumentSource::Email,
          content:       IngestContent::File(file),
          trip_id:       None,
          email_subject: job.subject.clone(),
        };
        if !self.ingest_one(user_id, &label, request, &mut tally).await {
          break;
        }
      }
    }

    if tally.created > 0 {
      let notification = Notification::ingestion_completed(tally.created, tally.trip_name.as_deref());
      self.notify(user_id, notification).await;
    } else if tally.fresh > 0 && !tally.out_of_funds {
      self.notify(user_id, Notification::no_bookings_found()).await;
    }
  }

  /// Whether the attachment's content was ingested already, in which case
  /// it is neither stored again nor sent for extraction. A failed lookup
  /// skips the attachment.
  async fn seen_before(
    &self,
    user_id: Uuid,
    attachment: &Attachment,
    label: &str,
    tally: &mut Tally,
  ) -> bool {
    let fingerprint = fingerprint_bytes(&attachment.bytes);
    match self.ingestor.find_duplicate(user_id, &fingerprint).await {
      Ok(Some(existing)) => {
        info!(%user_id, %fingerprint, document_id = %existing, "attachment already ingested");
        tally.record(IngestOutcome::duplicate(existing));
        true
      }
      Ok(None) => false,
      Err(e) => {
        error!(%user_id, content = %label, error = %e, "duplicate lookup failed");
        self.notify(user_id, Notification::processing_error(label)).await;
        true
      }
    }
  }

  async fn store_attachment(
    &self,
    user_id: Uuid,
    attachment: &Attachment,
    label: &str,
  ) -> Option<FileSubmission> {
    let key = object_key(user_id, attachment.file_name.as_deref());
    match self.blobs.put(&key, attachment.bytes.clone(), &attachment.mime_type).await {
      Ok(stored) => Some(FileSubmission {
        url:       stored.url,
        file_name: attachment.file_name.clone(),
        mime_type: attachment.mime_type.clone(),
        bytes:     Some(attachment.bytes.clone()),
      }),
      Err(e) => {
        error!(%user_id, content = %label, %key, error = %e, "failed to store attachment");
        self.notify(user_id, Notification::processing_error(label)).await;
        None
      }
    }
  }

  /// Ingest one item. Returns `false` when the rest of the email must be
  /// skipped because the user ran out of credits.
  async fn ingest_one(
    &self,
    user_id: Uuid,
    label: &str,
    request: IngestRequest,
    tally: &mut Tally,
  ) -> bool {
    match self.ingestor.ingest(user_id, request).await {
      Ok(outcome) => {
        tally.record(outcome);
        if tally.out_of_funds {
          self.notify(user_id, Notification::insufficient_credits()).await;
          return false;
        }
        true
      }
      Err(IngestError::InsufficientCredits) => {
        tally.out_of_funds = true;
        self.notify(user_id, Notification::insufficient_credits()).await;
        false
      }
      Err(e) => {
        error!(%user_id, content = %label, error = %e, "email ingestion failed");
        self.notify(user_id, Notification::processing_error(label)).await;
        true
      }
    }
  }

  async fn notify(&self, user_id: Uuid, notification: Notification) {
    notify_quietly(self.notifier.as_ref(), user_id, notification).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn created(count: usize, trip_name: Option<&str>) -> IngestOutcome {
    IngestOutcome {
      created_document_ids: (0..count).map(|_| Uuid::new_v4()).collect(),
      auto_assigned_trip_name: trip_name.map(str::to_owned),
      ..Default::default()
    }
  }

  #[test]
  fn tally_counts_documents_and_keeps_the_first_trip() {
    let mut tally = Tally::default();
    tally.record(created(2, Some("Budapest")));
    tally.record(created(1, Some("Vienna")));
    tally.record(created(0, None));

    assert_eq!(tally.created, 3);
    assert_eq!(tally.fresh, 3);
    assert_eq!(tally.trip_name.as_deref(), Some("Budapest"));
    assert!(!tally.out_of_funds);
  }

  #[test]
  fn tally_skips_duplicates_and_remembers_exhaustion() {
    let mut tally = Tally::default();
    tally.record(IngestOutcome::duplicate(Uuid::new_v4()));
    assert_eq!(tally.fresh, 0);
    assert_eq!(tally.trip_name, None);

    tally.record(IngestOutcome { credits_exhausted: true, ..created(1, None) });
    tally.record(created(0, None));

    assert_eq!(tally.created, 1);
    assert_eq!(tally.fresh, 2);
    assert!(tally.out_of_funds);
  }
}
