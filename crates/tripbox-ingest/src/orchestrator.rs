//! The ingestion orchestrator: one submitted item in, documents out.
//!
//! Per item: gate on credits, fingerprint, skip duplicates, extract, resolve
//! a trip for every proposed document, then pay for and persist each one.
//! A credit is reserved before each write and refunded if the write fails, so
//! the balance only ever pays for documents that exist.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use tripbox_core::{
  document::{DocumentSource, FileRef, Fingerprint, NewDocument},
  oracle::ExtractionOracle,
  store::TravelStore,
  trip::Trip,
};
use uuid::Uuid;

use crate::{
  IngestError, Result,
  extract::{EmailBody, Extraction, ExtractionHints, Extractor, FileSubmission, ProposedDocument},
  ledger::{Charge, CreditLedger},
  matcher::TripMatcher,
};

// ─── Request / outcome ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum IngestContent {
  File(FileSubmission),
  EmailBody(EmailBody),
}

impl IngestContent {
  pub fn fingerprint(&self) -> Fingerprint {
    match self {
      Self::File(file) => file.fingerprint(),
      Self::EmailBody(body) => body.fingerprint(),
    }
  }

  fn file_ref(&self) -> Option<FileRef> {
    match self {
      Self::File(file) => Some(file.file_ref()),
      Self::EmailBody(_) => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
  pub source:        DocumentSource,
  pub content:       IngestContent,
  /// File every document here instead of auto-matching. Must be a trip of
  /// the same user.
  pub trip_id:       Option<Uuid>,
  pub email_subject: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
  pub created_document_ids:    Vec<Uuid>,
  /// The first trip a document was auto-filed under.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub auto_assigned_trip_id:   Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub auto_assigned_trip_name: Option<String>,
  pub needs_manual_assignment: bool,
  /// Set when the content had been ingested before; nothing was created.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duplicate_of:            Option<Uuid>,
  /// Credits ran out partway; documents created so far are kept.
  pub credits_exhausted:       bool,
  /// Extraction failed and a fallback document stands in for the content.
  pub extraction_degraded:     bool,
}

impl IngestOutcome {
  /// Nothing created; the content matched `document_id`.
  pub fn duplicate(document_id: Uuid) -> Self {
    Self { duplicate_of: Some(document_id), ..Default::default() }
  }

  pub fn is_duplicate(&self) -> bool { self.duplicate_of.is_some() }
}

/// Where one proposed document will be filed.
enum Assignment {
  Explicit(Uuid),
  Matched(Trip),
  /// Undated, or no trip contains its date: the inbox.
  Unfiled,
}

impl Assignment {
  fn trip_id(&self) -> Option<Uuid> {
    match self {
      Self::Explicit(id) => Some(*id),
      Self::Matched(trip) => Some(trip.trip_id),
      Self::Unfiled => None,
    }
  }

  /// Fold a persisted document's filing into the summary. The first
  /// auto-assignment is the one reported.
  fn record(self, outcome: &mut IngestOutcome) {
    match self {
      Self::Explicit(_) => {}
      Self::Matched(trip) => {
        if outcome.auto_assigned_trip_id.is_none() {
          outcome.auto_assigned_trip_id = Some(trip.trip_id);
          outcome.auto_assigned_trip_name = Some(trip.name);
        }
      }
      Self::Unfiled => outcome.needs_manual_assignment = true,
    }
  }
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

pub struct Ingestor<S, O> {
  store:     Arc<S>,
  extractor: Extractor<O>,
  matcher:   TripMatcher<S>,
  ledger:    CreditLedger<S>,
}

impl<S, O> Clone for Ingestor<S, O> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      extractor: self.extractor.clone(),
      matcher:   self.matcher.clone(),
      ledger:    self.ledger.clone(),
    }
  }
}

impl<S: TravelStore, O: ExtractionOracle> Ingestor<S, O> {
  pub fn new(store: Arc<S>, oracle: Arc<O>) -> Self {
    Self {
      extractor: Extractor::new(oracle),
      matcher: TripMatcher::new(Arc::clone(&store)),
      ledger: CreditLedger::new(Arc::clone(&store)),
      store,
    }
  }

  pub fn ledger(&self) -> &CreditLedger<S> { &self.ledger }

  pub fn extractor(&self) -> &Extractor<O> { &self.extractor }

  /// The document of `user_id` already created from content with this
  /// fingerprint, if any.
  pub async fn find_duplicate(
    &self,
    user_id: Uuid,
    fingerprint: &Fingerprint,
  ) -> Result<Option<Uuid>> {
    let existing = self
      .store
      .find_document_by_fingerprint(user_id, fingerprint)
      .await
      .map_err(IngestError::store)?;
    Ok(existing.map(|document| document.document_id))
  }

  /// Ingest one item for `user_id`.
  ///
  /// Fails fast with [`IngestError::InsufficientCredits`] before any
  /// extraction work when the user cannot pay, and with
  /// [`IngestError::TripNotFound`] when an explicit trip is not theirs.
  /// Storage failures propagate; a failed write never costs a credit.
  pub async fn ingest(&self, user_id: Uuid, request: IngestRequest) -> Result<IngestOutcome> {
    if !self.ledger.can_consume(user_id).await? {
      return Err(IngestError::InsufficientCredits);
    }

    if let Some(trip_id) = request.trip_id {
      let trip = self.store.get_trip(trip_id).await.map_err(IngestError::store)?;
      if trip.is_none_or(|t| t.user_id != user_id) {
        return Err(IngestError::TripNotFound(trip_id));
      }
    }

    let fingerprint = request.content.fingerprint();
    if let Some(existing) = self.find_duplicate(user_id, &fingerprint).await? {
      info!(%user_id, %fingerprint, document_id = %existing, "duplicate content, skipping extraction");
      return Ok(IngestOutcome::duplicate(existing));
    }

    let extraction = self.extract(&request).await;
    let file = request.content.file_ref();

    let mut outcome = IngestOutcome {
      extraction_degraded: extraction.degraded,
      ..Default::default()
    };

    for proposed in extraction.documents {
      let assignment = match request.trip_id {
        Some(explicit) => Assignment::Explicit(explicit),
        None => self.auto_assign(user_id, &proposed).await?,
      };

      let charge = self.ledger.charge(user_id).await?;
      if !charge.succeeded() {
        warn!(
          %user_id,
          created = outcome.created_document_ids.len(),
          "credits exhausted mid-item, stopping"
        );
        outcome.credits_exhausted = true;
        break;
      }

      let input = NewDocument {
        user_id,
        trip_id: assignment.trip_id(),
        category: proposed.category,
        document_type: proposed.document_type,
        title: proposed.title,
        subtitle: proposed.subtitle,
        details: proposed.details,
        document_date: proposed.document_date,
        file: file.clone(),
        source: request.source,
        email_subject: request.email_subject.clone(),
        fingerprint: extraction.fingerprint.clone(),
      };

      let document = match self.store.insert_document(input).await {
        Ok(document) => document,
        Err(e) => {
          self.refund(user_id, charge).await;
          return Err(IngestError::store(e));
        }
      };

      info!(
        %user_id,
        document_id = %document.document_id,
        category = %document.category,
        trip_id = ?document.trip_id,
        "document created"
      );
      assignment.record(&mut outcome);
      outcome.created_document_ids.push(document.document_id);
    }

    Ok(outcome)
  }

  async fn extract(&self, request: &IngestRequest) -> Extraction {
    match &request.content {
      IngestContent::File(file) => {
        let hints = ExtractionHints {
          file_name:     file.file_name.clone(),
          email_subject: request.email_subject.clone(),
          sender:        None,
        };
        self.extractor.extract(file, &hints).await
      }
      IngestContent::EmailBody(body) => self.extractor.extract_from_email_body(body).await,
    }
  }

  /// Match a dated document to a trip of its owner.
  async fn auto_assign(&self, user_id: Uuid, proposed: &ProposedDocument) -> Result<Assignment> {
    let Some(date) = proposed.document_date else {
      return Ok(Assignment::Unfiled);
    };
    Ok(match self.matcher.find_matching_trip(user_id, date).await? {
      Some(trip) => Assignment::Matched(trip),
      None => Assignment::Unfiled,
    })
  }

  async fn refund(&self, user_id: Uuid, charge: Charge) {
    if charge != Charge::Credit {
      return;
    }
    if let Err(e) = self.ledger.add(user_id, 1).await {
      error!(%user_id, error = %e, "failed to refund credit after failed write");
    }
  }
}
