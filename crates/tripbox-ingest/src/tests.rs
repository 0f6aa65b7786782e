//! Orchestrator tests against an in-memory store and a scripted oracle.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, NaiveDate, Utc};
use tripbox_core::{
  document::{Category, DocumentSource},
  store::{DocumentQuery, TravelStore},
  trip::{NewTrip, Trip},
};
use uuid::Uuid;

use crate::{
  EmailBody, FileSubmission, IngestContent, IngestError, IngestRequest, Ingestor,
  extract::FALLBACK_FILE_TITLE,
  testing::{FlakyStore, ScriptedOracle},
};

const ROUND_TRIP: &str = r#"{"documents": [
  {
    "category": "flight",
    "documentType": "E-Ticket",
    "title": "BUD → TLV",
    "documentDate": "2025-08-15T06:40:00",
    "details": {"flightNumber": "LY2372", "departureAirport": "BUD", "arrivalAirport": "TLV"}
  },
  {
    "category": "flight",
    "documentType": "E-Ticket",
    "title": "TLV → BUD",
    "documentDate": "2025-08-22T23:10:00",
    "details": {"flightNumber": "LY2373", "departureAirport": "TLV", "arrivalAirport": "BUD"}
  }
]}"#;

struct Harness {
  store:   Arc<FlakyStore>,
  oracle:  Arc<ScriptedOracle>,
  ingest:  Ingestor<FlakyStore, ScriptedOracle>,
  user_id: Uuid,
}

async fn harness(oracle: ScriptedOracle, credits: i64) -> Harness {
  let store = Arc::new(FlakyStore::new().await);
  let oracle = Arc::new(oracle);
  let user = store.create_user("trip-k3j9x0a2qz@in.example.com".into(), credits).await.unwrap();
  Harness {
    ingest: Ingestor::new(store.clone(), oracle.clone()),
    store,
    oracle,
    user_id: user.user_id,
  }
}

impl Harness {
  async fn trip(&self, name: &str, start: NaiveDate, end: NaiveDate) -> Trip {
    self
      .store
      .create_trip(NewTrip { user_id: self.user_id, name: name.into(), start_date: start, end_date: end })
      .await
      .unwrap()
  }

  async fn credits(&self) -> i64 {
    self.store.credit_state(self.user_id).await.unwrap().unwrap().credits
  }

  async fn document_count(&self) -> usize {
    self.store.list_documents(&DocumentQuery::for_user(self.user_id)).await.unwrap().len()
  }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

fn pdf_upload(url: &str) -> IngestRequest {
  IngestRequest {
    source:        DocumentSource::Upload,
    content:       IngestContent::File(FileSubmission {
      url:       url.into(),
      file_name: Some("eticket.pdf".into()),
      mime_type: "application/pdf".into(),
      bytes:     None,
    }),
    trip_id:       None,
    email_subject: None,
  }
}

fn attachment(bytes: &'static [u8]) -> IngestRequest {
  IngestRequest {
    source:        DocumentSource::Email,
    content:       IngestContent::File(FileSubmission {
      url:       format!("https://blobs.example.com/{}.pdf", Uuid::new_v4()),
      file_name: Some("booking.pdf".into()),
      mime_type: "application/pdf".into(),
      bytes:     Some(Bytes::from_static(bytes)),
    }),
    trip_id:       None,
    email_subject: Some("Your booking".into()),
  }
}

#[tokio::test]
async fn round_trip_pdf_is_filed_under_matching_trip() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  let trip = h.trip("Tel Aviv", date(2025, 8, 15), date(2025, 8, 22)).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.created_document_ids.len(), 2);
  assert_eq!(outcome.auto_assigned_trip_id, Some(trip.trip_id));
  assert_eq!(outcome.auto_assigned_trip_name.as_deref(), Some("Tel Aviv"));
  assert!(!outcome.needs_manual_assignment);
  assert!(!outcome.credits_exhausted);
  assert_eq!(h.credits().await, 3);

  for id in &outcome.created_document_ids {
    let doc = h.store.get_document(*id).await.unwrap().unwrap();
    assert_eq!(doc.trip_id, Some(trip.trip_id));
    assert_eq!(doc.category, Category::Flight);
    assert_eq!(doc.file.as_ref().unwrap().mime_type, "application/pdf");
  }
}

#[tokio::test]
async fn identical_bytes_are_ingested_once() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;

  let first = h.ingest.ingest(h.user_id, attachment(b"%PDF-1.7 itinerary")).await.unwrap();
  assert_eq!(first.created_document_ids.len(), 2);

  let second = h.ingest.ingest(h.user_id, attachment(b"%PDF-1.7 itinerary")).await.unwrap();
  assert!(second.is_duplicate());
  assert!(second.created_document_ids.is_empty());

  assert_eq!(h.document_count().await, 2);
  assert_eq!(h.oracle.calls(), 1);
  assert_eq!(h.credits().await, 3);
}

#[tokio::test]
async fn no_credits_fails_before_extraction() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 0).await;

  let result = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await;

  assert!(matches!(result, Err(IngestError::InsufficientCredits)));
  assert_eq!(h.oracle.calls(), 0);
  assert_eq!(h.credits().await, 0);
}

#[tokio::test]
async fn subscription_covers_ingestion_without_spending() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 0).await;
  h.store
    .set_subscription_expiry(h.user_id, Some(Utc::now() + Duration::days(30)))
    .await
    .unwrap();

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.created_document_ids.len(), 2);
  assert_eq!(h.credits().await, 0);
}

#[tokio::test]
async fn running_out_mid_item_keeps_what_was_created() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 1).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.created_document_ids.len(), 1);
  assert!(outcome.credits_exhausted);
  assert_eq!(h.credits().await, 0);
  assert_eq!(h.document_count().await, 1);
}

#[tokio::test]
async fn unmatched_documents_land_in_inbox() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  h.trip("Elsewhere", date(2025, 1, 1), date(2025, 1, 5)).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.created_document_ids.len(), 2);
  assert!(outcome.needs_manual_assignment);
  assert_eq!(outcome.auto_assigned_trip_id, None);
  let doc = h.store.get_document(outcome.created_document_ids[0]).await.unwrap().unwrap();
  assert_eq!(doc.trip_id, None);
}

#[tokio::test]
async fn partial_match_flags_manual_assignment() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  let trip = h.trip("First half", date(2025, 8, 10), date(2025, 8, 16)).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.auto_assigned_trip_id, Some(trip.trip_id));
  assert!(outcome.needs_manual_assignment);
}

#[tokio::test]
async fn unpaid_documents_leave_no_trace_in_the_summary() {
  let reply = r#"{"documents": [
    {"category": "event", "documentType": "Voucher", "title": "Museum pass"},
    {"category": "accommodation", "documentType": "Booking", "title": "Hotel Gellért", "documentDate": "2025-08-16T15:00:00"}
  ]}"#;
  let h = harness(ScriptedOracle::replying(reply), 1).await;
  h.trip("Budapest", date(2025, 8, 15), date(2025, 8, 22)).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert_eq!(outcome.created_document_ids.len(), 1);
  assert!(outcome.credits_exhausted);
  assert!(outcome.needs_manual_assignment);
  assert_eq!(outcome.auto_assigned_trip_id, None);
  assert_eq!(outcome.auto_assigned_trip_name, None);

  let doc = h.store.get_document(outcome.created_document_ids[0]).await.unwrap().unwrap();
  assert_eq!(doc.trip_id, None);
  assert_eq!(h.document_count().await, 1);
}

#[tokio::test]
async fn explicit_trip_overrides_matching() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  let chosen = h.trip("Chosen", date(2024, 1, 1), date(2024, 1, 2)).await;
  h.trip("Tel Aviv", date(2025, 8, 15), date(2025, 8, 22)).await;

  let mut request = pdf_upload("https://blobs.example.com/u/1.pdf");
  request.trip_id = Some(chosen.trip_id);
  let outcome = h.ingest.ingest(h.user_id, request).await.unwrap();

  assert_eq!(outcome.auto_assigned_trip_id, None);
  assert!(!outcome.needs_manual_assignment);
  for id in outcome.created_document_ids {
    let doc = h.store.get_document(id).await.unwrap().unwrap();
    assert_eq!(doc.trip_id, Some(chosen.trip_id));
  }
}

#[tokio::test]
async fn foreign_trip_is_rejected_before_extraction() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  let stranger = h.store.create_user("trip-stranger@in.example.com".into(), 5).await.unwrap();
  let theirs = h
    .store
    .create_trip(NewTrip {
      user_id:    stranger.user_id,
      name:       "Theirs".into(),
      start_date: date(2025, 8, 1),
      end_date:   date(2025, 8, 30),
    })
    .await
    .unwrap();

  let mut request = pdf_upload("https://blobs.example.com/u/1.pdf");
  request.trip_id = Some(theirs.trip_id);
  let result = h.ingest.ingest(h.user_id, request).await;

  assert!(matches!(result, Err(IngestError::TripNotFound(id)) if id == theirs.trip_id));
  assert_eq!(h.oracle.calls(), 0);
  assert_eq!(h.credits().await, 5);
}

#[tokio::test]
async fn unknown_category_is_stored_as_other() {
  let reply = r#"{"documents": [{"category": "banana", "title": "Mystery"}]}"#;
  let h = harness(ScriptedOracle::replying(reply), 5).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  let doc = h.store.get_document(outcome.created_document_ids[0]).await.unwrap().unwrap();
  assert_eq!(doc.category, Category::Other);
  assert!(outcome.needs_manual_assignment);
}

#[tokio::test]
async fn oracle_outage_still_creates_a_document() {
  let h = harness(ScriptedOracle::failing("503 Service Unavailable"), 5).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert!(outcome.extraction_degraded);
  assert_eq!(outcome.created_document_ids.len(), 1);
  let doc = h.store.get_document(outcome.created_document_ids[0]).await.unwrap().unwrap();
  assert_eq!(doc.title, FALLBACK_FILE_TITLE);
  assert_eq!(doc.category, Category::Other);
  assert!(doc.details.is_empty());
  assert_eq!(h.credits().await, 4);
}

#[tokio::test]
async fn no_bookings_creates_nothing_and_costs_nothing() {
  let h = harness(ScriptedOracle::replying(r#"{"documents": []}"#), 5).await;

  let outcome = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await.unwrap();

  assert!(outcome.created_document_ids.is_empty());
  assert!(!outcome.extraction_degraded);
  assert_eq!(h.credits().await, 5);
}

#[tokio::test]
async fn failed_write_refunds_the_credit() {
  let h = harness(ScriptedOracle::replying(ROUND_TRIP), 5).await;
  h.store.fail_inserts(true);

  let result = h.ingest.ingest(h.user_id, pdf_upload("https://blobs.example.com/u/1.pdf")).await;

  assert!(matches!(result, Err(IngestError::Store(_))));
  assert_eq!(h.credits().await, 5);
  assert_eq!(h.document_count().await, 0);
}

#[tokio::test]
async fn email_body_documents_carry_subject_and_no_file() {
  let reply = r#"{"documents": [{"category": "accommodation", "title": "Hotel Lux",
    "documentDate": "2025-08-16", "details": {"address": "Downtown"}}]}"#;
  let h = harness(ScriptedOracle::replying(reply), 5).await;
  let body = EmailBody {
    html:    Some("<p>Your stay at Hotel Lux is confirmed. Reservation 99812.</p>".into()),
    plain:   None,
    subject: Some("Reservation confirmed".into()),
    sender:  Some("reservations@hotel.example".into()),
  };
  let request = IngestRequest {
    source:        DocumentSource::Email,
    content:       IngestContent::EmailBody(body.clone()),
    trip_id:       None,
    email_subject: body.subject.clone(),
  };

  let outcome = h.ingest.ingest(h.user_id, request.clone()).await.unwrap();
  let doc = h.store.get_document(outcome.created_document_ids[0]).await.unwrap().unwrap();
  assert_eq!(doc.source, DocumentSource::Email);
  assert_eq!(doc.file, None);
  assert_eq!(doc.email_subject.as_deref(), Some("Reservation confirmed"));
  assert_eq!(doc.details.get("locationName").map(String::as_str), Some("Downtown"));
  assert_eq!(doc.fingerprint, body.fingerprint());

  let again = h.ingest.ingest(h.user_id, request).await.unwrap();
  assert_eq!(again.duplicate_of, Some(doc.document_id));
}
