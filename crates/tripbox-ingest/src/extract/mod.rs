//! The extraction client: content in, proposed documents out.
//!
//! Extraction never fails from the caller's point of view. When the oracle is
//! down or answers with something unusable, a single uncategorised fallback
//! document is returned so the user still gets a record to sort by hand.

mod html;
mod parse;
mod prompt;

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use chrono::NaiveDateTime;
pub use html::{MAX_TEXT_CHARS, clean_html, clean_text};
pub use parse::{DEFAULT_DOCUMENT_TYPE, DEFAULT_TITLE, parse_document_date};
pub use prompt::ExtractionHints;
use tracing::{debug, warn};
use tripbox_core::{
  document::{Category, Details, FileRef, Fingerprint},
  oracle::{ExtractionOracle, OracleContent, OracleRequest},
};

use crate::fingerprint::{fingerprint_bytes, fingerprint_reference, fingerprint_text};

pub const FALLBACK_FILE_TITLE: &str = "Uploaded Document";
pub const FALLBACK_EMAIL_TITLE: &str = "Forwarded Email";

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A stored file submitted for extraction.
#[derive(Debug, Clone)]
pub struct FileSubmission {
  /// Blob-store URL of the original.
  pub url:       String,
  pub file_name: Option<String>,
  pub mime_type: String,
  /// The original bytes, when the caller still holds them. Enables a
  /// byte-level fingerprint and inline delivery to the oracle.
  pub bytes:     Option<Bytes>,
}

impl FileSubmission {
  pub fn fingerprint(&self) -> Fingerprint {
    match &self.bytes {
      Some(bytes) => fingerprint_bytes(bytes),
      None => fingerprint_reference(&self.url),
    }
  }

  pub fn file_ref(&self) -> FileRef {
    FileRef {
      url:       self.url.clone(),
      name:      self.file_name.clone(),
      mime_type: self.mime_type.clone(),
    }
  }

  /// MIME type without parameters, lower-cased.
  fn essence(&self) -> String {
    let essence = self.mime_type.split(';').next().unwrap_or_default();
    essence.trim().to_ascii_lowercase()
  }

  fn reference(&self, essence: &str) -> String {
    match &self.bytes {
      Some(bytes) => format!("data:{essence};base64,{}", STANDARD.encode(bytes)),
      None => self.url.clone(),
    }
  }

  /// How the oracle gets to see this file; `None` for unsupported types.
  fn oracle_content(&self) -> Option<OracleContent> {
    let essence = self.essence();
    match essence.as_str() {
      e if e.starts_with("image/") => Some(OracleContent::Image { url: self.reference(e) }),
      "application/pdf" => Some(OracleContent::Pdf {
        url:       self.reference(&essence),
        file_name: self.file_name.clone(),
      }),
      "text/html" => {
        let bytes = self.bytes.as_ref()?;
        Some(OracleContent::Text(clean_html(&String::from_utf8_lossy(bytes))))
      }
      "text/plain" => {
        let bytes = self.bytes.as_ref()?;
        Some(OracleContent::Text(clean_text(&String::from_utf8_lossy(bytes))))
      }
      _ => None,
    }
  }
}

/// The body of a forwarded email without attachments.
#[derive(Debug, Clone, Default)]
pub struct EmailBody {
  pub html:    Option<String>,
  pub plain:   Option<String>,
  pub subject: Option<String>,
  pub sender:  Option<String>,
}

impl EmailBody {
  /// The text handed to the oracle: cleaned HTML if it has any content,
  /// otherwise the cleaned plain-text part.
  pub fn cleaned_text(&self) -> String {
    let from_html = self.html.as_deref().map(clean_html).filter(|t| !t.is_empty());
    from_html
      .or_else(|| self.plain.as_deref().map(clean_text))
      .unwrap_or_default()
  }

  pub fn fingerprint(&self) -> Fingerprint { fingerprint_text(&self.cleaned_text()) }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// A document the oracle proposes, with details already repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedDocument {
  pub category:      Category,
  pub document_type: String,
  pub title:         String,
  pub subtitle:      Option<String>,
  pub details:       Details,
  pub document_date: Option<NaiveDateTime>,
}

impl ProposedDocument {
  fn fallback(title: &str, subtitle: Option<String>) -> Self {
    Self {
      category: Category::Other,
      document_type: DEFAULT_DOCUMENT_TYPE.to_owned(),
      title: title.to_owned(),
      subtitle,
      details: Details::new(),
      document_date: None,
    }
  }
}

/// Zero or more proposed documents plus one fingerprint for the whole input.
#[derive(Debug, Clone)]
pub struct Extraction {
  pub documents:   Vec<ProposedDocument>,
  pub fingerprint: Fingerprint,
  /// Set when `documents` holds the fallback rather than the oracle's answer.
  pub degraded:    bool,
}

// ─── Extractor ───────────────────────────────────────────────────────────────

pub struct Extractor<O> {
  oracle: Arc<O>,
}

impl<O> Clone for Extractor<O> {
  fn clone(&self) -> Self { Self { oracle: Arc::clone(&self.oracle) } }
}

impl<O: ExtractionOracle> Extractor<O> {
  pub fn new(oracle: Arc<O>) -> Self { Self { oracle } }

  /// Extract bookings from a stored file.
  pub async fn extract(&self, file: &FileSubmission, hints: &ExtractionHints) -> Extraction {
    let fingerprint = file.fingerprint();
    let fallback = || vec![ProposedDocument::fallback(FALLBACK_FILE_TITLE, file.file_name.clone())];

    let Some(content) = file.oracle_content() else {
      warn!(mime_type = %file.mime_type, "unsupported content type, storing unprocessed");
      return Extraction { documents: fallback(), fingerprint, degraded: true };
    };

    let request = OracleRequest { instructions: prompt::instructions(hints), content };
    match self.run(&request).await {
      Some(documents) => Extraction { documents, fingerprint, degraded: false },
      None => Extraction { documents: fallback(), fingerprint, degraded: true },
    }
  }

  /// Extract bookings from an email body, preferring HTML over plain text.
  pub async fn extract_from_email_body(&self, body: &EmailBody) -> Extraction {
    let text = body.cleaned_text();
    let fingerprint = fingerprint_text(&text);
    let subject = body.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let fallback = || vec![ProposedDocument::fallback(subject.unwrap_or(FALLBACK_EMAIL_TITLE), None)];

    if text.is_empty() {
      return Extraction { documents: fallback(), fingerprint, degraded: true };
    }

    let hints = ExtractionHints {
      file_name:     None,
      email_subject: body.subject.clone(),
      sender:        body.sender.clone(),
    };
    let request = OracleRequest {
      instructions: prompt::instructions(&hints),
      content:      OracleContent::Text(text),
    };
    match self.run(&request).await {
      Some(documents) => Extraction { documents, fingerprint, degraded: false },
      None => Extraction { documents: fallback(), fingerprint, degraded: true },
    }
  }

  /// One oracle round-trip. `None` means the caller should fall back.
  async fn run(&self, request: &OracleRequest) -> Option<Vec<ProposedDocument>> {
    let reply = match self.oracle.complete(request).await {
      Ok(reply) => reply,
      Err(e) => {
        warn!(error = %e, "extraction oracle call failed");
        return None;
      }
    };

    match parse::parse_reply(&reply) {
      Ok(documents) => {
        debug!(count = documents.len(), "oracle proposed documents");
        Some(documents)
      }
      Err(e) => {
        warn!(error = %e, "unusable oracle reply");
        None
      }
    }
  }
}
