//! The Tripbox ingestion pipeline.
//!
//! Everything between "a user handed us some content" and "documents exist in
//! the store" lives here:
//!
//! - [`fingerprint`] addresses content for deduplication.
//! - [`repair`] turns free-text extractor output into actionable fields.
//! - [`extract`] talks to the extraction oracle and never fails outright.
//! - [`matcher`] files dated documents under the trip that contains them.
//! - [`ledger`] meters ingestion against the user's credit balance.
//! - [`orchestrator`] ties the above together for one submitted item.
//!
//! All collaborators are injected; nothing here opens a connection of its own.

#![allow(async_fn_in_trait)]

pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod ledger;
pub mod matcher;
pub mod orchestrator;
pub mod repair;

pub use error::{IngestError, Result};
pub use extract::{
  EmailBody, Extraction, ExtractionHints, Extractor, FileSubmission, ProposedDocument,
};
pub use ledger::{Balance, Charge, CreditLedger};
pub use matcher::TripMatcher;
pub use orchestrator::{IngestContent, IngestOutcome, IngestRequest, Ingestor};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
