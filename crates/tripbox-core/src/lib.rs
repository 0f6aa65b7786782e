//! Core types and trait definitions for the Tripbox travel-document pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the domain model and the seams to every external collaborator
//! (storage, extraction oracle, blob storage, push notifications); all other
//! crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod blob;
pub mod document;
pub mod error;
pub mod notify;
pub mod oracle;
pub mod store;
pub mod trip;
pub mod user;

pub use error::{Error, Result};
