//! Test doubles and request builders for the server tests.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use axum::{
  body::Body,
  http::{Request, header},
};
use bytes::Bytes;
use chrono::Utc;
use tokio::task::JoinHandle;
use tripbox_core::{
  blob::{BlobStore, StoredBlob},
  notify::{Notification, NotificationKind, Notifier},
  oracle::{ExtractionOracle, OracleRequest},
};
use tripbox_ingest::Ingestor;
use tripbox_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  AppState, Backend, ServerConfig,
  config::Environment,
  queue::spawn_worker,
  signature::sign,
  webhook::EmailProcessor,
};

pub const SIGNING_KEY: &str = "key-test-signing";

// ─── Collaborators ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("oracle unavailable")]
pub struct OracleDown;

pub struct ScriptedOracle {
  reply: Option<String>,
  calls: AtomicUsize,
  last:  Mutex<Option<OracleRequest>>,
}

impl ScriptedOracle {
  fn new(reply: Option<String>) -> Self {
    Self { reply, calls: AtomicUsize::new(0), last: Mutex::new(None) }
  }

  pub fn replying(reply: &str) -> Self { Self::new(Some(reply.to_owned())) }

  pub fn failing() -> Self { Self::new(None) }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  /// The most recent request the oracle was asked to complete.
  pub fn last_request(&self) -> Option<OracleRequest> { self.last.lock().unwrap().clone() }
}

impl ExtractionOracle for ScriptedOracle {
  type Error = OracleDown;

  async fn complete(&self, request: &OracleRequest) -> Result<String, OracleDown> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last.lock().unwrap() = Some(request.clone());
    self.reply.clone().ok_or(OracleDown)
  }
}

#[derive(Debug, thiserror::Error)]
#[error("blob store unavailable")]
pub struct BlobsDown;

#[derive(Default)]
pub struct MemoryBlobs {
  keys:    Mutex<Vec<String>>,
  objects: Mutex<HashMap<String, Bytes>>,
  fail:    AtomicBool,
}

impl MemoryBlobs {
  pub fn keys(&self) -> Vec<String> { self.keys.lock().unwrap().clone() }

  /// The URL `key` is published at once stored.
  pub fn url_for(key: &str) -> String { format!("https://blobs.test/{key}") }

  pub fn fail(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }
}

impl BlobStore for MemoryBlobs {
  type Error = BlobsDown;

  async fn put(&self, key: &str, bytes: Bytes, _mime_type: &str) -> Result<StoredBlob, BlobsDown> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(BlobsDown);
    }
    let url = Self::url_for(key);
    self.keys.lock().unwrap().push(key.to_owned());
    self.objects.lock().unwrap().insert(url.clone(), bytes);
    Ok(StoredBlob { url, key: key.to_owned() })
  }

  async fn fetch(&self, url: &str) -> Result<Option<Bytes>, BlobsDown> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(BlobsDown);
    }
    Ok(self.objects.lock().unwrap().get(url).cloned())
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  sent: Mutex<Vec<(Uuid, Notification)>>,
}

impl RecordingNotifier {
  pub fn kinds(&self) -> Vec<NotificationKind> {
    self.sent.lock().unwrap().iter().map(|(_, n)| n.kind).collect()
  }

  pub fn last(&self) -> Option<Notification> {
    self.sent.lock().unwrap().last().map(|(_, n)| n.clone())
  }
}

impl Notifier for RecordingNotifier {
  type Error = Infallible;

  async fn notify(&self, user_id: Uuid, notification: Notification) -> Result<(), Infallible> {
    self.sent.lock().unwrap().push((user_id, notification));
    Ok(())
  }
}

pub struct TestBackend;

impl Backend for TestBackend {
  type Store = SqliteStore;
  type Oracle = ScriptedOracle;
  type Blobs = MemoryBlobs;
  type Push = RecordingNotifier;
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub struct Harness {
  pub state:    AppState<TestBackend>,
  pub worker:   JoinHandle<()>,
  pub store:    Arc<SqliteStore>,
  pub oracle:   Arc<ScriptedOracle>,
  pub blobs:    Arc<MemoryBlobs>,
  pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> ServerConfig {
  ServerConfig {
    environment: Environment::Production,
    webhook_signing_key: Some(SIGNING_KEY.to_owned()),
    forwarding_domain: "in.example.com".to_owned(),
    ..ServerConfig::default()
  }
}

pub async fn harness(oracle: ScriptedOracle, config: ServerConfig) -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let oracle = Arc::new(oracle);
  let blobs = Arc::new(MemoryBlobs::default());
  let notifier = Arc::new(RecordingNotifier::default());
  let ingestor = Ingestor::new(store.clone(), oracle.clone());

  let processor = EmailProcessor::<TestBackend>::new(blobs.clone(), notifier.clone(), ingestor.clone());
  let (jobs, worker) = spawn_worker(processor, config.queue_capacity);

  let state = AppState {
    store: store.clone(),
    blobs: blobs.clone(),
    notifier: notifier.clone(),
    ingestor,
    jobs,
    config: Arc::new(config),
  };
  Harness { state, worker, store, oracle, blobs, notifier }
}

/// The collaborators of a harness whose queue has been drained.
pub struct Settled {
  pub store:    Arc<SqliteStore>,
  pub oracle:   Arc<ScriptedOracle>,
  pub blobs:    Arc<MemoryBlobs>,
  pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
  /// Close the queue and wait until every accepted email has been processed.
  pub async fn drain(self) -> Settled {
    let Harness { state, worker, store, oracle, blobs, notifier } = self;
    drop(state);
    worker.await.unwrap();
    Settled { store, oracle, blobs, notifier }
  }
}

// ─── Multipart ───────────────────────────────────────────────────────────────

const BOUNDARY: &str = "tripbox-test-boundary";

/// A `multipart/form-data` body built part by part.
#[derive(Default)]
pub struct Form {
  body: Vec<u8>,
}

impl Form {
  pub fn new() -> Self { Self::default() }

  pub fn text(mut self, name: &str, value: &str) -> Self {
    self.body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
    self
  }

  pub fn file(mut self, name: &str, file_name: &str, mime_type: &str, bytes: &[u8]) -> Self {
    self.body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
         filename=\"{file_name}\"\r\nContent-Type: {mime_type}\r\n\r\n"
      )
      .as_bytes(),
    );
    self.body.extend_from_slice(bytes);
    self.body.extend_from_slice(b"\r\n");
    self
  }

  /// Add a fresh, valid provider signature. Providers send it ahead of any
  /// attachment.
  pub fn signed(self) -> Self {
    let timestamp = Utc::now().timestamp().to_string();
    let token = Uuid::new_v4().simple().to_string();
    let signature = sign(SIGNING_KEY, &timestamp, &token).unwrap();
    self.text("timestamp", &timestamp).text("token", &token).text("signature", &signature)
  }

  pub fn into_request(mut self, uri: &str, user: Option<Uuid>) -> Request<Body> {
    self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    self.request(uri, user)
  }

  /// A request whose body stops without the closing boundary, as when a
  /// client never finishes sending the last part.
  pub fn into_unterminated_request(self, uri: &str) -> Request<Body> { self.request(uri, None) }

  fn request(self, uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(user) = user {
      builder = builder.header(tripbox_api::caller::USER_ID_HEADER, user.to_string());
    }
    builder.body(Body::from(self.body)).unwrap()
  }
}
