//! The bounded background queue between the email webhook and ingestion.
//!
//! The webhook answers the provider as soon as a job is queued; a single
//! worker processes jobs in arrival order. When every [`JobQueue`] handle is
//! dropped the worker finishes the queued jobs and exits, so awaiting its
//! handle on shutdown drains the queue.

use bytes::Bytes;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Backend, error::Error, webhook::EmailProcessor};

/// One file attached to a forwarded email.
#[derive(Debug, Clone)]
pub struct Attachment {
  pub file_name: Option<String>,
  pub mime_type: String,
  pub bytes:     Bytes,
}

/// An accepted delivery awaiting ingestion.
#[derive(Debug, Clone)]
pub struct EmailJob {
  pub user_id:     Uuid,
  pub subject:     Option<String>,
  pub sender:      Option<String>,
  pub html:        Option<String>,
  pub plain:       Option<String>,
  pub attachments: Vec<Attachment>,
}

#[derive(Clone)]
pub struct JobQueue {
  tx: mpsc::Sender<EmailJob>,
}

impl JobQueue {
  /// Queue `job` without waiting. A full queue is reported rather than
  /// awaited so the webhook can answer within the provider's timeout.
  pub fn enqueue(&self, job: EmailJob) -> Result<(), Error> {
    self.tx.try_send(job).map_err(|e| {
      let job = match &e {
        mpsc::error::TrySendError::Full(job) | mpsc::error::TrySendError::Closed(job) => job,
      };
      warn!(user_id = %job.user_id, error = %e, "could not queue email job");
      Error::QueueFull
    })
  }
}

/// Start the worker. Returns the queue handle and the worker's join handle.
pub fn spawn_worker<B: Backend>(
  processor: EmailProcessor<B>,
  capacity: usize,
) -> (JobQueue, JoinHandle<()>) {
  let (tx, mut rx) = mpsc::channel::<EmailJob>(capacity.max(1));

  let handle = tokio::spawn(async move {
    while let Some(job) = rx.recv().await {
      processor.process(job).await;
    }
    info!("email queue drained, worker stopping");
  });

  (JobQueue { tx }, handle)
}
