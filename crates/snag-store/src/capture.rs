//! Getting faults into a store.
//!
//! [`log_fault`] writes synchronously with respect to the caller's task.
//! [`spawn_capture`] starts a background writer and returns a
//! [`CapturePolicy`] to subscribe on a raise channel: every raised fault is
//! snapshotted at raise time (tags included) and queued for the writer, so the
//! raising thread never waits on the store. The queue is bounded; when it is
//! full, records are dropped with a warning instead of blocking the raise.
use std::collections::BTreeMap;
use std::sync::Arc;

use snag_error::{ErrorPolicy, Fault, LevelExt, Severity};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{ErrorRecord, ErrorStore, StoreError};

/// Queue length used by [`spawn_capture`].
pub const DEFAULT_CAPTURE_CAPACITY: usize = 1024;

/// Log every leaf of `fault` with the given extra custom data. Returns the ids
/// of the written records, in tree order.
pub async fn log_fault<S>(
    store: &S,
    fault: &Fault,
    application_name: &str,
    extra: &BTreeMap<String, String>,
) -> Result<Vec<Uuid>, StoreError>
where
    S: ErrorStore + ?Sized,
{
    let mut ids = Vec::new();
    for record in ErrorRecord::from_fault_tree(fault, application_name, extra) {
        ids.push(store.log(record).await?);
    }
    Ok(ids)
}

enum CaptureMessage {
    Record(ErrorRecord),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Raise handler that queues faults for the capture worker.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    application_name: String,
    sender: mpsc::Sender<CaptureMessage>,
}

impl std::fmt::Debug for CaptureMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMessage::Record(r) => f.debug_tuple("Record").field(&r.id).finish(),
            CaptureMessage::Flush(_) => f.write_str("Flush"),
            CaptureMessage::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl ErrorPolicy for CapturePolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        fault.try_get_level()
    }

    fn emit(&self, fault: &Fault) {
        for record in ErrorRecord::from_fault_tree(fault, &self.application_name, &BTreeMap::new())
        {
            match self.sender.try_send(CaptureMessage::Record(record)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    tracing::warn!(?dropped, fault = %fault, "capture queue full; fault not stored");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(fault = %fault, "capture worker is gone; fault not stored");
                    return;
                }
            }
        }
    }
}

/// Controls the background writer started by [`spawn_capture`].
#[derive(Debug)]
pub struct CaptureHandle {
    sender: mpsc::Sender<CaptureMessage>,
    worker: JoinHandle<usize>,
}

impl CaptureHandle {
    /// Wait until everything queued before this call has been written.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (responder, done) = oneshot::channel();
        self.sender
            .send(CaptureMessage::Flush(responder))
            .await
            .map_err(|_| StoreError::Closed)?;
        done.await.map_err(|_| StoreError::Closed)
    }

    /// Drain the queue, stop the worker and return how many records it wrote.
    ///
    /// Policies still subscribed after this will log a warning per raise.
    pub async fn shutdown(self) -> Result<usize, StoreError> {
        self.sender
            .send(CaptureMessage::Shutdown)
            .await
            .map_err(|_| StoreError::Closed)?;
        self.worker.await.map_err(|_| StoreError::Closed)
    }
}

/// Start the background writer on the current tokio runtime, with a queue of
/// [`DEFAULT_CAPTURE_CAPACITY`] records.
pub fn spawn_capture(
    store: Arc<dyn ErrorStore>,
    application_name: impl Into<String>,
) -> (CapturePolicy, CaptureHandle) {
    spawn_capture_with_capacity(store, application_name, DEFAULT_CAPTURE_CAPACITY)
}

/// [`spawn_capture`] with an explicit queue length. `capacity` must be
/// non-zero.
pub fn spawn_capture_with_capacity(
    store: Arc<dyn ErrorStore>,
    application_name: impl Into<String>,
    capacity: usize,
) -> (CapturePolicy, CaptureHandle) {
    let (sender, mut receiver) = mpsc::channel::<CaptureMessage>(capacity.max(1));
    let worker = tokio::spawn(async move {
        let mut written = 0usize;
        while let Some(message) = receiver.recv().await {
            match message {
                CaptureMessage::Record(record) => match store.log(record).await {
                    Ok(id) => {
                        written += 1;
                        tracing::trace!(store = store.name(), %id, "captured fault");
                    }
                    Err(e) => tracing::error!(store = store.name(), error = %e, "failed to store fault"),
                },
                CaptureMessage::Flush(responder) => {
                    let _ = responder.send(());
                }
                CaptureMessage::Shutdown => break,
            }
        }
        written
    });
    let policy = CapturePolicy {
        application_name: application_name.into(),
        sender: sender.clone(),
    };
    (policy, CaptureHandle { sender, worker })
}
