//! Optimistic writes
//!
//! Every mutation is spawned onto the runtime and handed back as a
//! `PendingWrite` before the store confirms it. Callers that don't care
//! drop the handle; the task keeps running. A failed write is logged and
//! published as `MarketEvent::WriteFailed`. Nothing is retried or rolled
//! back.

use chrono::Utc;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use ww_common::models::Fields;
use ww_common::paths::DocPath;
use ww_common::status::{Plan, PlannedWrite};
use ww_common::{EventBus, MarketEvent};

use crate::store::DocumentStore;

/// Final state of one write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Committed,
    Failed(String),
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }
}

/// First failed write of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct WriteFailure {
    pub path: String,
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write to {} failed: {}", self.path, self.message)
    }
}

impl std::error::Error for WriteFailure {}

/// Handle to an in-flight write
#[derive(Debug)]
pub struct PendingWrite {
    path: DocPath,
    handle: JoinHandle<WriteOutcome>,
}

impl PendingWrite {
    /// Wait for the store to accept or reject the write
    pub async fn outcome(self) -> WriteOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => WriteOutcome::Failed(format!("write task aborted: {}", e)),
        }
    }
}

/// Writes issued together for one action
#[derive(Debug, Default)]
pub struct PendingBatch {
    writes: Vec<PendingWrite>,
}

impl PendingBatch {
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.writes.iter().map(|w| w.path.to_string()).collect()
    }

    /// Outcomes in issue order
    pub async fn outcomes(self) -> Vec<(DocPath, WriteOutcome)> {
        join_all(self.writes.into_iter().map(|write| async move {
            let path = write.path.clone();
            (path, write.outcome().await)
        }))
        .await
    }

    /// Await every write; `Err` carries the first failure in issue order
    pub async fn settle(self) -> Result<(), WriteFailure> {
        for (path, outcome) in self.outcomes().await {
            if let WriteOutcome::Failed(message) = outcome {
                return Err(WriteFailure {
                    path: path.to_string(),
                    message,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum WriteKind {
    Add,
    Update,
}

/// Issues store writes without waiting for them
#[derive(Clone)]
pub struct OptimisticWriter {
    store: Arc<dyn DocumentStore>,
    events: EventBus,
}

impl OptimisticWriter {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Create a document
    pub fn add(&self, path: DocPath, fields: Fields) -> PendingWrite {
        self.spawn(WriteKind::Add, path, fields)
    }

    /// Merge fields into an existing document
    pub fn update(&self, path: DocPath, fields: Fields) -> PendingWrite {
        self.spawn(WriteKind::Update, path, fields)
    }

    /// Issue every write of a plan, unordered
    pub fn apply(&self, plan: Plan) -> PendingBatch {
        let writes = plan
            .writes
            .into_iter()
            .map(|write| match write {
                PlannedWrite::Create { path, fields } => self.add(path, fields),
                PlannedWrite::Update { path, fields } => self.update(path, fields),
            })
            .collect();
        let batch = PendingBatch { writes };
        if !batch.is_empty() {
            debug!(count = batch.len(), paths = ?batch.paths(), "Writes issued");
        }
        batch
    }

    fn spawn(&self, kind: WriteKind, path: DocPath, fields: Fields) -> PendingWrite {
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            let result = match kind {
                WriteKind::Add => store.set(&task_path, fields).await,
                WriteKind::Update => store.update(&task_path, fields).await,
            };
            match result {
                Ok(()) => {
                    debug!(path = %task_path, "Write committed");
                    WriteOutcome::Committed
                }
                Err(e) => {
                    let message = e.to_string();
                    error!(path = %task_path, error = %message, "Optimistic write failed");
                    events.emit_lossy(MarketEvent::WriteFailed {
                        path: task_path.to_string(),
                        message: message.clone(),
                        timestamp: Utc::now(),
                    });
                    WriteOutcome::Failed(message)
                }
            }
        });

        PendingWrite { path, handle }
    }
}
