use switchboard_data::UsageRecord;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::UsageService;

/// Detached usage writer
///
/// Records go through a bounded channel to a single background task,
/// so recording never blocks a response and concurrency stays fixed
/// under load. When the queue is full the record is dropped.
#[derive(Clone)]
pub struct UsageRecorder {
    tx: mpsc::Sender<UsageRecord>,
}

impl UsageRecorder {
    /// Create a recorder and spawn its worker
    ///
    /// The worker runs until every sender is dropped.
    pub fn spawn(service: UsageService, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tokio::spawn(process_records(rx, service));

        Self { tx }
    }

    /// Enqueue a record without waiting
    pub fn record(&self, record: UsageRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    model_id = %record.model_id,
                    total_tokens = record.total_tokens,
                    "usage queue full, dropping record"
                );
            }
            Err(TrySendError::Closed(record)) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    model_id = %record.model_id,
                    "usage recorder stopped, dropping record"
                );
            }
        }
    }
}

impl std::fmt::Debug for UsageRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageRecorder")
            .field("capacity", &self.tx.max_capacity())
            .finish_non_exhaustive()
    }
}

async fn process_records(mut rx: mpsc::Receiver<UsageRecord>, service: UsageService) {
    while let Some(record) = rx.recv().await {
        let user_id = record.user_id.clone();

        match service.record_usage(record).await {
            Ok(stored) => tracing::debug!(
                user_id = %stored.user_id,
                total_tokens = stored.total_tokens,
                cost = stored.cost,
                "usage recorded"
            ),
            Err(e) => tracing::warn!(error = %e, %user_id, "failed to record usage"),
        }
    }

    tracing::debug!("usage recorder shutting down");
}
