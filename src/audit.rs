//! Audit log sink
//!
//! Every served prediction miss is appended to `prediction_log`. The primary
//! path hands the record to a background writer task over a bounded channel
//! and returns immediately; if the channel cannot accept the record, the
//! insert happens inline. Persistence failures on either path are logged and
//! swallowed: audit logging never fails a prediction request.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::models::NewPredictionLog;

const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<NewPredictionLog>,
    pool: PgPool,
}

impl AuditSink {
    /// Spawn the background writer and return the handle shared by handlers
    pub fn spawn(pool: PgPool) -> Self {
        let (tx, mut rx) = mpsc::channel::<NewPredictionLog>(QUEUE_CAPACITY);

        let writer_pool = pool.clone();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(err) = entry.insert(&writer_pool).await {
                    tracing::error!("Failed to persist prediction log for {}: {}", entry.url, err);
                }
            }
        });

        Self { tx, pool }
    }

    /// Record a served prediction, best-effort
    pub async fn record(&self, entry: NewPredictionLog) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) | Err(TrySendError::Closed(entry)) => {
                // Queue unavailable: persist inline instead
                if let Err(err) = entry.insert(&self.pool).await {
                    tracing::warn!(
                        "Inline prediction log insert failed for {}: {}",
                        entry.url,
                        err
                    );
                }
            }
        }
    }
}
