//! ==============================================================================
//! publisher.rs - status publisher
//! ==============================================================================
//!
//! purpose:
//!     appends {status, distance_cm, timestamp} to the watched path.
//!     the timestamp is generated here (rfc 3339, utc, millisecond precision).
//!
//! behaviour:
//!     - append-only: prior entries are never touched
//!     - fire-and-forget: the write runs on its own task, failures are logged
//!       and dropped. the JoinHandle is handed back for callers that want to
//!       wait (the cli before exiting, tests), nobody has to.
//!     - no validation of the status label
//!
//! ==============================================================================

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::PostureRecord;
use crate::store::RecordSink;

pub struct Publisher<S> {
    sink: Arc<S>,
}

impl<S> Clone for Publisher<S> {
    fn clone(&self) -> Self {
        Self { sink: self.sink.clone() }
    }
}

impl<S: RecordSink> Publisher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink: Arc::new(sink) }
    }

    pub fn publish(&self, status: impl Into<String>, distance_cm: f64) -> JoinHandle<()> {
        let record = PostureRecord::stamped(status, distance_cm);
        let sink = self.sink.clone();

        tokio::spawn(async move {
            let status = record.status.clone().unwrap_or_default();
            match sink.append(record).await {
                Ok(key) => tracing::info!(key = %key, status = %status, distance_cm, "published"),
                Err(e) => tracing::warn!(error = %e, status = %status, "publish failed"),
            }
        })
    }
}
