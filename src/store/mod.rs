//! ==============================================================================
//! store/mod.rs - real-time store backends
//! ==============================================================================
//!
//! purpose:
//!     the external real-time store is a collaborator, not part of the core.
//!     this module defines the two seams the core talks to and the backends
//!     that implement them:
//!
//!     - Subscribe:  register an observer for one path (binder side)
//!     - RecordSink: append a record to that path (publisher side)
//!
//! backends:
//!     - memory.rs:   process-local store (offline demo + test fake)
//!     - firebase.rs: firebase realtime database over its rest api
//!
//! path layouts:
//!     - List   (default): path -> { push_key: record, ... }
//!                         the newest entry (greatest key) is "the latest value"
//!     - Scalar:           path -> record, overwritten in place by the headrest.
//!                         read-only here: an append would nest a push key
//!                         inside the live record
//!
//! relationships:
//!     - used by: binder.rs (Subscribe), publisher.rs (RecordSink), main.rs (Backend)
//!     - uses: domain.rs (PostureRecord)
//!
//! ==============================================================================

pub mod firebase;
pub mod memory;
pub mod mirror;
pub mod sse;

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::binder::RecordObserver;
use crate::domain::PostureRecord;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

// ==============================================================================
// errors
// ==============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stream cancelled by server: {0}")]
    Cancelled(String),
    #[error("invalid store url: {0}")]
    Url(String),
    #[error("path /{0} holds a single record and cannot be appended to")]
    ReadOnly(String),
}

// ==============================================================================
// layout
// ==============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathLayout {
    #[default]
    List,
    Scalar,
}

impl PathLayout {
    /// only a list of entries can take new children
    pub fn accepts_appends(self) -> bool {
        matches!(self, PathLayout::List)
    }
}

/// pick the latest record out of the value currently at the path
pub fn latest_record(value: Option<&Value>, layout: PathLayout) -> Option<PostureRecord> {
    let value = value?;
    match layout {
        PathLayout::Scalar => PostureRecord::from_value(value),
        PathLayout::List => match value {
            // push keys sort chronologically, so the max key is the newest entry
            Value::Object(entries) => entries
                .iter()
                .max_by(|a, b| a.0.cmp(b.0))
                .and_then(|(_, v)| PostureRecord::from_value(v)),
            Value::Null => None,
            // not a map of entries, but the path is not empty either
            other => PostureRecord::from_value(other),
        },
    }
}

// ==============================================================================
// seams
// ==============================================================================

/// source of change notifications for one path
pub trait Subscribe {
    /// start delivering the latest value to `observer`, serially, until the
    /// handle is stopped or the source ends
    fn subscribe(&self, observer: Box<dyn RecordObserver>) -> SubscriptionHandle;
}

/// append-only writer for one path
pub trait RecordSink: Send + Sync + 'static {
    /// append `record` as a new child, returning its key
    fn append(
        &self,
        record: PostureRecord,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

/// a live subscription; stop() ends it
pub struct SubscriptionHandle {
    path: String,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn new(path: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self { path: path.into(), task }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// unsubscribe. the observer is dropped with the task.
    pub fn stop(self) {
        self.task.abort();
        tracing::info!(path = %self.path, "subscription stopped");
    }

    /// wait until the source ends on its own
    #[cfg(test)]
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

// ==============================================================================
// backend selection
// ==============================================================================

/// the backend picked by configuration
#[derive(Clone)]
pub enum Backend {
    Memory(MemoryStore),
    Firebase(FirebaseStore),
}

impl Subscribe for Backend {
    fn subscribe(&self, observer: Box<dyn RecordObserver>) -> SubscriptionHandle {
        match self {
            Backend::Memory(store) => store.subscribe(observer),
            Backend::Firebase(store) => store.subscribe(observer),
        }
    }
}

impl RecordSink for Backend {
    fn append(
        &self,
        record: PostureRecord,
    ) -> impl Future<Output = Result<String, StoreError>> + Send {
        let backend = self.clone();
        async move {
            match backend {
                Backend::Memory(store) => store.append(record).await,
                Backend::Firebase(store) => store.append(record).await,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    /// observer that forwards every notification into a channel
    pub(crate) struct ChannelObserver(pub mpsc::UnboundedSender<Option<PostureRecord>>);

    impl RecordObserver for ChannelObserver {
        fn on_record(&mut self, record: Option<&PostureRecord>) {
            let _ = self.0.send(record.cloned());
        }
    }

    pub(crate) fn channel_observer() -> (
        Box<dyn RecordObserver>,
        mpsc::UnboundedReceiver<Option<PostureRecord>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Box::new(ChannelObserver(tx)), rx)
    }

    #[test]
    fn test_latest_in_list_is_greatest_key() {
        let value = json!({
            "-a001": {"status": "GOOD POSTURE", "distance_cm": 20},
            "-a003": {"status": "SLOUCH DETECTED", "distance_cm": 44},
            "-a002": {"status": "IDLE", "distance_cm": 0}
        });
        let latest = latest_record(Some(&value), PathLayout::List).unwrap();
        assert_eq!(latest.status.as_deref(), Some("SLOUCH DETECTED"));
        assert_eq!(latest.distance_cm, Some(44.0));
    }

    #[test]
    fn test_latest_in_empty_list_is_none() {
        assert_eq!(latest_record(Some(&json!({})), PathLayout::List), None);
        assert_eq!(latest_record(None, PathLayout::List), None);
        assert_eq!(latest_record(Some(&Value::Null), PathLayout::List), None);
    }

    #[test]
    fn test_scalar_layout_reads_path_value() {
        let value = json!({"status": "GOOD POSTURE", "distance_cm": 12.5, "timestamp": "T"});
        let latest = latest_record(Some(&value), PathLayout::Scalar).unwrap();
        assert_eq!(latest.status.as_deref(), Some("GOOD POSTURE"));
        assert_eq!(latest_record(None, PathLayout::Scalar), None);
    }

    #[test]
    fn test_only_list_layout_accepts_appends() {
        assert!(PathLayout::List.accepts_appends());
        assert!(!PathLayout::Scalar.accepts_appends());
    }
}
