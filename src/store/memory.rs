//! ==============================================================================
//! store/memory.rs - process-local real-time store
//! ==============================================================================
//!
//! purpose:
//!     stands in for firebase when running offline (`backend = "memory"`)
//!     and as the fake behind binder/publisher tests.
//!
//! semantics:
//!     - the path holds an Option<serde_json::Value> behind a tokio watch channel
//!     - subscribe delivers the current value straight away, then every change
//!     - rapid writes coalesce: an observer that falls behind only sees the
//!       newest value (latest write wins)
//!     - append inserts under a generated, monotonically increasing key
//!     - a scalar path refuses appends and is left untouched
//!
//! ==============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{latest_record, PathLayout, RecordSink, StoreError, Subscribe, SubscriptionHandle};
use crate::binder::RecordObserver;
use crate::domain::PostureRecord;

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: String,
    layout: PathLayout,
    value: watch::Sender<Option<Value>>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new(path: impl Into<String>, layout: PathLayout) -> Self {
        let (value, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                layout,
                value,
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// overwrite the whole path (json null empties it)
    #[cfg(test)]
    pub fn set(&self, value: Value) {
        let value = if value.is_null() { None } else { Some(value) };
        self.inner.value.send_replace(value);
    }

    /// delete everything at the path
    #[cfg(test)]
    pub fn remove(&self) {
        self.inner.value.send_replace(None);
    }

    /// current value at the path
    pub fn snapshot(&self) -> Option<Value> {
        self.inner.value.borrow().clone()
    }

    /// insert a record under a fresh key and return the key
    pub fn push(&self, record: &PostureRecord) -> Result<String, StoreError> {
        if !self.inner.layout.accepts_appends() {
            return Err(StoreError::ReadOnly(self.inner.path.clone()));
        }
        let entry = serde_json::to_value(record)?;
        let key = format!("-{:019}", self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1);

        self.inner.value.send_modify(|slot| {
            let mut entries = match slot.take() {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            entries.insert(key.clone(), entry);
            *slot = Some(Value::Object(entries));
        });

        tracing::debug!(path = %self.inner.path, key = %key, "memory append");
        Ok(key)
    }
}

impl Subscribe for MemoryStore {
    fn subscribe(&self, mut observer: Box<dyn RecordObserver>) -> SubscriptionHandle {
        let mut rx = self.inner.value.subscribe();
        let layout = self.inner.layout;

        let task = tokio::spawn(async move {
            loop {
                let latest = {
                    let value = rx.borrow_and_update();
                    latest_record(value.as_ref(), layout)
                };
                observer.on_record(latest.as_ref());

                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        SubscriptionHandle::new(self.inner.path.clone(), task)
    }
}

impl RecordSink for MemoryStore {
    fn append(
        &self,
        record: PostureRecord,
    ) -> impl Future<Output = Result<String, StoreError>> + Send {
        let store = self.clone();
        async move { store.push(&record) }
    }
}
