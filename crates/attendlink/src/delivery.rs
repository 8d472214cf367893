//! Delivery-state bookkeeping.
//!
//! After every notification attempt the week's `messageState` flag is set to
//! whether the attempt got through. The write is a single idempotent upsert;
//! the last write wins and no history is kept.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::WeekNumber;

/// Where delivery flags are persisted.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Set the delivery flag of one student's week.
    ///
    /// Must be an idempotent upsert keyed by `(student_id, week)`.
    async fn set_message_state(&self, student_id: &str, week: WeekNumber, delivered: bool)
        -> Result<()>;
}

#[async_trait]
impl<S: DeliveryStore + ?Sized> DeliveryStore for Arc<S> {
    async fn set_message_state(
        &self,
        student_id: &str,
        week: WeekNumber,
        delivered: bool,
    ) -> Result<()> {
        (**self).set_message_state(student_id, week, delivered).await
    }
}

/// Outcome of the delivery-state write itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Persistence {
    /// The flag is durably recorded.
    Persisted,
    /// The write failed; the stored flag may be stale.
    Failed {
        /// Why the write failed.
        reason: String,
    },
}

impl Persistence {
    /// Whether the flag was durably recorded.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted => write!(f, "persisted"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Records notification outcomes against a [`DeliveryStore`].
#[derive(Debug, Clone)]
pub struct DeliveryRecorder<S> {
    store: S,
}

impl<S: DeliveryStore> DeliveryRecorder<S> {
    /// Create a recorder over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record whether an attempt succeeded.
    ///
    /// Always completes. A failed write is reported in the returned
    /// [`Persistence`], never as an error, so the caller can tell it apart
    /// from validation and channel failures.
    pub async fn record(&self, student_id: &str, week: WeekNumber, succeeded: bool) -> Persistence {
        match self.store.set_message_state(student_id, week, succeeded).await {
            Ok(()) => {
                debug!(student_id, %week, delivered = succeeded, "Recorded delivery state");
                Persistence::Persisted
            }
            Err(e) => {
                warn!(student_id, %week, delivered = succeeded, error = %e, "Failed to record delivery state");
                Persistence::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    /// In-memory store that remembers every write.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        pub flags: Mutex<HashMap<(String, u32), bool>>,
        pub writes: Mutex<Vec<(String, u32, bool)>>,
    }

    impl MemoryStore {
        pub fn flag(&self, student_id: &str, week: u32) -> Option<bool> {
            self.flags
                .lock()
                .unwrap()
                .get(&(student_id.to_string(), week))
                .copied()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DeliveryStore for MemoryStore {
        async fn set_message_state(
            &self,
            student_id: &str,
            week: WeekNumber,
            delivered: bool,
        ) -> Result<()> {
            self.flags
                .lock()
                .unwrap()
                .insert((student_id.to_string(), week.get()), delivered);
            self.writes
                .lock()
                .unwrap()
                .push((student_id.to_string(), week.get(), delivered));
            Ok(())
        }
    }

    /// Store whose writes always fail.
    #[derive(Debug, Default)]
    pub struct FailingStore;

    #[async_trait]
    impl DeliveryStore for FailingStore {
        async fn set_message_state(&self, _: &str, _: WeekNumber, _: bool) -> Result<()> {
            Err(Error::internal("database is locked"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FailingStore, MemoryStore};
    use super::*;

    #[tokio::test]
    async fn test_record_persists_flag() {
        let recorder = DeliveryRecorder::new(MemoryStore::default());

        let outcome = recorder.record("42", WeekNumber::FIRST, true).await;

        assert_eq!(outcome, Persistence::Persisted);
        assert_eq!(recorder.store().flag("42", 1), Some(true));
    }

    #[tokio::test]
    async fn test_record_twice_is_idempotent() {
        let recorder = DeliveryRecorder::new(MemoryStore::default());

        recorder.record("42", WeekNumber::FIRST, true).await;
        recorder.record("42", WeekNumber::FIRST, true).await;

        assert_eq!(recorder.store().flag("42", 1), Some(true));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let recorder = DeliveryRecorder::new(MemoryStore::default());

        recorder.record("42", WeekNumber::FIRST, false).await;
        recorder.record("42", WeekNumber::FIRST, true).await;
        assert_eq!(recorder.store().flag("42", 1), Some(true));

        recorder.record("42", WeekNumber::FIRST, false).await;
        assert_eq!(recorder.store().flag("42", 1), Some(false));
    }

    #[tokio::test]
    async fn test_weeks_are_independent() {
        let recorder = DeliveryRecorder::new(MemoryStore::default());
        let week2 = WeekNumber::new(2).unwrap();

        recorder.record("42", WeekNumber::FIRST, true).await;
        recorder.record("42", week2, false).await;

        assert_eq!(recorder.store().flag("42", 1), Some(true));
        assert_eq!(recorder.store().flag("42", 2), Some(false));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let recorder = DeliveryRecorder::new(FailingStore);

        let outcome = recorder.record("42", WeekNumber::FIRST, true).await;

        assert!(!outcome.is_persisted());
        match outcome {
            Persistence::Failed { reason } => assert!(reason.contains("database is locked")),
            Persistence::Persisted => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_shared_store_through_arc() {
        let store = Arc::new(MemoryStore::default());
        let recorder = DeliveryRecorder::new(Arc::clone(&store));

        recorder.record("7", WeekNumber::FIRST, true).await;

        assert_eq!(store.flag("7", 1), Some(true));
    }

    #[test]
    fn test_persistence_serializes_with_status_tag() {
        let json = serde_json::to_string(&Persistence::Failed {
            reason: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"boom"}"#);
        assert_eq!(Persistence::Persisted.to_string(), "persisted");
    }
}
