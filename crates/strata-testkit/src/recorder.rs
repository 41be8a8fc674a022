//! Commit recorder
//!
//! Records every commit record a root store emits, in delivery order.
//! Useful for asserting commit counts and action ordering in tests, and as
//! the minimal example of an external recording collaborator.

use std::sync::Arc;

use parking_lot::Mutex;

use strata_store::{MutatorEvent, RootStore, SubjectSubscription};

/// Records the commit-record stream of one root store.
///
/// Recording stops when the recorder is dropped.
pub struct CommitRecorder {
    events: Arc<Mutex<Vec<MutatorEvent>>>,
    _subscription: SubjectSubscription<MutatorEvent>,
}

impl CommitRecorder {
    /// Attach a recorder to `store`.
    #[must_use]
    pub fn attach(store: &RootStore) -> Self {
        let events: Arc<Mutex<Vec<MutatorEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscription = store
            .events()
            .subscribe(move |event| sink.lock().push(event.clone()));
        Self {
            events,
            _subscription: subscription,
        }
    }

    /// All recorded commit records, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<MutatorEvent> {
        self.events.lock().clone()
    }

    /// The recorded action types, in delivery order.
    #[must_use]
    pub fn action_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.action.action_type().to_string())
            .collect()
    }

    /// Number of recorded commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True iff nothing was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Export the recording as JSON: id, action and duration per commit.
    ///
    /// Slice values are type-erased and stay out of the export.
    #[must_use]
    pub fn export_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .events
            .lock()
            .iter()
            .map(|event| {
                serde_json::json!({
                    "id": event.id.to_string(),
                    "action": event.action,
                    "duration_micros": event.duration.map(|d| d.as_micros() as u64),
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}
