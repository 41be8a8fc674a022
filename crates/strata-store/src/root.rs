//! Root dispatch store
//!
//! The thin, replaceable collaborator every facade funnels its changes
//! through: one shared [`StateTree`], one insertion-ordered reducer chain,
//! and synchronous subscriber notification followed by a scheduler drain.
//!
//! # Cooperative model
//!
//! Dispatch is synchronous and cooperative: drive one store from one
//! thread at a time. The internal locks protect structural integrity
//! (concurrent reducer registration, subscription churn), not cross-thread
//! dispatch ordering.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::trace;
use uuid::Uuid;

use strata_core::{Action, Scheduler, SlicePath, StateTree, StateValue, StrataError, Subject};

use crate::mount::MountPoint;

/// Reducer signature consumed by the store: pure and synchronous.
pub type Reducer = Arc<dyn Fn(&StateTree, &Action) -> StateTree + Send + Sync>;

type RootCallback = Arc<dyn Fn(&StateTree) + Send + Sync>;

/// Commit record emitted exactly once per successful root-level mutation.
///
/// Never emitted for a discarded (error-aborted) mutation.
#[derive(Clone, Debug)]
pub struct MutatorEvent {
    /// Unique id of this commit.
    pub id: Uuid,
    /// The dispatched action.
    pub action: Action,
    /// The committed sub-state.
    pub state: StateValue,
    /// Wall-clock duration of the synchronous call, when duration
    /// measurement is enabled.
    pub duration: Option<Duration>,
}

struct ReducerEntry {
    id: u64,
    reduce: Reducer,
}

struct RootCallbackEntry {
    id: u64,
    notify: RootCallback,
}

struct RootStoreInner {
    state: RwLock<StateTree>,
    reducers: RwLock<Vec<ReducerEntry>>,
    subscribers: RwLock<Vec<RootCallbackEntry>>,
    paths: Mutex<BTreeSet<SlicePath>>,
    scheduler: Scheduler,
    events: Subject<MutatorEvent>,
    next_id: AtomicU64,
}

/// The shared root store. Cheap to clone; all clones address the same
/// state, reducer chain and scheduler.
#[derive(Clone)]
pub struct RootStore {
    inner: Arc<RootStoreInner>,
}

impl RootStore {
    /// Create an empty root store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RootStoreInner {
                state: RwLock::new(StateTree::new()),
                reducers: RwLock::new(Vec::new()),
                subscribers: RwLock::new(Vec::new()),
                paths: Mutex::new(BTreeSet::new()),
                scheduler: Scheduler::new(),
                events: Subject::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The current committed root state.
    #[must_use]
    pub fn state(&self) -> StateTree {
        self.inner.state.read().clone()
    }

    /// Dispatch an action through the reducer chain.
    ///
    /// Reducers run in registration order, each output feeding the next.
    /// Root subscribers are then notified synchronously with the new tree,
    /// and the scheduler drains so deferred change deliveries run before
    /// control returns to external code. Returns the action unchanged.
    pub fn dispatch(&self, action: Action) -> Action {
        trace!(action = %action.action_type(), "dispatch");
        let reducers: Vec<Reducer> = self
            .inner
            .reducers
            .read()
            .iter()
            .map(|entry| entry.reduce.clone())
            .collect();
        let current = self.inner.state.read().clone();
        let next = reducers
            .iter()
            .fold(current, |tree, reduce| reduce(&tree, &action));
        *self.inner.state.write() = next.clone();

        let subscribers: Vec<RootCallback> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|entry| entry.notify.clone())
            .collect();
        for notify in subscribers {
            notify(&next);
        }
        self.inner.scheduler.drain();
        action
    }

    /// Create a mount point addressing `path`.
    ///
    /// The path becomes live; mounting an already-live path is a
    /// [`StrataError::PathCollision`].
    pub fn mount(&self, path: SlicePath) -> Result<MountPoint, StrataError> {
        MountPoint::attach(self.clone(), path)
    }

    /// The commit-record stream for this store.
    #[must_use]
    pub fn events(&self) -> Subject<MutatorEvent> {
        self.inner.events.clone()
    }

    /// The deferred-delivery scheduler shared by this store's facades.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.inner.scheduler.clone()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn add_reducer(&self, reduce: Reducer) -> u64 {
        let id = self.next_id();
        self.inner.reducers.write().push(ReducerEntry { id, reduce });
        id
    }

    pub(crate) fn remove_reducer(&self, id: u64) {
        self.inner.reducers.write().retain(|entry| entry.id != id);
    }

    pub(crate) fn subscribe_root(&self, notify: impl Fn(&StateTree) + Send + Sync + 'static) -> u64 {
        let id = self.next_id();
        self.inner.subscribers.write().push(RootCallbackEntry {
            id,
            notify: Arc::new(notify),
        });
        id
    }

    pub(crate) fn unsubscribe_root(&self, id: u64) {
        self.inner.subscribers.write().retain(|entry| entry.id != id);
    }

    pub(crate) fn claim_path(&self, path: &SlicePath) -> Result<(), StrataError> {
        let mut paths = self.inner.paths.lock();
        if paths.contains(path) {
            return Err(StrataError::path_collision(path.to_string()));
        }
        paths.insert(path.clone());
        Ok(())
    }

    pub(crate) fn release_path(&self, path: &SlicePath) {
        self.inner.paths.lock().remove(path);
    }
}

impl Default for RootStore {
    fn default() -> Self {
        Self::new()
    }
}
