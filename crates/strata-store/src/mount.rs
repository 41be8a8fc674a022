//! Mount points
//!
//! A [`MountPoint`] addresses one named sub-tree of a root store's shared
//! state tree. Facades commit through their mount point, register reducers
//! through it, and observe committed root changes through it. Mount points
//! nest: a child's path is a strict descendant of its parent's, and
//! destroying a parent cascade-destroys its children via the one-shot
//! destroy signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use strata_core::{Action, OnceSignal, SlicePath, StateTree, StateValue, StrataError};

use crate::root::{Reducer, RootStore};

struct MountInner {
    root: RootStore,
    path: SlicePath,
    destroyed: AtomicBool,
    destroy_signal: OnceSignal,
    reducer_ids: Mutex<Vec<u64>>,
    subscriber_ids: Mutex<Vec<u64>>,
}

/// An addressable sub-path of one shared root state tree.
///
/// Cheap to clone; all clones address the same mount.
#[derive(Clone)]
pub struct MountPoint {
    inner: Arc<MountInner>,
}

impl std::fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPoint")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl MountPoint {
    /// Attach a mount point to `root` at `path`, claiming the path.
    pub(crate) fn attach(root: RootStore, path: SlicePath) -> Result<Self, StrataError> {
        root.claim_path(&path)?;
        debug!(path = %path, "mount point created");
        Ok(Self {
            inner: Arc::new(MountInner {
                root,
                path,
                destroyed: AtomicBool::new(false),
                destroy_signal: OnceSignal::new(),
                reducer_ids: Mutex::new(Vec::new()),
                subscriber_ids: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The path this mount point addresses.
    #[must_use]
    pub fn path(&self) -> &SlicePath {
        &self.inner.path
    }

    /// The root store this mount point belongs to.
    #[must_use]
    pub fn root(&self) -> &RootStore {
        &self.inner.root
    }

    /// True once [`MountPoint::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Current committed sub-state at this path.
    ///
    /// `None` if the path holds no value yet, or if the mount point is
    /// destroyed.
    #[must_use]
    pub fn get_state(&self) -> Option<StateValue> {
        if self.is_destroyed() {
            return None;
        }
        self.extract_state(&self.inner.root.state())
    }

    /// Pure projection of this mount's sub-state out of `tree`.
    #[must_use]
    pub fn extract_state(&self, tree: &StateTree) -> Option<StateValue> {
        tree.get(&self.inner.path).cloned()
    }

    /// Return a new tree with this mount's sub-state replaced by `value`.
    ///
    /// Pure structural replacement; on a destroyed mount point the input
    /// tree is returned unchanged.
    #[must_use]
    pub fn set_state(&self, tree: &StateTree, value: StateValue) -> StateTree {
        if self.is_destroyed() {
            warn!(path = %self.inner.path, "set_state on destroyed mount point ignored");
            return tree.clone();
        }
        tree.with_value(&self.inner.path, value)
    }

    /// Register a reducer into the root chain. Chain order is insertion
    /// order across the whole store; the reducer is removed at destroy.
    pub fn add_reducer(
        &self,
        reduce: impl Fn(&StateTree, &Action) -> StateTree + Send + Sync + 'static,
    ) -> Result<(), StrataError> {
        if self.is_destroyed() {
            return Err(StrataError::destroyed(format!(
                "mount point {}",
                self.inner.path
            )));
        }
        let id = self.inner.root.add_reducer(Arc::new(reduce) as Reducer);
        self.inner.reducer_ids.lock().push(id);
        Ok(())
    }

    /// Create a child mount point at `child` below this path.
    ///
    /// The child's path must not collide with a live path. The child
    /// observes this mount's destroy signal and is destroyed with it.
    pub fn create_deep_mount_point(&self, child: &str) -> Result<MountPoint, StrataError> {
        if self.is_destroyed() {
            return Err(StrataError::destroyed(format!(
                "mount point {}",
                self.inner.path
            )));
        }
        let path = self.inner.path.child(child)?;
        let mount = MountPoint::attach(self.inner.root.clone(), path)?;
        let weak: Weak<MountInner> = Arc::downgrade(&mount.inner);
        self.inner.destroy_signal.observe(move || {
            if let Some(inner) = weak.upgrade() {
                MountPoint { inner }.destroy();
            }
        });
        Ok(mount)
    }

    /// Observe committed root-state changes.
    ///
    /// The callback is invoked once per committed root-state change, after
    /// all reducers ran, with this mount's projected sub-state. Returns an
    /// RAII guard; dropping it unsubscribes.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&StateValue>) + Send + Sync + 'static,
    ) -> Result<MountSubscription, StrataError> {
        if self.is_destroyed() {
            return Err(StrataError::destroyed(format!(
                "mount point {}",
                self.inner.path
            )));
        }
        let path = self.inner.path.clone();
        let id = self
            .inner
            .root
            .subscribe_root(move |tree| callback(tree.get(&path)));
        self.inner.subscriber_ids.lock().push(id);
        Ok(MountSubscription {
            root: self.inner.root.clone(),
            mount: Arc::downgrade(&self.inner),
            id,
        })
    }

    /// Observe this mount point's destruction (take-one semantics).
    pub fn observe_destroy(&self, observer: impl FnOnce() + Send + 'static) {
        self.inner.destroy_signal.observe(observer);
    }

    /// Destroy this mount point. Idempotent.
    ///
    /// Removes its reducers and subscriptions from the root chain, frees
    /// the path for reuse, and fires the destroy signal, cascading to
    /// child mount points. The last committed sub-state value stays in the
    /// tree; a successor mounted at the same path overwrites it when it
    /// seeds.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(path = %self.inner.path, "mount point destroyed");
        for id in self.inner.reducer_ids.lock().drain(..) {
            self.inner.root.remove_reducer(id);
        }
        for id in self.inner.subscriber_ids.lock().drain(..) {
            self.inner.root.unsubscribe_root(id);
        }
        self.inner.root.release_path(&self.inner.path);
        self.inner.destroy_signal.notify();
    }
}

/// RAII guard for a mount-point subscription; dropping it unsubscribes.
pub struct MountSubscription {
    root: RootStore,
    mount: Weak<MountInner>,
    id: u64,
}

impl Drop for MountSubscription {
    fn drop(&mut self) {
        self.root.unsubscribe_root(self.id);
        if let Some(mount) = self.mount.upgrade() {
            mount.subscriber_ids.lock().retain(|id| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::OwnerId;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).expect("valid owner")
    }

    fn path(s: &str) -> SlicePath {
        SlicePath::parse(s).expect("valid path")
    }

    fn noop_action() -> Action {
        Action::new(&owner("x"), "noop", Vec::new(), Vec::new())
    }

    #[test]
    fn test_mount_claims_path() {
        let store = RootStore::new();
        let _mount = store.mount(path("todos")).expect("first mount");
        let err = store.mount(path("todos")).expect_err("collision");
        assert!(matches!(err, StrataError::PathCollision { .. }));
    }

    #[test]
    fn test_set_and_extract_are_pure() {
        let store = RootStore::new();
        let mount = store.mount(path("todos")).expect("mount");
        let before = store.state();
        let after = mount.set_state(&before, StateValue::new(3_u32));
        assert!(mount.extract_state(&before).is_none());
        assert_eq!(
            mount.extract_state(&after).and_then(|v| v.downcast::<u32>()),
            Some(3)
        );
        // The store itself is untouched by the pure operation.
        assert!(mount.get_state().is_none());
    }

    #[test]
    fn test_subscribe_sees_reducer_output() {
        let store = RootStore::new();
        let mount = store.mount(path("todos")).expect("mount");
        let p = mount.path().clone();
        mount
            .add_reducer(move |tree, _action| tree.with_value(&p, StateValue::new(1_u32)))
            .expect("add reducer");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let seen = seen.clone();
            mount
                .subscribe(move |value| {
                    seen.lock().push(value.and_then(|v| v.downcast::<u32>()));
                })
                .expect("subscribe")
        };
        store.dispatch(noop_action());
        assert_eq!(*seen.lock(), vec![Some(1)]);
        drop(sub);
        store.dispatch(noop_action());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_destroy_frees_path_and_removes_reducers() {
        let store = RootStore::new();
        let mount = store.mount(path("todos")).expect("mount");
        let p = mount.path().clone();
        mount
            .add_reducer(move |tree, _action| tree.with_value(&p, StateValue::new(1_u32)))
            .expect("add reducer");
        mount.destroy();
        mount.destroy(); // idempotent
        assert!(mount.is_destroyed());
        store.dispatch(noop_action());
        assert!(!store.state().contains(&path("todos")));
        // Path is free for reuse.
        let _again = store.mount(path("todos")).expect("remount after destroy");
        // Operations on the destroyed mount are errors or no-ops.
        assert!(mount.add_reducer(|tree, _| tree.clone()).is_err());
        assert!(mount.subscribe(|_| {}).is_err());
        assert!(mount.get_state().is_none());
    }

    #[test]
    fn test_deep_mount_point_paths() {
        let store = RootStore::new();
        let parent = store.mount(path("app")).expect("mount");
        let child = parent.create_deep_mount_point("todos").expect("child");
        assert_eq!(child.path().to_string(), "app.todos");
        assert!(parent.path().is_ancestor_of(child.path()));
        let err = parent
            .create_deep_mount_point("todos")
            .expect_err("collision");
        assert!(matches!(err, StrataError::PathCollision { .. }));
    }

    #[test]
    fn test_destroy_cascades_to_children() {
        let store = RootStore::new();
        let parent = store.mount(path("app")).expect("mount");
        let child = parent.create_deep_mount_point("todos").expect("child");
        let grandchild = child.create_deep_mount_point("items").expect("grandchild");
        parent.destroy();
        assert!(child.is_destroyed());
        assert!(grandchild.is_destroyed());
    }

    #[test]
    fn test_destroy_signal_take_one() {
        let store = RootStore::new();
        let mount = store.mount(path("app")).expect("mount");
        let count = Arc::new(Mutex::new(0));
        {
            let count = count.clone();
            mount.observe_destroy(move || *count.lock() += 1);
        }
        mount.destroy();
        mount.destroy();
        assert_eq!(*count.lock(), 1);
        // Late observers fire immediately.
        let late = Arc::new(Mutex::new(0));
        {
            let late = late.clone();
            mount.observe_destroy(move || *late.lock() += 1);
        }
        assert_eq!(*late.lock(), 1);
    }
}
