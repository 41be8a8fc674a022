//! Facade lifecycle management
//!
//! A [`Facade`] is the per-slice API object application code interacts
//! with: it owns one commands table, one mount point and one change
//! subject. Construction registers the owner process-wide, wires the
//! ownership-gated reducer and the mount subscription, and seeds initial
//! state; destruction tears all of that down exactly once.
//!
//! Change delivery is decoupled from the commit call stack: the mount
//! subscription buffers each changed slice value and defers its
//! publication through the store's scheduler, so subscribers always
//! observe a stable, already-committed state and re-entrant commits
//! settle in commit order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use strata_core::{OnceSignal, OwnerId, StateValue, StrataError, Subject};

use crate::command::{check_instance_members, Args, CommandTable, Commands};
use crate::dev::dev_options;
use crate::engine::Inflight;
use crate::mount::{MountPoint, MountSubscription};
use crate::registry::{self, RegistryEntry};
use crate::seed::InitialState;
use crate::stream::{NonNilStream, StateStream};

/// Shared internals of one facade.
pub(crate) struct FacadeInner<C: Commands> {
    pub(crate) owner: OwnerId,
    pub(crate) mount: MountPoint,
    pub(crate) commands: C,
    pub(crate) table: CommandTable<C>,
    pub(crate) inflight: Mutex<Option<Inflight<C::State>>>,
    /// Slice value staged by a commit, consumed by the gated reducer.
    pub(crate) pending_commit: Arc<Mutex<Option<StateValue>>>,
    pub(crate) destroyed: Arc<AtomicBool>,
    pub(crate) subject: Subject<C::State>,
    /// Committed changes buffered for deferred delivery.
    pub(crate) buffered: Arc<AtomicUsize>,
    /// True while a pending initial state awaits resolution.
    pub(crate) seed_pending: Arc<AtomicBool>,
    pub(crate) destroy_signal: OnceSignal,
    pub(crate) mount_sub: Mutex<Option<MountSubscription>>,
}

impl<C: Commands> FacadeInner<C> {
    /// Tear the facade down. Idempotent.
    pub(crate) fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(owner = %self.owner, "facade destroyed");
        self.mount_sub.lock().take();
        self.mount.destroy();
        self.subject.complete();
        self.destroy_signal.notify();
        registry::deregister(&self.owner);
    }
}

/// The per-slice state facade.
///
/// Dropping the facade destroys it; [`Facade::destroy`] does the same
/// explicitly and is idempotent.
pub struct Facade<C: Commands> {
    inner: Arc<FacadeInner<C>>,
}

impl<C: Commands> std::fmt::Debug for Facade<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("owner", &self.inner.owner)
            .finish_non_exhaustive()
    }
}

impl<C: Commands> Facade<C> {
    /// Construct a facade over `mount` under the process-unique `owner` id.
    ///
    /// Registers the commands, wires the ownership-gated reducer and the
    /// change subscription, and seeds initial state. For the literal and
    /// producer variants, seeding completes before this returns; for the
    /// pending variant the facade is live immediately and
    /// [`Facade::has_buffered_state_changes`] reports the open window.
    pub fn new(
        mount: MountPoint,
        owner: OwnerId,
        initial: InitialState<C::State>,
    ) -> Result<Self, StrataError> {
        let mut table = CommandTable::new();
        C::register(&mut table);
        if let Some(defect) = table.take_defects().into_iter().next() {
            return Err(defect);
        }
        let commands = C::default();
        if dev_options().enforce_contracts {
            check_instance_members(&commands)?;
        }

        registry::register(RegistryEntry {
            owner: owner.clone(),
            path: mount.path().clone(),
            commands: table.names(),
        })?;

        match Self::wire(mount, owner.clone(), initial, commands, table) {
            Ok(facade) => Ok(facade),
            Err(e) => {
                registry::deregister(&owner);
                Err(e)
            }
        }
    }

    fn wire(
        mount: MountPoint,
        owner: OwnerId,
        initial: InitialState<C::State>,
        commands: C,
        table: CommandTable<C>,
    ) -> Result<Self, StrataError> {
        let pending_commit: Arc<Mutex<Option<StateValue>>> = Arc::new(Mutex::new(None));
        let destroyed = Arc::new(AtomicBool::new(false));
        let subject: Subject<C::State> = Subject::new();
        let buffered = Arc::new(AtomicUsize::new(0));
        let seed_pending = Arc::new(AtomicBool::new(false));

        // Ownership-gated reducer. The destroyed check lives here, in the
        // reducer itself, so commands dispatched against a destroyed
        // facade are silently ignored. Foreign actions pass through as
        // identity.
        {
            let owner = owner.clone();
            let pending = pending_commit.clone();
            let destroyed = destroyed.clone();
            let path = mount.path().clone();
            mount.add_reducer(move |tree, action| {
                if !action.is_owned_by(&owner) {
                    return tree.clone();
                }
                let staged = pending.lock().take();
                if destroyed.load(Ordering::Acquire) {
                    return tree.clone();
                }
                match staged {
                    Some(value) => tree.with_value(&path, value),
                    None => tree.clone(),
                }
            })?;
        }

        // Mount subscription: on each committed root change, buffer the
        // slice value if its identity changed, and defer publication by
        // one scheduler turn.
        let mount_sub = {
            let subject = subject.clone();
            let buffered = buffered.clone();
            let scheduler = mount.root().scheduler();
            let last_seen: Arc<Mutex<Option<StateValue>>> = Arc::new(Mutex::new(None));
            mount.subscribe(move |value| {
                let Some(value) = value else { return };
                let Some(next) = value.downcast::<C::State>() else {
                    return;
                };
                {
                    let mut last = last_seen.lock();
                    if let Some(prev) = last.as_ref() {
                        if StateValue::ptr_eq(prev, value) {
                            return;
                        }
                    }
                    *last = Some(value.clone());
                }
                buffered.fetch_add(1, Ordering::AcqRel);
                let subject = subject.clone();
                let buffered = buffered.clone();
                scheduler.defer(move || {
                    subject.publish(next);
                    buffered.fetch_sub(1, Ordering::AcqRel);
                });
            })?
        };

        let inner = Arc::new(FacadeInner {
            owner,
            mount,
            commands,
            table,
            inflight: Mutex::new(None),
            pending_commit,
            destroyed,
            subject,
            buffered,
            seed_pending,
            destroy_signal: OnceSignal::new(),
            mount_sub: Mutex::new(Some(mount_sub)),
        });

        // Destroy with the mount point, so a parent cascade reaches the
        // facade as well.
        {
            let weak = Arc::downgrade(&inner);
            inner.mount.observe_destroy(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.destroy();
                }
            });
        }

        match initial {
            InitialState::Value(state) => inner.dispatch_seed(state),
            InitialState::Producer(producer) => inner.dispatch_seed(producer()),
            InitialState::Pending(slot) => {
                // Until resolution, the facade reflects the mount point's
                // pre-existing value, if any.
                if let Some(state) = inner
                    .mount
                    .get_state()
                    .and_then(|value| value.downcast::<C::State>())
                {
                    inner.subject.publish(state);
                }
                inner.seed_pending.store(true, Ordering::Release);
                let weak = Arc::downgrade(&inner);
                slot.wire(move |state| {
                    if let Some(inner) = weak.upgrade() {
                        inner.seed_pending.store(false, Ordering::Release);
                        if !inner.destroyed.load(Ordering::Acquire) {
                            inner.dispatch_seed(state);
                        }
                    }
                });
            }
        }

        debug!(owner = %inner.owner, path = %inner.mount.path(), "facade created");
        Ok(Self { inner })
    }

    /// Invoke a registered transition method as a root call.
    pub fn invoke(&self, name: &str, args: Args) -> Result<(), StrataError> {
        self.inner.invoke_command(name, &args)
    }

    /// This facade's owner id.
    #[must_use]
    pub fn owner_id(&self) -> &OwnerId {
        &self.inner.owner
    }

    /// The mount point this facade commits through.
    #[must_use]
    pub fn mount(&self) -> &MountPoint {
        &self.inner.mount
    }

    /// The current committed slice state, if seeded.
    #[must_use]
    pub fn state(&self) -> Option<C::State> {
        self.inner.subject.latest()
    }

    /// Registered command names, in registration order.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.inner.table.names()
    }

    /// A de-duplicated stream of values selected from committed state.
    pub fn select<R>(
        &self,
        selector: impl Fn(&C::State) -> R + Send + Sync + 'static,
    ) -> StateStream<C::State, R>
    where
        R: Clone + PartialEq + Send + Sync + 'static,
    {
        StateStream::new(self.inner.subject.clone(), Arc::new(selector))
    }

    /// The whole-slice variant of [`Facade::select`].
    pub fn select_state(&self) -> StateStream<C::State, C::State> {
        StateStream::new(self.inner.subject.clone(), Arc::new(|state: &C::State| state.clone()))
    }

    /// Like [`Facade::select`], filtering out absent selections.
    pub fn select_non_nil<R>(
        &self,
        selector: impl Fn(&C::State) -> Option<R> + Send + Sync + 'static,
    ) -> NonNilStream<C::State, R>
    where
        R: Clone + PartialEq + Send + Sync + 'static,
    {
        NonNilStream::new(self.inner.subject.clone(), Arc::new(selector))
    }

    /// True once the facade has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Observe destruction (take-one semantics; immediate if already
    /// destroyed).
    pub fn observe_destroyed(&self, observer: impl FnOnce() + Send + 'static) {
        self.inner.destroy_signal.observe(observer);
    }

    /// True while committed changes or a pending initial state await
    /// deferred delivery.
    #[must_use]
    pub fn has_buffered_state_changes(&self) -> bool {
        self.inner.has_buffered()
    }

    /// Destroy the facade. Idempotent.
    ///
    /// Unsubscribes from the mount point, frees its path, completes the
    /// change streams, fires the destroy notification and deregisters the
    /// owner id. Commands dispatched afterwards are silently ignored by
    /// the gated reducer.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl<C: Commands> Drop for Facade<C> {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}
