//! Initial-state seeding
//!
//! A facade's initial state can be a literal, a producer invoked once at
//! construction, or a pending value resolved later through a one-shot
//! [`SeedHandle`]. In the pending case the facade is usable immediately -
//! its state reflects the mount point's pre-existing value, if any - and
//! the seeding dispatch happens at resolution. The pending window is
//! observable via `Facade::has_buffered_state_changes`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::SliceState;

/// How a facade's initial state is produced.
pub enum InitialState<S: SliceState> {
    /// A literal value, dispatched synchronously at construction.
    Value(S),
    /// A producer invoked once, synchronously, at construction.
    Producer(Box<dyn FnOnce() -> S + Send>),
    /// A pending value resolved later via the paired [`SeedHandle`].
    Pending(Arc<SeedSlot<S>>),
}

impl<S: SliceState> InitialState<S> {
    /// Seed with a literal value.
    #[must_use]
    pub fn value(state: S) -> Self {
        Self::Value(state)
    }

    /// Seed with a producer invoked once at construction.
    #[must_use]
    pub fn with(producer: impl FnOnce() -> S + Send + 'static) -> Self {
        Self::Producer(Box::new(producer))
    }

    /// Seed later: returns the pending initial state plus the one-shot
    /// handle that resolves it.
    #[must_use]
    pub fn pending() -> (Self, SeedHandle<S>) {
        let slot = Arc::new(SeedSlot::new());
        (Self::Pending(slot.clone()), SeedHandle { slot })
    }
}

enum SeedCell<S> {
    /// Neither resolved nor wired to a facade yet.
    Unresolved,
    /// Resolved before a facade was wired; the value waits here.
    Resolved(S),
    /// Wired to a facade; resolution delivers through the callback.
    Wired(Box<dyn FnOnce(S) + Send>),
    /// Delivered (or abandoned); further activity is a no-op.
    Done,
}

/// Shared slot connecting a [`SeedHandle`] to the facade it seeds.
pub struct SeedSlot<S> {
    cell: Mutex<SeedCell<S>>,
}

impl<S: SliceState> SeedSlot<S> {
    fn new() -> Self {
        Self {
            cell: Mutex::new(SeedCell::Unresolved),
        }
    }

    /// Wire the facade-side delivery callback. If the handle already
    /// resolved, delivery happens immediately on this stack.
    pub(crate) fn wire(&self, deliver: impl FnOnce(S) + Send + 'static) {
        let immediate = {
            let mut cell = self.cell.lock();
            match std::mem::replace(&mut *cell, SeedCell::Done) {
                SeedCell::Unresolved => {
                    *cell = SeedCell::Wired(Box::new(deliver));
                    None
                }
                SeedCell::Resolved(state) => Some((Box::new(deliver) as Box<dyn FnOnce(S) + Send>, state)),
                other => {
                    *cell = other;
                    None
                }
            }
        };
        if let Some((deliver, state)) = immediate {
            deliver(state);
        }
    }

    fn resolve(&self, state: S) {
        let deliver = {
            let mut cell = self.cell.lock();
            match std::mem::replace(&mut *cell, SeedCell::Done) {
                SeedCell::Unresolved => {
                    *cell = SeedCell::Resolved(state);
                    None
                }
                SeedCell::Wired(deliver) => Some((deliver, state)),
                _ => None,
            }
        };
        if let Some((deliver, state)) = deliver {
            deliver(state);
        }
    }
}

/// One-shot resolver for a pending initial state.
///
/// Consumed by [`SeedHandle::resolve`]; resolving after the facade was
/// destroyed is a no-op.
pub struct SeedHandle<S: SliceState> {
    slot: Arc<SeedSlot<S>>,
}

impl<S: SliceState> SeedHandle<S> {
    /// Deliver the initial state.
    pub fn resolve(self, state: S) {
        self.slot.resolve(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_after_wire_delivers() {
        let (initial, handle) = InitialState::<u32>::pending();
        let InitialState::Pending(slot) = initial else {
            panic!("expected pending");
        };
        let delivered = Arc::new(Mutex::new(None));
        {
            let delivered = delivered.clone();
            slot.wire(move |state| *delivered.lock() = Some(state));
        }
        handle.resolve(5);
        assert_eq!(*delivered.lock(), Some(5));
    }

    #[test]
    fn test_resolve_before_wire_delivers_at_wire() {
        let (initial, handle) = InitialState::<u32>::pending();
        let InitialState::Pending(slot) = initial else {
            panic!("expected pending");
        };
        handle.resolve(7);
        let delivered = Arc::new(Mutex::new(None));
        {
            let delivered = delivered.clone();
            slot.wire(move |state| *delivered.lock() = Some(state));
        }
        assert_eq!(*delivered.lock(), Some(7));
    }

    #[test]
    fn test_delivery_happens_once() {
        let (initial, handle) = InitialState::<u32>::pending();
        let InitialState::Pending(slot) = initial else {
            panic!("expected pending");
        };
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            slot.wire(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        handle.resolve(1);
        // A second wire after delivery is inert.
        slot.wire(|_| panic!("must not deliver twice"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
