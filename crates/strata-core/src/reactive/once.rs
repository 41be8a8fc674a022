//! OnceSignal - one-shot destroy notification

// Allow expect on lock access - lock poisoning from panics is
// unrecoverable, so expect() is the appropriate handling pattern.
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Observer = Box<dyn FnOnce() + Send>;

struct OnceInner {
    fired: AtomicBool,
    observers: Mutex<Vec<Observer>>,
}

/// A single-fire notification with take-one observer semantics.
///
/// Observers registered before the signal fires run exactly once, on the
/// notifier's stack, in registration order. Observers registered after the
/// signal fired run immediately. Used for mount-point and facade destroy
/// notifications, including cascade destruction of child mount points.
#[derive(Clone)]
pub struct OnceSignal {
    inner: Arc<OnceInner>,
}

impl OnceSignal {
    /// Create an unfired signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(OnceInner {
                fired: AtomicBool::new(false),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Fire the signal. Idempotent; only the first call notifies.
    pub fn notify(&self) {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let observers = std::mem::take(
            &mut *self
                .inner
                .observers
                .lock()
                .expect("once signal lock poisoned"),
        );
        for observer in observers {
            observer();
        }
    }

    /// Register a one-shot observer.
    ///
    /// Runs immediately if the signal already fired.
    pub fn observe(&self, observer: impl FnOnce() + Send + 'static) {
        {
            let mut observers = self
                .inner
                .observers
                .lock()
                .expect("once signal lock poisoned");
            if !self.inner.fired.load(Ordering::Acquire) {
                observers.push(Box::new(observer));
                return;
            }
        }
        observer();
    }

    /// True once [`OnceSignal::notify`] has been called.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

impl Default for OnceSignal {
    fn default() -> Self {
        Self::new()
    }
}
