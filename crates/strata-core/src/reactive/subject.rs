//! Subject<T> - hot multicast subject with replay-latest semantics

// Allow expect on lock access - lock poisoning from panics is
// unrecoverable, so expect() is the appropriate handling pattern.
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SubscriberEntry<T> {
    id: u64,
    callback: Callback<T>,
}

struct SubjectInner<T> {
    /// Latest published value, replayed to new subscribers.
    current: RwLock<Option<T>>,
    /// Version counter incremented on each publish.
    version: AtomicU64,
    subscribers: Mutex<Vec<SubscriberEntry<T>>>,
    completed: AtomicBool,
    next_id: AtomicU64,
}

/// A hot, multicast, replay-latest subject.
///
/// - `publish()`: store the value and notify subscribers in registration
///   order, on the publisher's stack.
/// - `subscribe()`: register a callback; the latest value (if any) is
///   replayed to it synchronously.
/// - `complete()`: terminate exactly once; subscribers are dropped and
///   later publishes are ignored.
///
/// # Thread Safety
///
/// `Subject<T>` is `Send + Sync`. Callbacks are invoked outside the
/// subscriber lock, so a callback may itself subscribe or publish.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Create a subject with no value yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                current: RwLock::new(None),
                version: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                completed: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a subject seeded with an initial value.
    ///
    /// The seed is replayed to subscribers like any published value.
    #[must_use]
    pub fn seeded(value: T) -> Self {
        let subject = Self::new();
        *subject
            .inner
            .current
            .write()
            .expect("subject lock poisoned") = Some(value);
        subject
    }

    /// Publish a value: store it and notify every subscriber.
    ///
    /// Publishing on a completed subject is ignored.
    pub fn publish(&self, value: T) {
        if self.inner.completed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut current = self
                .inner
                .current
                .write()
                .expect("subject lock poisoned");
            *current = Some(value.clone());
        }
        self.inner.version.fetch_add(1, Ordering::AcqRel);

        // Snapshot the callbacks so subscribers can unsubscribe or
        // subscribe from inside a notification.
        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .lock()
            .expect("subject lock poisoned")
            .iter()
            .map(|entry| entry.callback.clone())
            .collect();
        for callback in callbacks {
            callback(&value);
        }
    }

    /// The latest published (or seeded) value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        self.inner
            .current
            .read()
            .expect("subject lock poisoned")
            .clone()
    }

    /// Number of publishes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Register a callback and synchronously replay the latest value to it.
    ///
    /// Returns an RAII guard; dropping the guard removes the callback.
    /// Subscribing to a completed subject returns an inert guard and
    /// replays nothing.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubjectSubscription<T> {
        if self.inner.completed.load(Ordering::Acquire) {
            return SubjectSubscription {
                subject: Weak::new(),
                id: 0,
            };
        }
        let callback: Callback<T> = Arc::new(callback);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        self.inner
            .subscribers
            .lock()
            .expect("subject lock poisoned")
            .push(SubscriberEntry {
                id,
                callback: callback.clone(),
            });
        if let Some(value) = self.latest() {
            callback(&value);
        }
        SubjectSubscription {
            subject: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Terminate the subject. Idempotent.
    ///
    /// Subscribers are dropped and later publishes are ignored; the latest
    /// value remains readable via [`Subject::latest`].
    pub fn complete(&self) {
        if self.inner.completed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner
            .subscribers
            .lock()
            .expect("subject lock poisoned")
            .clear();
    }

    /// True once [`Subject::complete`] has been called.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Current number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("subject lock poisoned")
            .len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII subscription guard; dropping it unsubscribes.
pub struct SubjectSubscription<T> {
    subject: Weak<SubjectInner<T>>,
    id: u64,
}

impl<T> Drop for SubjectSubscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.subject.upgrade() {
            if let Ok(mut subscribers) = inner.subscribers.lock() {
                subscribers.retain(|entry| entry.id != self.id);
            }
        }
    }
}
