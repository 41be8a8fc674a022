//! Deferred-task scheduler
//!
//! The store layer delivers change notifications one deferred turn after the
//! synchronous commit that produced them, so that subscriber code observes a
//! stable, fully-committed state and re-entrant commits settle in order.
//! [`Scheduler`] is the queue primitive behind that deferral: tasks enqueued
//! during a synchronous dispatch phase run in FIFO order when the outermost
//! phase drains, before control returns to external code.
//!
//! Re-entrant `drain()` calls are no-ops; tasks enqueued while draining are
//! picked up by the already-running drain loop, which preserves commit
//! order.

// Allow expect on lock access - lock poisoning from panics is
// unrecoverable, so expect() is the appropriate handling pattern.
#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Task = Box<dyn FnOnce() + Send>;

struct SchedulerInner {
    queue: Mutex<VecDeque<Task>>,
    pending: AtomicUsize,
    draining: AtomicBool,
}

/// FIFO deferred-task queue shared by one root store and its facades.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue: Mutex::new(VecDeque::new()),
                pending: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue a task for the next drain.
    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        self.inner
            .queue
            .lock()
            .expect("scheduler lock poisoned")
            .push_back(Box::new(task));
    }

    /// Run queued tasks in FIFO order until the queue is empty.
    ///
    /// A drain call made while a drain is already running returns
    /// immediately; the outer loop executes any tasks the inner caller
    /// enqueued, in enqueue order.
    pub fn drain(&self) {
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let task = self
                .inner
                .queue
                .lock()
                .expect("scheduler lock poisoned")
                .pop_front();
            match task {
                Some(task) => {
                    task();
                    self.inner.pending.fetch_sub(1, Ordering::AcqRel);
                }
                None => break,
            }
        }
        self.inner.draining.store(false, Ordering::Release);
    }

    /// Number of tasks enqueued and not yet completed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_runs_tasks_in_order() {
        let scheduler = Scheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            scheduler.defer(move || seen.lock().expect("lock").push(i));
        }
        assert_eq!(scheduler.pending(), 3);
        scheduler.drain();
        assert_eq!(*seen.lock().expect("lock"), vec![0, 1, 2]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_tasks_enqueued_while_draining_run_in_same_drain() {
        let scheduler = Scheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let scheduler2 = scheduler.clone();
            let seen = seen.clone();
            scheduler.defer(move || {
                seen.lock().expect("lock").push("first");
                let seen2 = seen.clone();
                scheduler2.defer(move || seen2.lock().expect("lock").push("second"));
                // Re-entrant drain is a no-op; the outer loop picks it up.
                scheduler2.drain();
                seen.lock().expect("lock").push("after-nested-drain");
            });
        }
        scheduler.drain();
        assert_eq!(
            *seen.lock().expect("lock"),
            vec!["first", "after-nested-drain", "second"]
        );
    }

    #[test]
    fn test_pending_visible_inside_task() {
        let scheduler = Scheduler::new();
        let observed = Arc::new(AtomicUsize::new(usize::MAX));
        {
            let scheduler2 = scheduler.clone();
            let observed = observed.clone();
            scheduler.defer(move || {
                observed.store(scheduler2.pending(), Ordering::SeqCst);
            });
        }
        scheduler.drain();
        // The running task still counts as pending until it completes.
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }
}
