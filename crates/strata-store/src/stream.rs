//! Selected change streams
//!
//! [`StateStream`] and [`NonNilStream`] are the consumer-facing views of a
//! facade's hot, replay-latest change subject. Streams are lazy: nothing
//! runs until a subscription is made. Each subscription replays the
//! current selection synchronously, then emits only when the selected
//! value actually changes (`PartialEq`; element-wise for `Vec`s, which
//! subsumes shallow array comparison). Emissions for committed changes
//! arrive one deferred turn after the commit, in commit order; the stream
//! goes silent once the owning facade is destroyed.

use std::sync::Arc;

use parking_lot::Mutex;

use strata_core::{Subject, SubjectSubscription};

use crate::command::SliceState;

/// A de-duplicated stream of values selected from committed state.
pub struct StateStream<S: SliceState, R> {
    subject: Subject<S>,
    selector: Arc<dyn Fn(&S) -> R + Send + Sync>,
}

impl<S: SliceState, R> Clone for StateStream<S, R> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            selector: self.selector.clone(),
        }
    }
}

impl<S: SliceState, R: Clone + PartialEq + Send + Sync + 'static> StateStream<S, R> {
    pub(crate) fn new(subject: Subject<S>, selector: Arc<dyn Fn(&S) -> R + Send + Sync>) -> Self {
        Self { subject, selector }
    }

    /// Subscribe to selected values.
    ///
    /// The current selection (if the facade has state) is replayed
    /// synchronously; afterwards the callback fires once per change of the
    /// selected value. Returns an RAII guard; dropping it unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&R) + Send + Sync + 'static) -> SubjectSubscription<S> {
        let selector = self.selector.clone();
        let last: Arc<Mutex<Option<R>>> = Arc::new(Mutex::new(None));
        self.subject.subscribe(move |state| {
            let selected = selector(state);
            {
                let mut last = last.lock();
                if last.as_ref() == Some(&selected) {
                    return;
                }
                *last = Some(selected.clone());
            }
            callback(&selected);
        })
    }

    /// The current selection, if the facade has state.
    #[must_use]
    pub fn latest(&self) -> Option<R> {
        self.subject.latest().map(|state| (self.selector)(&state))
    }
}

/// Like [`StateStream`], but the selector may decline (`None`) and those
/// gaps are filtered out of the stream.
pub struct NonNilStream<S: SliceState, R> {
    subject: Subject<S>,
    selector: Arc<dyn Fn(&S) -> Option<R> + Send + Sync>,
}

impl<S: SliceState, R> Clone for NonNilStream<S, R> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            selector: self.selector.clone(),
        }
    }
}

impl<S: SliceState, R: Clone + PartialEq + Send + Sync + 'static> NonNilStream<S, R> {
    pub(crate) fn new(
        subject: Subject<S>,
        selector: Arc<dyn Fn(&S) -> Option<R> + Send + Sync>,
    ) -> Self {
        Self { subject, selector }
    }

    /// Subscribe to present selected values; `None` selections emit nothing.
    pub fn subscribe(&self, callback: impl Fn(&R) + Send + Sync + 'static) -> SubjectSubscription<S> {
        let selector = self.selector.clone();
        let last: Arc<Mutex<Option<R>>> = Arc::new(Mutex::new(None));
        self.subject.subscribe(move |state| {
            let Some(selected) = selector(state) else {
                return;
            };
            {
                let mut last = last.lock();
                if last.as_ref() == Some(&selected) {
                    return;
                }
                *last = Some(selected.clone());
            }
            callback(&selected);
        })
    }

    /// The current selection, if the facade has state and the selector
    /// yields a value for it.
    #[must_use]
    pub fn latest(&self) -> Option<R> {
        self.subject
            .latest()
            .and_then(|state| (self.selector)(&state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        count: u32,
        label: Option<String>,
    }

    fn collector<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    #[test]
    fn test_select_dedups_unchanged_values() {
        let subject = Subject::seeded(TestState {
            count: 0,
            label: None,
        });
        let stream = StateStream::new(subject.clone(), Arc::new(|s: &TestState| s.count));
        let (seen, callback) = collector();
        let _sub = stream.subscribe(callback);
        // Replayed initial selection.
        assert_eq!(*seen.lock(), vec![0]);
        // A commit that leaves the selection unchanged emits nothing.
        subject.publish(TestState {
            count: 0,
            label: Some("x".to_string()),
        });
        assert_eq!(*seen.lock(), vec![0]);
        subject.publish(TestState {
            count: 1,
            label: Some("x".to_string()),
        });
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn test_vec_selections_compare_element_wise() {
        let subject = Subject::seeded(vec![1, 2, 3]);
        let stream = StateStream::new(subject.clone(), Arc::new(|s: &Vec<i32>| s.clone()));
        let (seen, callback) = collector();
        let _sub = stream.subscribe(callback);
        // A freshly allocated but element-equal vector is deduplicated.
        subject.publish(vec![1, 2, 3]);
        assert_eq!(seen.lock().len(), 1);
        subject.publish(vec![1, 2]);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_non_nil_filters_missing_selections() {
        let subject = Subject::seeded(TestState {
            count: 0,
            label: None,
        });
        let stream = NonNilStream::new(
            subject.clone(),
            Arc::new(|s: &TestState| s.label.clone()),
        );
        let (seen, callback) = collector();
        let _sub = stream.subscribe(callback);
        assert!(seen.lock().is_empty());
        assert_eq!(stream.latest(), None);
        subject.publish(TestState {
            count: 1,
            label: Some("ready".to_string()),
        });
        assert_eq!(*seen.lock(), vec!["ready".to_string()]);
        // Dropping back to None emits nothing and keeps the last value out.
        subject.publish(TestState {
            count: 2,
            label: None,
        });
        assert_eq!(seen.lock().len(), 1);
    }
}
