//! Copy-on-write state drafts
//!
//! A [`Draft`] is the temporary, exclusively-owned working copy of a
//! slice's state visible to one root transition-call tree. The root call
//! opens the draft as a clone of the committed sub-state; nested calls
//! share it; the root call either captures its final value for commit or
//! drops it wholesale on failure. A discarded draft is never merged.
//!
//! In development mode the engine invalidates the draft after a root
//! commit so that retained handles fail with `IllegalStateAccess` instead
//! of silently reading stale state.

use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strata_core::StrataError;

use crate::command::SliceState;

enum DraftState<S> {
    Open(S),
    Invalidated,
}

struct DraftInner<S> {
    state: RwLock<DraftState<S>>,
}

/// The working copy of a slice's state during one root transition call.
///
/// Cheap to clone; all clones address the same draft.
pub struct Draft<S> {
    inner: Arc<DraftInner<S>>,
}

impl<S> Clone for Draft<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: SliceState> Draft<S> {
    /// Open a draft over a clone of the committed state.
    pub(crate) fn new(state: S) -> Self {
        Self {
            inner: Arc::new(DraftInner {
                state: RwLock::new(DraftState::Open(state)),
            }),
        }
    }

    /// Read access to the draft state.
    pub fn read(&self) -> Result<MappedRwLockReadGuard<'_, S>, StrataError> {
        RwLockReadGuard::try_map(self.inner.state.read(), |draft| match draft {
            DraftState::Open(state) => Some(state),
            DraftState::Invalidated => None,
        })
        .map_err(|_| {
            StrataError::illegal_state_access(
                "draft was invalidated after its commit; state is only accessible during an active mutation call",
            )
        })
    }

    /// Write access to the draft state.
    pub fn write(&self) -> Result<MappedRwLockWriteGuard<'_, S>, StrataError> {
        RwLockWriteGuard::try_map(self.inner.state.write(), |draft| match draft {
            DraftState::Open(state) => Some(state),
            DraftState::Invalidated => None,
        })
        .map_err(|_| {
            StrataError::illegal_state_access(
                "draft was invalidated after its commit; state is only accessible during an active mutation call",
            )
        })
    }

    /// Capture the draft's current value for commit.
    pub(crate) fn capture(&self) -> Result<S, StrataError> {
        self.read().map(|state| state.clone())
    }

    /// Invalidate the draft; subsequent access fails.
    pub(crate) fn invalidate(&self) {
        *self.inner.state.write() = DraftState::Invalidated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_read_write() {
        let draft = Draft::new(1_u32);
        *draft.write().expect("writable") = 5;
        assert_eq!(*draft.read().expect("readable"), 5);
        assert_eq!(draft.capture().expect("capturable"), 5);
    }

    #[test]
    fn test_clones_share_the_draft() {
        let draft = Draft::new(0_u32);
        let alias = draft.clone();
        *draft.write().expect("writable") += 1;
        assert_eq!(*alias.read().expect("readable"), 1);
    }

    #[test]
    fn test_invalidated_draft_errors() {
        let draft = Draft::new(0_u32);
        draft.invalidate();
        assert!(matches!(
            draft.read().map(|guard| *guard),
            Err(StrataError::IllegalStateAccess { .. })
        ));
        assert!(matches!(
            draft.write().map(|mut guard| *guard = 1),
            Err(StrataError::IllegalStateAccess { .. })
        ));
    }
}
