//! Mutation commit engine
//!
//! Every registered transition method runs through [`FacadeInner::invoke_command`]:
//! the root call of a tree opens a [`Draft`] over the committed sub-state,
//! nested calls join the same draft, and the draft is committed atomically
//! when the outermost call returns successfully - or discarded wholesale
//! when it fails. Re-entrancy is tracked with an explicit in-flight slot
//! and depth counter; no lock is held across user code.

use std::sync::atomic::Ordering;
use std::time::Instant;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex};
use tracing::debug;
use uuid::Uuid;

use strata_core::{Action, StateValue, StrataError};

use crate::command::{check_instance_members, Args, CommandMeta, Commands, SliceState};
use crate::dev::dev_options;
use crate::draft::Draft;
use crate::facade::FacadeInner;
use crate::root::MutatorEvent;

/// The draft shared by one root transition-call tree, plus the re-entrancy
/// depth of calls currently on the stack.
pub(crate) struct Inflight<S: SliceState> {
    pub(crate) draft: Draft<S>,
    pub(crate) depth: usize,
}

/// Dispatch target for nested command calls made from inside a command body.
pub(crate) trait NestedInvoke<S: SliceState>: Send + Sync {
    fn invoke_nested(&self, name: &str, args: &Args) -> Result<(), StrataError>;
}

/// The per-call command context: the transition method's window onto the
/// in-flight draft, plus nested invocation.
///
/// The borrow rules make the deadlock impossible by construction: a state
/// guard borrows the context, and [`CommandCx::invoke`] needs the context
/// mutably, so a guard cannot be held across a nested call.
pub struct CommandCx<'a, S: SliceState> {
    draft: Draft<S>,
    nested: &'a dyn NestedInvoke<S>,
    command: String,
}

impl<'a, S: SliceState> CommandCx<'a, S> {
    /// Read access to the draft state.
    pub fn state(&self) -> Result<MappedRwLockReadGuard<'_, S>, StrataError> {
        self.draft.read()
    }

    /// Write access to the draft state.
    pub fn state_mut(&self) -> Result<MappedRwLockWriteGuard<'_, S>, StrataError> {
        self.draft.write()
    }

    /// Invoke another of this facade's commands against the same draft.
    ///
    /// The nested call never commits or discards on its own; its writes
    /// land in the shared draft, which the enclosing root call commits or
    /// discards as a unit.
    pub fn invoke(&mut self, name: &str, args: Args) -> Result<(), StrataError> {
        self.nested.invoke_nested(name, &args)
    }

    /// Name of the command currently executing.
    #[must_use]
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Build an abort error carrying this command's name.
    ///
    /// Returning it discards the entire root call's draft.
    #[must_use]
    pub fn abort(&self, message: impl Into<String>) -> StrataError {
        StrataError::aborted(self.command.as_str(), message)
    }
}

/// Guaranteed cleanup for the in-flight slot: depth is decremented - and
/// the slot cleared at depth zero - no matter how the call unwinds.
struct DepthGuard<'a, S: SliceState> {
    inflight: &'a Mutex<Option<Inflight<S>>>,
}

impl<'a, S: SliceState> Drop for DepthGuard<'a, S> {
    fn drop(&mut self) {
        let mut slot = self.inflight.lock();
        if let Some(inflight) = slot.as_mut() {
            inflight.depth -= 1;
            if inflight.depth == 0 {
                *slot = None;
            }
        }
    }
}

impl<C: Commands> NestedInvoke<C::State> for FacadeInner<C> {
    fn invoke_nested(&self, name: &str, args: &Args) -> Result<(), StrataError> {
        self.invoke_command(name, args)
    }
}

impl<C: Commands> FacadeInner<C> {
    /// The committed slice state this facade currently addresses.
    ///
    /// Falls back to the last published state when the mount path is empty
    /// or holds a foreign type; errors if the facade was never seeded.
    pub(crate) fn current_slice(&self) -> Result<C::State, StrataError> {
        if let Some(value) = self.mount.get_state() {
            if let Some(state) = value.downcast::<C::State>() {
                return Ok(state);
            }
        }
        if let Some(state) = self.subject.latest() {
            return Ok(state);
        }
        Err(StrataError::illegal_state_access(format!(
            "facade {} has no seeded state yet",
            self.owner
        )))
    }

    /// Run one transition method: root calls open the draft and commit or
    /// discard; nested calls contribute writes to the shared draft.
    pub(crate) fn invoke_command(&self, name: &str, args: &Args) -> Result<(), StrataError> {
        let entry = self
            .table
            .get(name)
            .ok_or_else(|| StrataError::unknown_command(self.owner.as_str(), name))?;

        let (draft, is_root) = {
            let mut slot = self.inflight.lock();
            match slot.as_mut() {
                Some(inflight) => {
                    inflight.depth += 1;
                    (inflight.draft.clone(), false)
                }
                None => {
                    let draft = Draft::new(self.current_slice()?);
                    *slot = Some(Inflight {
                        draft: draft.clone(),
                        depth: 1,
                    });
                    (draft, true)
                }
            }
        };

        let options = dev_options();
        let started = (is_root && options.measure_duration).then(Instant::now);

        let outcome = {
            let _guard = DepthGuard {
                inflight: &self.inflight,
            };
            let mut cx = CommandCx {
                draft: draft.clone(),
                nested: self,
                command: name.to_string(),
            };
            (entry.run)(&self.commands, &mut cx, args)
        };

        let result = match outcome {
            Ok(Some(_)) if options.enforce_contracts => Err(StrataError::illegal_return(name)),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };

        if !is_root {
            return result;
        }

        let result = result.and_then(|()| {
            if options.enforce_contracts {
                check_instance_members(&self.commands)?;
            }
            Ok(())
        });

        match result {
            Ok(()) => self.commit_root(name, &entry.meta, args, &draft, started),
            Err(e) => {
                // Discard: the draft is dropped unmerged; the committed
                // state stays exposed unchanged.
                if options.invalidate_drafts {
                    draft.invalidate();
                }
                Err(e)
            }
        }
    }

    /// Commit the root call tree: capture the draft, stage the new slice
    /// value for the gated reducer, dispatch, and publish the commit record.
    fn commit_root(
        &self,
        name: &str,
        meta: &CommandMeta,
        args: &Args,
        draft: &Draft<C::State>,
        started: Option<Instant>,
    ) -> Result<(), StrataError> {
        let final_state = draft.capture()?;
        if dev_options().invalidate_drafts {
            draft.invalidate();
        }
        let duration = started.map(|t| t.elapsed());
        let action = Action::new(
            &self.owner,
            name,
            args.values().to_vec(),
            meta.arg_names.clone(),
        );
        let value = StateValue::new(final_state);
        *self.pending_commit.lock() = Some(value.clone());
        debug!(owner = %self.owner, command = name, "commit");
        let action = self.mount.root().dispatch(action);
        self.mount.root().events().publish(MutatorEvent {
            id: Uuid::new_v4(),
            action,
            state: value,
            duration,
        });
        Ok(())
    }

    /// Stage and dispatch the initial-state seeding action.
    pub(crate) fn dispatch_seed(&self, state: C::State) {
        *self.pending_commit.lock() = Some(StateValue::new(state));
        self.mount.root().dispatch(Action::seed(&self.owner));
    }

    pub(crate) fn has_buffered(&self) -> bool {
        self.seed_pending.load(Ordering::Acquire) || self.buffered.load(Ordering::Acquire) > 0
    }
}
