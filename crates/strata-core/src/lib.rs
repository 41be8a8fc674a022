//! # Strata Core
//!
//! Foundational, runtime-agnostic primitives for the Strata state-management
//! facade:
//!
//! - [`StrataError`]: the unified error type
//! - [`OwnerId`] / [`SlicePath`]: facade and mount-point addressing
//! - [`StateValue`] / [`StateTree`]: type-erased slice values in a
//!   persistent, structurally-shared root tree
//! - [`Action`] and the action-name router: `"[owner] method"` action types
//!   with exact-prefix ownership gating
//! - [`Scheduler`]: the deferred-task queue behind change delivery
//! - [`reactive`]: replay-latest subjects and one-shot destroy signals
//!
//! Everything here uses std sync primitives only, so the store layer can be
//! driven from any runtime or from sync-only code.

pub mod action;
pub mod errors;
pub mod ids;
pub mod path;
pub mod reactive;
pub mod schedule;
pub mod value;

pub use action::{action_type, owns_action, Action, SEED_COMMAND};
pub use errors::StrataError;
pub use ids::OwnerId;
pub use path::SlicePath;
pub use reactive::{OnceSignal, Subject, SubjectSubscription};
pub use schedule::Scheduler;
pub use value::{StateTree, StateValue};
