//! # Strata Store
//!
//! A sliced state-management facade over a unidirectional dispatch store.
//! Application code defines isolated, typed slices of global state together
//! with transition methods ("commands") that mutate a draft of the slice in
//! place; the draft commits atomically to the shared store only when the
//! outermost call returns successfully, and is discarded wholesale on
//! failure. Committed changes surface as lazy, de-duplicated change
//! streams, delivered one deferred turn after the commit.
//!
//! ## Flow
//!
//! ```text
//! invoke → draft → command body (nested calls share the draft)
//!        → commit → action "[owner] method" → reducer chain → root tree
//!        → mount subscription → buffered → deferred publish → select streams
//! ```
//!
//! - [`RootStore`]: the shared root tree, reducer chain and scheduler
//! - [`MountPoint`]: a named, destroyable sub-tree of the root
//! - [`Facade`]: the per-slice API object owning commands and streams
//! - [`Commands`] / [`CommandTable`] / [`CommandCx`]: transition methods
//! - [`InitialState`] / [`SeedHandle`]: literal, producer or pending seeding
//! - [`dev`]: process-wide development-mode checks
//! - [`registry`]: process-wide owner introspection

pub mod command;
pub mod dev;
pub mod draft;
pub mod engine;
pub mod facade;
pub mod mount;
pub mod registry;
pub mod root;
pub mod seed;
pub mod stream;

pub use command::{Args, CommandMeta, CommandResult, CommandTable, Commands, SliceState};
pub use dev::{configure_dev_mode, dev_options, enable_dev_mode, reset_dev_mode, DevOptions};
pub use draft::Draft;
pub use engine::CommandCx;
pub use facade::Facade;
pub use mount::{MountPoint, MountSubscription};
pub use registry::RegistryEntry;
pub use root::{MutatorEvent, Reducer, RootStore};
pub use seed::{InitialState, SeedHandle};
pub use stream::{NonNilStream, StateStream};

// Re-export the core primitives facades are built from.
pub use strata_core::{
    Action, OnceSignal, OwnerId, Scheduler, SlicePath, StateTree, StateValue, StrataError, Subject,
    SubjectSubscription,
};
