//! # Strata Testkit
//!
//! Shared fixtures and recording utilities for testing Strata stores:
//!
//! - [`fixtures`]: a counter slice, unique owner ids, facade builders
//! - [`recorder`]: [`CommitRecorder`] over a store's commit-record stream

pub mod fixtures;
pub mod recorder;

pub use fixtures::{counter_facade, mount_at, unique_owner, CounterCommands, CounterState};
pub use recorder::CommitRecorder;
