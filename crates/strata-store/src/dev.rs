//! Development-mode configuration
//!
//! Process-wide switches for the optional runtime checks. The lifecycle is
//! explicit: call [`enable_dev_mode`] (or [`configure_dev_mode`]) before
//! constructing stores; toggling mid-run yields mixed guarantees for
//! already-constructed instances and is undefined behavior as far as this
//! crate's contract goes. [`reset_dev_mode`] exists for test isolation.
//!
//! Committed snapshots are immutable by construction (shared behind `Arc`
//! with no `&mut` access), so there is no read-only-enforcement switch;
//! `invalidate_drafts` protects against stale draft handles instead.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Independently configurable development-mode checks.
///
/// All off by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DevOptions {
    /// Enforce the commands-object contracts: no own data members, no
    /// return values from transition methods.
    pub enforce_contracts: bool,
    /// Measure wall-clock duration of each root mutation call and attach
    /// it to the commit record.
    pub measure_duration: bool,
    /// Invalidate the draft after a root commit so retained draft handles
    /// fail instead of reading stale state.
    pub invalidate_drafts: bool,
}

impl DevOptions {
    /// All checks enabled.
    #[must_use]
    pub fn all() -> Self {
        Self {
            enforce_contracts: true,
            measure_duration: true,
            invalidate_drafts: true,
        }
    }
}

static DEV_OPTIONS: Lazy<RwLock<DevOptions>> = Lazy::new(|| RwLock::new(DevOptions::default()));

/// Enable every development-mode check.
///
/// Call before constructing stores for consistent behavior.
pub fn enable_dev_mode() {
    *DEV_OPTIONS.write() = DevOptions::all();
}

/// Set the development-mode checks individually.
pub fn configure_dev_mode(options: DevOptions) {
    *DEV_OPTIONS.write() = options;
}

/// Current development-mode configuration.
#[must_use]
pub fn dev_options() -> DevOptions {
    *DEV_OPTIONS.read()
}

/// Reset to the default (all checks off).
///
/// Test hook: pair with `serial_test` when tests touch this global.
pub fn reset_dev_mode() {
    *DEV_OPTIONS.write() = DevOptions::default();
}
