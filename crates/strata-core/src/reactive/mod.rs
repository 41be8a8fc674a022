//! # Reactive Primitives for Change Notification
//!
//! This module provides the notification primitives behind the facade's
//! change streams and destroy lifecycle:
//!
//! - [`Subject<T>`]: a hot, multicast, replay-latest-value subject. New
//!   subscribers synchronously receive the latest published value; later
//!   values are pushed to all subscribers in registration order.
//!
//! - [`SubjectSubscription`]: RAII guard returned by `Subject::subscribe`;
//!   dropping it removes the callback before the next notification cycle.
//!
//! - [`OnceSignal`]: a one-shot notification observed with take-one
//!   semantics. Backs destroy notifications and cascade destruction.
//!
//! # Design Principles
//!
//! 1. **Runtime-agnostic**: only std primitives (Mutex, RwLock, atomics).
//!    Works with any async runtime or in sync-only code.
//!
//! 2. **Synchronous fan-out**: publishing calls subscribers on the
//!    publisher's stack. Deferral relative to commits is layered above,
//!    via the scheduler - not baked into the subject.

mod once;
mod subject;

pub use once::OnceSignal;
pub use subject::{Subject, SubjectSubscription};
