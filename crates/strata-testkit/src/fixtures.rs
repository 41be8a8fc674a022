//! Test fixtures
//!
//! A minimal counter slice plus helpers for building facades in tests.
//! Owner ids are process-unique, so parallel tests never collide in the
//! process-wide registry.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use strata_core::{OwnerId, SlicePath};
use strata_store::{
    CommandMeta, CommandTable, Commands, Facade, InitialState, MountPoint, RootStore,
};

/// Counter slice state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    /// The running count.
    pub count: i64,
}

/// Counter transition methods: `increment`, `decrement`, `add(amount)`.
#[derive(Default, Serialize)]
pub struct CounterCommands;

impl Commands for CounterCommands {
    type State = CounterState;

    fn register(table: &mut CommandTable<Self>) {
        table
            .command("increment", |_, cx, _| {
                cx.state_mut()?.count += 1;
                Ok(())
            })
            .command("decrement", |_, cx, _| {
                cx.state_mut()?.count -= 1;
                Ok(())
            })
            .command_with_meta(
                "add",
                CommandMeta::args(&["amount"]),
                |_, cx, args| {
                    let amount: i64 = args.get_as(0)?;
                    cx.state_mut()?.count += amount;
                    Ok(())
                },
            );
    }
}

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// A process-unique owner id with the given prefix.
#[must_use]
pub fn unique_owner(prefix: &str) -> OwnerId {
    let n = NEXT_OWNER.fetch_add(1, Ordering::AcqRel);
    OwnerId::new(format!("{prefix}#{n}")).expect("generated owner id is valid")
}

/// Mount `path` on `store`.
#[must_use]
pub fn mount_at(store: &RootStore, path: &str) -> MountPoint {
    store
        .mount(SlicePath::parse(path).expect("fixture path is valid"))
        .expect("fixture path is free")
}

/// A counter facade mounted at `path`, seeded with `count = 0`.
#[must_use]
pub fn counter_facade(store: &RootStore, path: &str) -> Facade<CounterCommands> {
    Facade::new(
        mount_at(store, path),
        unique_owner("counter"),
        InitialState::value(CounterState::default()),
    )
    .expect("counter facade constructs")
}
