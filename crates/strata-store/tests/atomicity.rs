//! Atomic commit-or-discard semantics: failing calls leave no partial
//! state, nested calls merge into exactly one commit.

use proptest::prelude::*;
use serde::Serialize;

use strata_store::{
    Args, CommandTable, Commands, Facade, InitialState, RootStore, StrataError,
};
use strata_testkit::{mount_at, unique_owner, CommitRecorder, CounterState};

/// Counter commands with a write-then-fail method and nested variants.
#[derive(Default, Serialize)]
struct TrickyCommands;

impl Commands for TrickyCommands {
    type State = CounterState;

    fn register(table: &mut CommandTable<Self>) {
        table
            .command("increment", |_, cx, _| {
                cx.state_mut()?.count += 1;
                Ok(())
            })
            .command("set_then_fail", |_, cx, _| {
                cx.state_mut()?.count = 1;
                let count = cx.state()?.count;
                if count > 0 {
                    return Err(cx.abort("count must stay zero"));
                }
                Ok(())
            })
            .command("increment_twice", |_, cx, _| {
                cx.invoke("increment", Args::none())?;
                cx.invoke("increment", Args::none())?;
                Ok(())
            })
            .command("increment_then_fail", |_, cx, _| {
                cx.invoke("increment", Args::none())?;
                Err(cx.abort("late failure discards the nested write too"))
            })
            .command("swallow_nested_failure", |_, cx, _| {
                cx.invoke("increment", Args::none())?;
                // A nested failure that the caller handles does not abort
                // the enclosing root call.
                let _ignored = cx.invoke("set_then_fail", Args::none());
                cx.state_mut()?.count += 10;
                Ok(())
            });
    }
}

fn tricky_facade(store: &RootStore) -> Facade<TrickyCommands> {
    Facade::new(
        mount_at(store, "tricky"),
        unique_owner("tricky"),
        InitialState::value(CounterState::default()),
    )
    .expect("facade constructs")
}

#[test]
fn failed_call_leaves_state_untouched() {
    let store = RootStore::new();
    let recorder = CommitRecorder::attach(&store);
    let facade = tricky_facade(&store);

    let err = facade
        .invoke("set_then_fail", Args::none())
        .expect_err("the command aborts");
    assert!(matches!(err, StrataError::CommandAborted { .. }));
    assert_eq!(facade.state(), Some(CounterState { count: 0 }));
    // No commit record for a discarded mutation.
    assert!(recorder.is_empty());
}

#[test]
fn nested_calls_merge_into_one_commit() {
    let store = RootStore::new();
    let recorder = CommitRecorder::attach(&store);
    let facade = tricky_facade(&store);
    let owner = facade.owner_id().clone();

    facade
        .invoke("increment_twice", Args::none())
        .expect("nested calls succeed");
    assert_eq!(facade.state(), Some(CounterState { count: 2 }));
    // Exactly one commit record, for the outermost call.
    assert_eq!(
        recorder.action_types(),
        vec![format!("[{owner}] increment_twice")]
    );
}

#[test]
fn root_failure_discards_nested_writes() {
    let store = RootStore::new();
    let recorder = CommitRecorder::attach(&store);
    let facade = tricky_facade(&store);

    facade
        .invoke("increment_then_fail", Args::none())
        .expect_err("the root call fails");
    assert_eq!(facade.state(), Some(CounterState { count: 0 }));
    assert!(recorder.is_empty());
}

#[test]
fn handled_nested_failure_still_commits_the_root() {
    let store = RootStore::new();
    let facade = tricky_facade(&store);

    facade
        .invoke("swallow_nested_failure", Args::none())
        .expect("root call succeeds");
    // increment (+1), handled failing nested write to the shared draft
    // (count = 1), then +10: the draft commits as a unit.
    assert_eq!(facade.state(), Some(CounterState { count: 11 }));
}

#[derive(Clone, Debug)]
enum Op {
    Increment,
    Decrement,
    Add(i64),
    Fail,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Increment),
        Just(Op::Decrement),
        (-100_i64..100).prop_map(Op::Add),
        Just(Op::Fail),
    ]
}

#[derive(Default, Serialize)]
struct PropCommands;

impl Commands for PropCommands {
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
            .command("add", |_, cx, args| {
                let amount: i64 = args.get_as(0)?;
                cx.state_mut()?.count += amount;
                Ok(())
            })
            .command("scramble_then_fail", |_, cx, _| {
                cx.state_mut()?.count = i64::MIN;
                Err(cx.abort("injected failure"))
            });
    }
}

proptest! {
    /// For any op sequence with injected failures, committed state always
    /// equals the model that ignores failing calls.
    #[test]
    fn committed_state_matches_model(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let store = RootStore::new();
        let facade: Facade<PropCommands> = Facade::new(
            mount_at(&store, "prop"),
            unique_owner("prop"),
            InitialState::value(CounterState::default()),
        ).expect("facade constructs");

        let mut model = 0_i64;
        for op in ops {
            match op {
                Op::Increment => {
                    facade.invoke("increment", Args::none()).expect("increment");
                    model += 1;
                }
                Op::Decrement => {
                    facade.invoke("decrement", Args::none()).expect("decrement");
                    model -= 1;
                }
                Op::Add(amount) => {
                    let args = Args::none().with(amount).expect("encodable");
                    facade.invoke("add", args).expect("add");
                    model += amount;
                }
                Op::Fail => {
                    facade
                        .invoke("scramble_then_fail", Args::none())
                        .expect_err("injected failure propagates");
                }
            }
            prop_assert_eq!(facade.state(), Some(CounterState { count: model }));
        }
    }
}
