//! Commands objects, command tables and arguments
//!
//! A facade's transition methods ("commands") are registered once, at
//! construction, into a [`CommandTable`]: an insertion-ordered map from
//! method name to a wrapped closure. The commands value itself must hold
//! no own data members; the ephemeral state binding lives in the per-call
//! [`CommandCx`](crate::engine::CommandCx), and anything else a command
//! needs arrives through its arguments. That invariant is a configuration
//! error when violated and is checked by serde introspection, reporting
//! the offending field names.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use strata_core::StrataError;

use crate::engine::CommandCx;

/// Marker for slice state types: cloneable, comparable, printable, shareable.
///
/// Blanket-implemented; deriving `Clone`, `Debug` and `PartialEq` on a
/// state struct is enough.
pub trait SliceState: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {}

impl<T: Clone + fmt::Debug + PartialEq + Send + Sync + 'static> SliceState for T {}

/// A facade's set of transition methods.
///
/// Implementors are plain, member-free values (typically unit structs);
/// `register` is called once per facade construction to populate the
/// command table.
pub trait Commands: Default + Serialize + Send + Sync + Sized + 'static {
    /// The slice state the commands mutate.
    type State: SliceState;

    /// Register every transition method into the table.
    fn register(table: &mut CommandTable<Self>);
}

/// Result of a typed transition method: mutate the draft, return nothing.
pub type CommandResult = Result<(), StrataError>;

/// Positional argument pack for a command invocation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Args {
    values: Vec<serde_json::Value>,
}

impl Args {
    /// No arguments.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from already-encoded values.
    #[must_use]
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        Self { values }
    }

    /// Append one argument.
    pub fn with(mut self, value: impl Serialize) -> Result<Self, StrataError> {
        let index = self.values.len();
        let value = serde_json::to_value(value)
            .map_err(|e| StrataError::invalid_argument(index, e.to_string()))?;
        self.values.push(value);
        Ok(self)
    }

    /// The raw value at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&serde_json::Value> {
        self.values.get(index)
    }

    /// Decode the value at `index` as `T`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, index: usize) -> Result<T, StrataError> {
        let value = self
            .get(index)
            .ok_or_else(|| StrataError::invalid_argument(index, "missing argument"))?;
        serde_json::from_value(value.clone())
            .map_err(|e| StrataError::invalid_argument(index, e.to_string()))
    }

    /// All values, in position order.
    #[must_use]
    pub fn values(&self) -> &[serde_json::Value] {
        &self.values
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True iff there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Opt-in per-command metadata: argument names by position, used to label
/// action payloads for logging and recording collaborators.
#[derive(Clone, Debug, Default)]
pub struct CommandMeta {
    pub(crate) arg_names: Vec<String>,
}

impl CommandMeta {
    /// Declare argument names by position.
    #[must_use]
    pub fn args(names: &[&str]) -> Self {
        Self {
            arg_names: names.iter().map(|n| (*n).to_string()).collect(),
        }
    }
}

/// Engine-level command outcome: typed commands always produce `None`;
/// raw commands may produce a value, which the engine rejects.
pub(crate) type RawOutcome = Result<Option<serde_json::Value>, StrataError>;

type ErasedFn<C> =
    std::sync::Arc<dyn for<'a> Fn(&C, &mut CommandCx<'a, <C as Commands>::State>, &Args) -> RawOutcome + Send + Sync>;

pub(crate) struct CommandEntry<C: Commands> {
    pub(crate) meta: CommandMeta,
    pub(crate) run: ErasedFn<C>,
}

/// Insertion-ordered table mapping command names to wrapped closures.
///
/// Built once per facade at construction. Registration defects (duplicate
/// or reserved names) are collected and surfaced as configuration errors
/// when the facade is constructed.
pub struct CommandTable<C: Commands> {
    entries: IndexMap<String, CommandEntry<C>>,
    defects: Vec<StrataError>,
}

impl<C: Commands> CommandTable<C> {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            defects: Vec::new(),
        }
    }

    /// Register a typed transition method.
    pub fn command(
        &mut self,
        name: &str,
        run: impl for<'a> Fn(&C, &mut CommandCx<'a, C::State>, &Args) -> CommandResult
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        self.command_with_meta(name, CommandMeta::default(), run)
    }

    /// Register a typed transition method with argument-name metadata.
    pub fn command_with_meta(
        &mut self,
        name: &str,
        meta: CommandMeta,
        run: impl for<'a> Fn(&C, &mut CommandCx<'a, C::State>, &Args) -> CommandResult
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        let wrapped: ErasedFn<C> =
            std::sync::Arc::new(move |commands, cx, args| run(commands, cx, args).map(|()| None));
        self.insert(name, meta, wrapped)
    }

    /// Register a bridge-level method that reports an encoded result.
    ///
    /// Intended for scripting/FFI bridges only. The engine rejects any
    /// `Some` result as an `IllegalReturnType` contract violation when
    /// contract enforcement is on.
    pub fn raw_command(
        &mut self,
        name: &str,
        meta: CommandMeta,
        run: impl for<'a> Fn(&C, &mut CommandCx<'a, C::State>, &Args) -> RawOutcome
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        let wrapped: ErasedFn<C> = std::sync::Arc::new(run);
        self.insert(name, meta, wrapped)
    }

    fn insert(&mut self, name: &str, meta: CommandMeta, run: ErasedFn<C>) -> &mut Self {
        if name.starts_with('@') {
            self.defects.push(StrataError::configuration(format!(
                "command name '{name}' is reserved"
            )));
            return self;
        }
        if self.entries.contains_key(name) {
            self.defects.push(StrataError::configuration(format!(
                "duplicate command registration '{name}'"
            )));
            return self;
        }
        self.entries.insert(name.to_string(), CommandEntry { meta, run });
        self
    }

    /// Registered command names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CommandEntry<C>> {
        self.entries.get(name)
    }

    pub(crate) fn take_defects(&mut self) -> Vec<StrataError> {
        std::mem::take(&mut self.defects)
    }
}

/// Verify that a commands value carries no own data members.
///
/// Unit structs serialize to `null` and field-free structs to `{}`; both
/// pass. Any other field is reported by name, except a field literally
/// named `state`, reserved for an ephemeral state-binding slot.
pub(crate) fn check_instance_members<C: Serialize>(commands: &C) -> Result<(), StrataError> {
    let value = serde_json::to_value(commands)
        .map_err(|e| StrataError::configuration(format!("commands object not inspectable: {e}")))?;
    match value {
        serde_json::Value::Null => Ok(()),
        serde_json::Value::Object(map) => {
            let members: Vec<String> = map.keys().filter(|k| *k != "state").cloned().collect();
            if members.is_empty() {
                Ok(())
            } else {
                Err(StrataError::illegal_members(members))
            }
        }
        _ => Err(StrataError::configuration(
            "commands object must be a member-free struct",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Serialize)]
    struct NoopCommands;

    impl Commands for NoopCommands {
        type State = u32;

        fn register(table: &mut CommandTable<Self>) {
            table.command("noop", |_, _, _| Ok(()));
        }
    }

    #[test]
    fn test_args_round_trip() {
        let args = Args::none()
            .with(5_u32)
            .and_then(|a| a.with("label"))
            .expect("encodable");
        assert_eq!(args.len(), 2);
        assert_eq!(args.get_as::<u32>(0).expect("decodable"), 5);
        assert_eq!(args.get_as::<String>(1).expect("decodable"), "label");
        assert!(matches!(
            args.get_as::<u32>(2),
            Err(StrataError::InvalidArgument { index: 2, .. })
        ));
    }

    #[test]
    fn test_table_keeps_registration_order() {
        let mut table: CommandTable<NoopCommands> = CommandTable::new();
        table
            .command("b", |_, _, _| Ok(()))
            .command("a", |_, _, _| Ok(()));
        assert_eq!(table.names(), vec!["b".to_string(), "a".to_string()]);
        assert!(table.take_defects().is_empty());
    }

    #[test]
    fn test_duplicate_and_reserved_names_are_defects() {
        let mut table: CommandTable<NoopCommands> = CommandTable::new();
        table
            .command("x", |_, _, _| Ok(()))
            .command("x", |_, _, _| Ok(()))
            .command("@init", |_, _, _| Ok(()));
        let defects = table.take_defects();
        assert_eq!(defects.len(), 2);
    }

    #[test]
    fn test_member_check_accepts_unit_and_empty() {
        #[derive(Serialize)]
        struct Unit;
        #[derive(Serialize)]
        struct Empty {}
        assert!(check_instance_members(&Unit).is_ok());
        assert!(check_instance_members(&Empty {}).is_ok());
    }

    #[test]
    fn test_member_check_names_offenders() {
        #[derive(Serialize)]
        struct Bad {
            count: u32,
            label: String,
        }
        let err = check_instance_members(&Bad {
            count: 0,
            label: String::new(),
        })
        .expect_err("members must be rejected");
        match err {
            StrataError::IllegalInstanceMember { members } => {
                assert_eq!(members, vec!["count".to_string(), "label".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_member_check_tolerates_state_slot() {
        #[derive(Serialize)]
        struct WithState {
            state: Option<u32>,
        }
        assert!(check_instance_members(&WithState { state: None }).is_ok());
    }
}
