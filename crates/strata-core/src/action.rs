//! Actions and the action-name router
//!
//! Every committed mutation is dispatched into the shared reducer chain as
//! an [`Action`]. The action type string is derived from the owner id and
//! the transition-method name (`"[owner] method"`), and a string-prefix test
//! decides whether a dispatched action belongs to a given owner's reducer.
//! That prefix gate is what lets one reducer chain host arbitrarily many
//! facades without cross-talk.

use serde::{Deserialize, Serialize};

use crate::ids::OwnerId;

/// Reserved method name used for the initial-state seeding action.
pub const SEED_COMMAND: &str = "@init";

/// Derive the globally-unique action type for an owner's method.
#[must_use]
pub fn action_type(owner: &OwnerId, method: &str) -> String {
    format!("[{owner}] {method}")
}

/// True iff `action_type` starts with the exact prefix `"[owner] "`.
#[must_use]
pub fn owns_action(owner: &OwnerId, action_type: &str) -> bool {
    action_type
        .strip_prefix('[')
        .and_then(|rest| rest.strip_prefix(owner.as_str()))
        .and_then(|rest| rest.strip_prefix("] "))
        .is_some()
}

/// A dispatched action: the unique type string plus the positional payload
/// the transition method was invoked with.
///
/// The type string is never mutated after creation. The payload exists for
/// logging and recording collaborators; reducers key on the type alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    action_type: String,
    payload: Vec<serde_json::Value>,
    labels: Vec<String>,
}

impl Action {
    /// Build an action for `owner`'s `method` with the given payload.
    ///
    /// `labels` are the opt-in argument names declared with the command;
    /// they may be shorter than the payload.
    #[must_use]
    pub fn new(
        owner: &OwnerId,
        method: &str,
        payload: Vec<serde_json::Value>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            action_type: action_type(owner, method),
            payload,
            labels,
        }
    }

    /// Build the seeding action for an owner.
    #[must_use]
    pub fn seed(owner: &OwnerId) -> Self {
        Self::new(owner, SEED_COMMAND, Vec::new(), Vec::new())
    }

    /// The unique `"[owner] method"` type string.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// The positional payload values.
    #[must_use]
    pub fn payload(&self) -> &[serde_json::Value] {
        &self.payload
    }

    /// True iff this action belongs to `owner`.
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        owns_action(owner, &self.action_type)
    }

    /// Payload values paired with their declared argument names.
    ///
    /// Positions without a declared name fall back to `arg{i}`.
    #[must_use]
    pub fn named_payload(&self) -> Vec<(String, &serde_json::Value)> {
        self.payload
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let name = self
                    .labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{i}"));
                (name, value)
            })
            .collect()
    }
}
