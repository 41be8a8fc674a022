//! Owner identifiers
//!
//! An [`OwnerId`] names one facade for action-type prefixing and ownership
//! gating. Ids are caller-supplied; uniqueness across live owners is
//! enforced by the store-layer registry, not by this type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::StrataError;

/// Unique identifier of a facade within one process.
///
/// The id is embedded in action types as `"[owner] method"`, so it must not
/// contain square brackets. Any other non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner id, validating the action-type embedding rules.
    pub fn new(id: impl Into<String>) -> Result<Self, StrataError> {
        let id = id.into();
        if id.is_empty() {
            return Err(StrataError::configuration("owner id must not be empty"));
        }
        if id.contains('[') || id.contains(']') {
            return Err(StrataError::configuration(format!(
                "owner id '{id}' must not contain square brackets"
            )));
        }
        Ok(Self(id))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
