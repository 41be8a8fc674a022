//! Unified error system for Strata
//!
//! One error enum covers every failure the store layer can report. All of
//! these are fatal to the triggering call and propagate to the caller;
//! none are retried automatically and none are silently swallowed.

use serde::{Deserialize, Serialize};

/// Unified error type for all Strata operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum StrataError {
    /// The draft state accessor was used outside an active mutation call,
    /// or through a draft that was invalidated after its commit.
    #[error("Illegal state access: {message}")]
    IllegalStateAccess {
        /// Description of the illegal access
        message: String,
    },

    /// The commands object carries own data members. The offending member
    /// names are reported so the configuration error is actionable.
    #[error("Commands object has illegal own member(s): {}", .members.join(", "))]
    IllegalInstanceMember {
        /// Names of the offending members
        members: Vec<String>,
    },

    /// A transition method returned a value. Transition methods mutate the
    /// draft and must not produce a result.
    #[error("Command '{command}' returned a value; transition methods must not")]
    IllegalReturnType {
        /// Name of the offending command
        command: String,
    },

    /// Two facades were registered under the same owner id.
    #[error("Duplicate owner registration: {owner}")]
    DuplicateOwner {
        /// The colliding owner id
        owner: String,
    },

    /// A mount point path collided with an existing live path.
    #[error("Mount point path collision: {path}")]
    PathCollision {
        /// The colliding path
        path: String,
    },

    /// An operation was attempted against a destroyed mount point or facade.
    #[error("Operation on destroyed {what}")]
    Destroyed {
        /// What was destroyed (mount point path, facade owner id)
        what: String,
    },

    /// A command name was invoked that the owner never registered.
    #[error("Unknown command '{command}' for owner {owner}")]
    UnknownCommand {
        /// Owner id whose table was searched
        owner: String,
        /// The unregistered command name
        command: String,
    },

    /// A slice path failed validation.
    #[error("Invalid slice path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path text
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A positional command argument could not be decoded to the requested type.
    #[error("Invalid argument at position {index}: {reason}")]
    InvalidArgument {
        /// Zero-based argument position
        index: usize,
        /// Decode failure description
        reason: String,
    },

    /// A transition method signalled failure. The enclosing root call
    /// discards its draft; no partial state is committed.
    #[error("Command '{command}' aborted: {message}")]
    CommandAborted {
        /// Name of the aborting command
        command: String,
        /// Failure description supplied by the command
        message: String,
    },

    /// Invalid configuration detected at construction time.
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },
}

impl StrataError {
    /// Create an illegal state access error.
    pub fn illegal_state_access(message: impl Into<String>) -> Self {
        Self::IllegalStateAccess {
            message: message.into(),
        }
    }

    /// Create an illegal instance member error.
    pub fn illegal_members(members: Vec<String>) -> Self {
        Self::IllegalInstanceMember { members }
    }

    /// Create an illegal return type error.
    pub fn illegal_return(command: impl Into<String>) -> Self {
        Self::IllegalReturnType {
            command: command.into(),
        }
    }

    /// Create a duplicate owner registration error.
    pub fn duplicate_owner(owner: impl Into<String>) -> Self {
        Self::DuplicateOwner {
            owner: owner.into(),
        }
    }

    /// Create a path collision error.
    pub fn path_collision(path: impl Into<String>) -> Self {
        Self::PathCollision { path: path.into() }
    }

    /// Create a destroyed-target error.
    pub fn destroyed(what: impl Into<String>) -> Self {
        Self::Destroyed { what: what.into() }
    }

    /// Create an unknown command error.
    pub fn unknown_command(owner: impl Into<String>, command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            owner: owner.into(),
            command: command.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            index,
            reason: reason.into(),
        }
    }

    /// Create a command abort error.
    pub fn aborted(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandAborted {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
