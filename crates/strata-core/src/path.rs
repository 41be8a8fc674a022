//! Slice paths
//!
//! A [`SlicePath`] addresses one sub-tree of the shared root state tree.
//! Paths are dot-separated (`"todos.filter"`); a child mount point's path is
//! always a strict descendant of its parent's.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::StrataError;

/// Dot-separated path into the shared root state tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlicePath {
    segments: Vec<String>,
}

impl SlicePath {
    /// Parse a dot-separated path.
    ///
    /// Each segment must be non-empty and free of whitespace and dots.
    pub fn parse(path: &str) -> Result<Self, StrataError> {
        if path.is_empty() {
            return Err(StrataError::invalid_path(path, "path must not be empty"));
        }
        let mut segments = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(StrataError::invalid_path(
                    path,
                    "path segments must not be empty",
                ));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(StrataError::invalid_path(
                    path,
                    "path segments must not contain whitespace",
                ));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Extend this path with a child path (itself possibly dotted).
    ///
    /// The result is a strict descendant of `self`.
    pub fn child(&self, child: &str) -> Result<Self, StrataError> {
        let tail = Self::parse(child)?;
        let mut segments = self.segments.clone();
        segments.extend(tail.segments);
        Ok(Self { segments })
    }

    /// The individual path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments in the path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True iff `other` lies strictly below this path.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &SlicePath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for SlicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for SlicePath {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
