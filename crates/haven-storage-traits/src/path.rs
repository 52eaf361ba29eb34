//! Path addressing for the realtime store tree

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// A normalized location in the store tree.
///
/// Paths are sequences of non-empty segments, displayed slash-joined
/// (`groups/g1/members/u1`). The root path has no segments and addresses
/// the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// The root of the store tree
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a slash-separated path string.
    ///
    /// Leading and trailing slashes are tolerated; empty segments between
    /// slashes are rejected with [`StorageError::InvalidPath`].
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(StorageError::InvalidPath(format!(
                    "empty segment in {raw:?}"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self(segments))
    }

    /// Extend the path with one child segment.
    ///
    /// The segment must be non-empty and must not contain `/`.
    pub fn child(mut self, segment: &str) -> Self {
        debug_assert!(!segment.is_empty() && !segment.contains('/'));
        self.0.push(segment.to_string());
        self
    }

    /// The path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment, if any
    pub fn last_segment(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The parent path, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Whether `prefix` addresses this path or one of its ancestors
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
