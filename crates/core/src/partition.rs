//! Hierarchical partition (logical cluster) paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SEPARATOR: char = ':';
const ROOT: &str = "root";

/// A validated, `:`-separated partition path such as `root:catalog:cert-manager`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionPath(String);

impl PartitionPath {
    /// Parse and validate a partition path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPartitionPath` if the path is empty or any
    /// segment is not a lowercase DNS-style label.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::invalid_partition_path(path, "path is empty"));
        }
        if let Some(segment) = path.split(SEPARATOR).find(|s| !is_valid_segment(s)) {
            let reason = format!("segment '{segment}' must be lowercase alphanumerics or '-'");
            return Err(Error::invalid_partition_path(path, reason));
        }
        Ok(Self(path))
    }

    /// The `root` partition.
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    /// Whether the path starts at the `root` partition.
    pub fn is_rooted(&self) -> bool {
        self.0.split(SEPARATOR).next() == Some(ROOT)
    }

    /// The last segment of the path.
    pub fn base(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// The enclosing partition, if any.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Append a child segment.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPartitionPath` if the child is not a valid segment.
    pub fn join(&self, child: &str) -> Result<Self> {
        Self::new(format!("{}{SEPARATOR}{child}", self.0))
    }

    /// Split into the parent path and the last segment.
    ///
    /// `root:catalog:my-entry` splits into (`root:catalog`, `my-entry`).
    pub fn split(&self) -> Option<(Self, &str)> {
        self.parent().map(|parent| (parent, self.base()))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let edge_ok = |b: Option<&u8>| b.is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    edge_ok(bytes.first())
        && edge_ok(bytes.last())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

impl fmt::Display for PartitionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartitionPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartitionPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartitionPath> for String {
    fn from(path: PartitionPath) -> Self {
        path.0
    }
}

impl AsRef<str> for PartitionPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        for path in ["root", "root:catalog", "root:catalog:cert-manager", "abc123"] {
            assert!(PartitionPath::new(path).is_ok(), "{path} should be valid");
        }
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", "Root", "root::x", "root:-x", "root:x-", "root:a_b", ":root"] {
            assert!(PartitionPath::new(path).is_err(), "{path} should be invalid");
        }
    }

    #[test]
    fn test_split_and_parent() {
        let path = PartitionPath::new("root:catalog:my-entry").unwrap();
        let (parent, base) = path.split().unwrap();
        assert_eq!(parent.as_str(), "root:catalog");
        assert_eq!(base, "my-entry");
        assert!(PartitionPath::root().split().is_none());
    }

    #[test]
    fn test_is_rooted() {
        assert!(PartitionPath::new("root:a").unwrap().is_rooted());
        assert!(!PartitionPath::new("rooted:a").unwrap().is_rooted());
    }

    #[test]
    fn test_join() {
        let path = PartitionPath::root().join("catalog").unwrap();
        assert_eq!(path.to_string(), "root:catalog");
        assert!(PartitionPath::root().join("Bad").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: std::result::Result<PartitionPath, _> = serde_json::from_str("\"root:a\"");
        assert!(ok.is_ok());
        let bad: std::result::Result<PartitionPath, _> = serde_json::from_str("\"ROOT\"");
        assert!(bad.is_err());
    }
}
