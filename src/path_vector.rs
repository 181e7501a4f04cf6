//! Column path represented as a sequence of names.

use crate::common::{path_to_str, str_to_path};
use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// Provides a type-safe representation for a path from the schema root
/// (excluded) down to a node, and path specific methods.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPath(Vec<String>);

impl Deref for ColumnPath {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&[&str]> for ColumnPath {
    fn from(slice: &[&str]) -> Self {
        ColumnPath(slice.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for ColumnPath {
    fn from(slice: &[String]) -> Self {
        ColumnPath(slice.to_vec())
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(vec: Vec<String>) -> Self {
        ColumnPath(vec)
    }
}

impl From<&str> for ColumnPath {
    fn from(dotted: &str) -> Self {
        ColumnPath(str_to_path(dotted))
    }
}

impl Display for ColumnPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", path_to_str(&self.0))
        }
    }
}

impl ColumnPath {
    /// Checks if path represents the root (is empty)
    pub fn is_root(&self) -> bool {
        self.is_empty()
    }

    /// Creates a new `ColumnPath` by appending a path component.
    pub fn append_name(&self, name: impl Into<String>) -> Self {
        ColumnPath(
            self.iter()
                .cloned()
                .chain(std::iter::once(name.into()))
                .collect(),
        )
    }

    /// Returns the count of components (depth) in a path
    pub fn depth(&self) -> usize {
        self.len()
    }

    /// Creates a new `ColumnPath` containing the first `len` components.
    pub fn prefix(&self, len: usize) -> ColumnPath {
        ColumnPath(self.iter().take(len).cloned().collect())
    }

    /// Dotted string form, empty for the root.
    pub fn to_dotted(&self) -> String {
        path_to_str(&self.0)
    }

    /// Consumes the path returning its components.
    pub fn into_parts(self) -> Vec<String> {
        self.0
    }
}
