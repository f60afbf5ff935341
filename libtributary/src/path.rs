//! Typed dotted-path addressing for nested state.
//!
//! Form fields and state lookups refer to nested values by dotted names
//! like `person.first`. Instead of splitting strings at every call site,
//! the segments live in a [`Path`] value; [`expand`] turns a path plus a
//! leaf value into the nested single-key object a commit expects, and
//! [`get_path`] walks a tree back down along the same segments.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::PathError;

/// A parsed dotted name: a non-empty sequence of non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a dotted name such as `person.first`.
    ///
    /// Rejects the empty string and names with empty segments (`a..b`,
    /// leading or trailing dots).
    pub fn parse(name: &str) -> Result<Self, PathError> {
        if name.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(name.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Append `other`'s segments to a copy of this path.
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Expand a path and a leaf value into a nested single-key object.
///
/// `person.first` with `"Tom"` becomes `{"person": {"first": "Tom"}}`,
/// ready to be merged into state as a partial update.
pub fn expand(path: &Path, value: Value) -> Value {
    let mut current = value;
    for segment in path.segments.iter().rev() {
        let mut wrapper = Map::new();
        wrapper.insert(segment.clone(), current);
        current = Value::Object(wrapper);
    }
    current
}

/// Read the value at `path` inside `root`, if every segment resolves.
pub fn get_path<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = root;
    for segment in &path.segments {
        current = current.get(segment)?;
    }
    Some(current)
}
