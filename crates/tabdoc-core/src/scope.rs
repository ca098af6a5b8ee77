//! Scope paths, dot-separated hierarchical names
//!
//! A path is stored as its segments. Empty segments never survive, so
//! `".a..b."` and `"a.b"` are the same path. The root path has no segments
//! and renders as the empty string.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const SEPARATOR: char = '.';

/// Hierarchical element path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopePath {
    segments: Vec<String>,
}

impl ScopePath {
    pub fn root() -> Self {
        ScopePath::default()
    }

    /// Parse a dotted path, dropping empty segments
    pub fn parse(text: &str) -> Self {
        ScopePath {
            segments: text
                .split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Normalize a dotted path string
    pub fn clean(text: &str) -> String {
        ScopePath::parse(text).to_string()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Descend into `name` (which may itself be dotted)
    pub fn forward(&mut self, name: &str) {
        self.segments.extend(
            name.split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }

    /// The path `name` would have below this one, without mutating
    pub fn temp_forward(&self, name: &str) -> ScopePath {
        let mut path = self.clone();
        path.forward(name);
        path
    }

    /// Pop `n` segments, stopping at the root
    pub fn backward(&mut self, n: usize) {
        let keep = self.segments.len().saturating_sub(n);
        self.segments.truncate(keep);
    }

    /// The enclosing path (root is its own parent)
    pub fn parent(&self) -> ScopePath {
        let mut path = self.clone();
        path.backward(1);
        path
    }

    pub fn join(&self, other: &ScopePath) -> ScopePath {
        let mut path = self.clone();
        path.segments.extend(other.segments.iter().cloned());
        path
    }

    pub fn starts_with(&self, prefix: &ScopePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for ScopePath {
    fn from(text: &str) -> Self {
        ScopePath::parse(text)
    }
}

impl Serialize for ScopePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScopePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(ScopePath::parse(&text))
    }
}
