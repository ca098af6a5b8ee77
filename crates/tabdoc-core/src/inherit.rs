//! Datatype inheritance
//!
//! Class and classbox lines register a datatype for their scope. A variable
//! without its own datatype takes the nearest registered entry, walking the
//! scope upward to the root. `? unset` registers an explicit "no datatype"
//! that stops the walk.

use std::collections::HashMap;

use crate::scope::ScopePath;

pub const UNSET: &str = "unset";

pub fn is_unset(token: &str) -> bool {
    token.trim().eq_ignore_ascii_case(UNSET)
}

#[derive(Debug, Clone, Default)]
pub struct InheritanceMap {
    entries: HashMap<ScopePath, Option<String>>,
}

impl InheritanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scope: &ScopePath, datatype: &str) {
        tracing::debug!(scope = %scope, datatype, "inherited datatype registered");
        self.entries
            .insert(scope.clone(), Some(datatype.trim().to_string()));
    }

    pub fn unset(&mut self, scope: &ScopePath) {
        tracing::debug!(scope = %scope, "inherited datatype unset");
        self.entries.insert(scope.clone(), None);
    }

    /// Nearest registered datatype at or above `scope`
    pub fn resolve(&self, scope: &ScopePath) -> Option<&str> {
        let mut path = scope.clone();
        loop {
            if let Some(entry) = self.entries.get(&path) {
                return entry.as_deref();
            }
            if path.is_root() {
                return None;
            }
            path.backward(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_walks_upward() {
        let mut map = InheritanceMap::new();
        map.register(&ScopePath::parse("a"), "number");
        assert_eq!(map.resolve(&ScopePath::parse("a.b.c")), Some("number"));
        assert_eq!(map.resolve(&ScopePath::parse("a")), Some("number"));
        assert_eq!(map.resolve(&ScopePath::parse("z")), None);
    }

    #[test]
    fn test_nearest_wins_and_root_counts() {
        let mut map = InheritanceMap::new();
        map.register(&ScopePath::root(), "string");
        map.register(&ScopePath::parse("a.b"), "boolean");
        assert_eq!(map.resolve(&ScopePath::parse("a.b.c")), Some("boolean"));
        assert_eq!(map.resolve(&ScopePath::parse("a.x")), Some("string"));
    }

    #[test]
    fn test_unset_stops_walk() {
        let mut map = InheritanceMap::new();
        map.register(&ScopePath::parse("a"), "number");
        map.unset(&ScopePath::parse("a.b"));
        assert_eq!(map.resolve(&ScopePath::parse("a.b.c")), None);
        assert_eq!(map.resolve(&ScopePath::parse("a.c")), Some("number"));
        assert!(is_unset(" UNSET "));
    }
}
