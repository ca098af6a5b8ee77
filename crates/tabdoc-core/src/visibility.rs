//! Visibility model
//!
//! A fixed capability table. Pure lookups, no state.
//!
//! | tag        | import across scopes | same-parent interpolate | display |
//! |------------|----------------------|-------------------------|---------|
//! | public     | yes                  | yes                     | yes     |
//! | protected  | yes                  | yes                     | no      |
//! | inherited  | yes                  | no                      | no      |
//! | private    | no                   | no                      | yes     |
//! | restricted | no                   | yes                     | yes     |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scope::ScopePath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Inherited,
    Private,
    Restricted,
}

/// One row of the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub importable: bool,
    pub interpolatable: bool,
    pub displayable: bool,
}

impl Visibility {
    pub const ALL: [Visibility; 5] = [
        Visibility::Public,
        Visibility::Protected,
        Visibility::Inherited,
        Visibility::Private,
        Visibility::Restricted,
    ];

    /// Case-insensitive keyword lookup
    pub fn from_keyword(word: &str) -> Option<Visibility> {
        Visibility::ALL
            .into_iter()
            .find(|v| v.keyword().eq_ignore_ascii_case(word))
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Inherited => "inherited",
            Visibility::Private => "private",
            Visibility::Restricted => "restricted",
        }
    }

    pub fn capability(&self) -> Capability {
        let (importable, interpolatable, displayable) = match self {
            Visibility::Public => (true, true, true),
            Visibility::Protected => (true, true, false),
            Visibility::Inherited => (true, false, false),
            Visibility::Private => (false, false, true),
            Visibility::Restricted => (false, true, true),
        };
        Capability {
            importable,
            interpolatable,
            displayable,
        }
    }

    pub fn displayable(&self) -> bool {
        self.capability().displayable
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Whether an element at `from` with `visibility` may be referenced from
/// `to`. With `final_target`, `to` is itself the referencing scope rather
/// than an element inside it.
pub fn fit(visibility: Visibility, from: &ScopePath, to: &ScopePath, final_target: bool) -> bool {
    let from_parent = from.parent();
    let to_parent = if final_target { to.clone() } else { to.parent() };
    let capability = visibility.capability();
    if from_parent == to_parent {
        capability.interpolatable
    } else {
        capability.importable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ScopePath {
        ScopePath::parse(s)
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Visibility::from_keyword("PRIVATE"), Some(Visibility::Private));
        assert_eq!(Visibility::from_keyword("secret"), None);
        for v in Visibility::ALL {
            assert_eq!(Visibility::from_keyword(v.keyword()), Some(v));
        }
    }

    #[test]
    fn test_same_parent_uses_interpolate_flag() {
        let base = path("server");
        assert!(fit(Visibility::Restricted, &path("server.a"), &base, true));
        assert!(!fit(Visibility::Private, &path("server.a"), &base, true));
        assert!(!fit(Visibility::Inherited, &path("server.a"), &base, true));
    }

    #[test]
    fn test_across_parents_uses_import_flag() {
        let base = path("client");
        assert!(fit(Visibility::Inherited, &path("server.a"), &base, true));
        assert!(!fit(Visibility::Restricted, &path("server.a"), &base, true));
    }

    #[test]
    fn test_public_and_private_across_parents() {
        let pairs = [("a.x", "b"), ("x", "a.b.c"), ("a.b.x", "")];
        for (from, to) in pairs {
            assert!(fit(Visibility::Public, &path(from), &path(to), true));
            assert!(!fit(Visibility::Private, &path(from), &path(to), true));
        }
    }

    #[test]
    fn test_non_final_target_compares_parents() {
        assert!(!fit(Visibility::Private, &path("a.x"), &path("a.y"), true));
        assert!(fit(Visibility::Restricted, &path("a.x"), &path("a.y"), false));
    }

    #[test]
    fn test_displayable_column() {
        let shown: Vec<_> = Visibility::ALL.into_iter().filter(Visibility::displayable).collect();
        assert_eq!(
            shown,
            vec![Visibility::Public, Visibility::Private, Visibility::Restricted]
        );
    }
}
