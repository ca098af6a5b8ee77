//! The parsed document
//!
//! A path-keyed map of elements in insertion order. Every element parsed
//! from a line carries its provenance (line text, raw line, line number),
//! which the point-edit module uses to rewrite single lines. Classboxes are
//! kept in a separate map keyed by the scope they constrain.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::scope::ScopePath;
use crate::value::Value;
use crate::visibility::Visibility;
use crate::{Error, Result};

// ── Elements ──────────────────────────────────────────────

/// Where an element came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Comment-stripped line as classified
    pub line: String,
    /// Line exactly as read
    pub raw: String,
    /// Previous significant raw line, if any
    pub previous: Option<String>,
    /// 1-based
    pub number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOpen {
    pub name: String,
    pub datatype: Option<String>,
    pub max_elements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classbox {
    pub datatype: Option<String>,
    pub max_elements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub visibility: Visibility,
    /// Datatype token as written, before inheritance and interpolation
    pub declared_datatype: Option<String>,
    /// Effective datatype name (`Number`, `Byte as Hex`, …)
    pub datatype: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Class(ClassOpen),
    Classbox(Classbox),
    Variable(Variable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Class,
    Classbox,
    Variable,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Class(_) => ElementKind::Class,
            Element::Classbox(_) => ElementKind::Classbox,
            Element::Variable(_) => ElementKind::Variable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub element: Element,
    /// `None` for imported elements
    pub provenance: Option<Provenance>,
}

// ── Document ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    entries: IndexMap<ScopePath, Entry>,
    classboxes: IndexMap<ScopePath, Entry>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`. Re-opening an existing class keeps the first entry;
    /// any other collision is an error.
    pub fn insert(&mut self, path: ScopePath, entry: Entry) -> Result<()> {
        if let Some(existing) = self.entries.get(&path) {
            let reopen = matches!(
                (&existing.element, &entry.element),
                (Element::Class(_), Element::Class(_))
            );
            if reopen {
                return Ok(());
            }
            return Err(Error::DuplicatePath(path.to_string()));
        }
        self.entries.insert(path, entry);
        Ok(())
    }

    /// Record the classbox of `scope`; the latest one wins
    pub fn insert_classbox(&mut self, scope: ScopePath, entry: Entry) {
        self.classboxes.insert(scope, entry);
    }

    pub fn get(&self, path: &ScopePath) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn variable(&self, path: &ScopePath) -> Option<&Variable> {
        match self.entries.get(path).map(|e| &e.element) {
            Some(Element::Variable(v)) => Some(v),
            _ => None,
        }
    }

    pub fn classbox(&self, scope: &ScopePath) -> Option<&Entry> {
        self.classboxes.get(scope)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ScopePath, &Entry)> {
        self.entries.iter()
    }

    pub fn classboxes(&self) -> impl Iterator<Item = (&ScopePath, &Entry)> {
        self.classboxes.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&ScopePath, &Variable)> {
        self.entries.iter().filter_map(|(path, entry)| match &entry.element {
            Element::Variable(v) => Some((path, v)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variables an end user may see
    pub fn displayable(&self) -> Document {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| match &entry.element {
                Element::Variable(v) => v.visibility.displayable(),
                _ => false,
            })
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();
        Document {
            entries,
            classboxes: IndexMap::new(),
        }
    }

    /// Nested JSON of the displayable variables
    pub fn to_json(&self) -> Result<serde_json::Value> {
        crate::materialize::materialize(&self.displayable())
    }

    /// SHA-256 of the compact materialized JSON, lowercase hex
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.to_string().as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
