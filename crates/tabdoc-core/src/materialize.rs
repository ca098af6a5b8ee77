//! Nested JSON materialization
//!
//! Each variable path is split on its separator and folded into nested
//! objects. Sibling paths merge; a path that is both a leaf and a branch is
//! a `MaterializeConflict`. Insertion order is preserved.

use serde_json::{Map, Value as Json};

use crate::document::Document;
use crate::{Error, Result};

/// Fold every variable of `document` into one JSON object. Callers filter
/// non-displayable elements first (see `Document::to_json`).
pub fn materialize(document: &Document) -> Result<Json> {
    let mut root = Map::new();
    for (path, variable) in document.variables() {
        let conflict = || Error::MaterializeConflict(path.to_string());
        let Some((leaf, branches)) = path.segments().split_last() else {
            return Err(conflict());
        };
        let mut node = &mut root;
        for segment in branches {
            let child = node
                .entry(segment.clone())
                .or_insert_with(|| Json::Object(Map::new()));
            node = child.as_object_mut().ok_or_else(conflict)?;
        }
        if node.contains_key(leaf) {
            return Err(conflict());
        }
        node.insert(leaf.clone(), variable.value.to_json());
    }
    Ok(Json::Object(root))
}
