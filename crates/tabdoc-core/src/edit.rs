//! Point edits on single source lines
//!
//! An edit locates an element through its provenance and rewrites only the
//! part of the raw line it changes. Indentation, spacing and trailing
//! comments are kept as written.

use crate::config::Config;
use crate::document::{Document, Element, Provenance};
use crate::inherit;
use crate::interpolate;
use crate::scope::ScopePath;
use crate::syntax::{self, comment};
use crate::types::Datatype;
use crate::{Error, Result};

/// A rewritten line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// 1-based
    pub line_number: usize,
    pub line: String,
}

impl Edit {
    pub fn apply(&self, lines: &mut [String]) -> Result<()> {
        let slot = self
            .line_number
            .checked_sub(1)
            .and_then(|i| lines.get_mut(i))
            .ok_or_else(|| Error::InvalidEdit(format!("line {} is out of range", self.line_number)))?;
        *slot = self.line.clone();
        Ok(())
    }
}

/// A raw line split into indentation, code and trailing comment
struct Parts<'a> {
    indent: &'a str,
    code: &'a str,
    comment: &'a str,
}

impl<'a> Parts<'a> {
    fn split(raw: &'a str, markers: &[String]) -> Self {
        let body_start = raw.len() - raw.trim_start().len();
        let (indent, body) = raw.split_at(body_start);
        let at = comment::find_marker(body, markers).unwrap_or(body.len());
        let (code, comment) = body.split_at(at);
        Parts {
            indent,
            code,
            comment,
        }
    }

    fn join(&self, code: &str) -> String {
        format!("{}{}{}", self.indent, code, self.comment)
    }
}

/// Replace the trimmed text of `code[start..end]` with `new`. An empty
/// region gets `new` surrounded by single spaces.
fn replace_region(code: &str, start: usize, end: usize, new: &str) -> String {
    let region = &code[start..end];
    let lead = region.len() - region.trim_start().len();
    let trimmed = region.trim();
    if trimmed.is_empty() {
        let pad = if end == code.len() { "" } else { " " };
        return format!("{} {}{}{}", &code[..start], new, pad, &code[end..]);
    }
    let from = start + lead;
    let to = from + trimmed.len();
    format!("{}{}{}", &code[..from], new, &code[to..])
}

fn first_of(code: &str, needles: &[&str]) -> Option<usize> {
    needles.iter().filter_map(|n| code.find(n)).min()
}

/// End of a class/classbox head before any `->` suffix
fn head_end(code: &str) -> usize {
    code.rfind("->").unwrap_or(code.len())
}

/// Set the datatype in `code[..end]`: rewrite after `?`, or insert ` ? dt`
fn set_datatype(code: &str, end: usize, datatype: &str) -> String {
    match code[..end].find('?') {
        Some(q) => replace_region(code, q + 1, end, datatype),
        None => {
            let at = code[..end].trim_end().len();
            format!("{} ? {}{}", &code[..at], datatype, &code[at..])
        }
    }
}

pub struct Editor<'d> {
    document: &'d Document,
    markers: Vec<String>,
}

impl<'d> Editor<'d> {
    pub fn new(document: &'d Document) -> Self {
        Editor {
            document,
            markers: Config::default().comment_markers,
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.markers = config.comment_markers.clone();
        self
    }

    fn locate(&self, path: &str) -> Result<(&'d Element, &'d Provenance)> {
        let key = ScopePath::parse(path);
        let entry = self
            .document
            .get(&key)
            .ok_or_else(|| Error::SetPathNotFound(key.to_string()))?;
        let provenance = entry
            .provenance
            .as_ref()
            .ok_or_else(|| Error::InvalidEdit(format!("'{}' was imported", key)))?;
        Ok((&entry.element, provenance))
    }

    fn edit(&self, provenance: &Provenance, rewrite: impl FnOnce(&str) -> Result<String>) -> Result<Edit> {
        let parts = Parts::split(&provenance.raw, &self.markers);
        let code = rewrite(parts.code)?;
        tracing::debug!(line = provenance.number, "line rewritten");
        Ok(Edit {
            line_number: provenance.number,
            line: parts.join(&code),
        })
    }

    /// Rename a variable or class
    pub fn rename(&self, path: &str, name: &str) -> Result<Edit> {
        syntax::check_name(name)?;
        let (element, provenance) = self.locate(path)?;
        match element {
            Element::Variable(_) => self.edit(provenance, |code| {
                let sep = first_of(code, &["=", ":"])
                    .ok_or_else(|| Error::InvalidEdit(format!("'{}' has no assignment", path)))?;
                let lhs_end = code[..sep].find('?').unwrap_or(sep);
                let lhs = code[..lhs_end].trim_end();
                let start = lhs
                    .char_indices()
                    .filter(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8())
                    .last()
                    .unwrap_or(0);
                Ok(replace_region(code, start, lhs.len(), name))
            }),
            Element::Class(_) => self.edit(provenance, |code| {
                let end = first_of(code, &["?", "->"]).unwrap_or(code.len());
                Ok(replace_region(code, 0, end, name))
            }),
            Element::Classbox(_) => Err(Error::InvalidEdit("a classbox has no name".into())),
        }
    }

    /// Change the declared datatype of a variable or class
    pub fn retype(&self, path: &str, datatype: &str) -> Result<Edit> {
        let (element, provenance) = self.locate(path)?;
        match element {
            Element::Variable(_) => {
                validate_datatype(datatype, false)?;
                self.edit(provenance, |code| {
                    let sep = first_of(code, &["=", ":"])
                        .ok_or_else(|| Error::InvalidEdit(format!("'{}' has no assignment", path)))?;
                    Ok(set_datatype(code, sep, datatype))
                })
            }
            Element::Class(_) => {
                validate_datatype(datatype, true)?;
                self.edit(provenance, |code| Ok(set_datatype(code, head_end(code), datatype)))
            }
            Element::Classbox(_) => self.retype_classbox(path, datatype),
        }
    }

    /// Change the datatype of the classbox constraining `scope`
    pub fn retype_classbox(&self, scope: &str, datatype: &str) -> Result<Edit> {
        validate_datatype(datatype, true)?;
        let key = ScopePath::parse(scope);
        let provenance = self
            .document
            .classbox(&key)
            .and_then(|entry| entry.provenance.as_ref())
            .ok_or_else(|| Error::SetPathNotFound(key.to_string()))?;
        self.edit(provenance, |code| {
            Ok(replace_region(code, 1, head_end(code), datatype))
        })
    }

    /// Replace the raw value of a variable
    pub fn revalue(&self, path: &str, value: &str) -> Result<Edit> {
        if value.trim().is_empty() {
            return Err(Error::InvalidValue);
        }
        let (element, provenance) = self.locate(path)?;
        if !matches!(element, Element::Variable(_)) {
            return Err(Error::InvalidEdit(format!("'{}' is not a variable", path)));
        }
        self.edit(provenance, |code| {
            let sep = first_of(code, &["=", ":"])
                .ok_or_else(|| Error::InvalidEdit(format!("'{}' has no assignment", path)))?;
            Ok(replace_region(code, sep + 1, code.len(), value.trim()))
        })
    }
}

fn validate_datatype(datatype: &str, allow_unset: bool) -> Result<()> {
    if interpolate::has_placeholder(datatype) || (allow_unset && inherit::is_unset(datatype)) {
        return Ok(());
    }
    Datatype::parse(datatype).map(|_| ())
}
