//! Line classifier
//!
//! Each significant line is exactly one of:
//!
//! ```text
//! import    [publicly|privately] import "<target>" as <alias>|?
//! classbox  ? [<datatype>|unset] [-> <max>]
//! class     <name> [? <datatype>] [-> <max>]
//! variable  [<visibility>] <name> [? <datatype>] (=|:) <value>
//! ```
//!
//! Candidates are tried in that order and the first match wins. A line that
//! matches nothing is inert.

pub mod comment;

use crate::visibility::Visibility;
use crate::{Error, Result};

/// Words that may not be used as an import alias
pub const RESERVED_ALIASES: [&str; 1] = ["self"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub public: bool,
    pub target: String,
    /// `None` for `as ?`
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassboxLine {
    pub datatype: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLine {
    pub name: String,
    pub datatype: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLine {
    pub visibility: Visibility,
    pub name: String,
    pub datatype: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Import(ImportLine),
    Classbox(ClassboxLine),
    Class(ClassLine),
    Variable(VariableLine),
    Inert,
}

/// `[A-Za-z0-9_]+`
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn check_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(Error::NamingRule(name.to_string()))
    }
}

pub fn check_alias(alias: &str) -> Result<()> {
    check_name(alias)?;
    if RESERVED_ALIASES.iter().any(|r| r.eq_ignore_ascii_case(alias)) {
        return Err(Error::NamingRule(alias.to_string()));
    }
    Ok(())
}

/// Resolve `\\ \# \" \/ \{ \}` in a String value; other pairs stay as written
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '\\' | '#' | '"' | '/' | '{' | '}') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Classify one comment-stripped line
pub fn classify(line: &str) -> Result<Line> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Inert);
    }
    if let Some(import) = parse_import(line) {
        return Ok(Line::Import(import));
    }
    if let Some(classbox) = parse_classbox(line) {
        return Ok(Line::Classbox(classbox));
    }
    if let Some(class) = parse_class(line) {
        return Ok(Line::Class(class));
    }
    parse_variable(line).map(|v| v.map_or(Line::Inert, Line::Variable))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Split a trailing `-> N` / `-> {ref}` arity suffix.
/// Returns `None` if an arrow is present but its suffix is malformed.
fn split_max(text: &str) -> Option<(&str, Option<String>)> {
    let Some(arrow) = text.rfind("->") else {
        return Some((text, None));
    };
    let max = text[arrow + 2..].trim();
    let well_formed = (!max.is_empty() && max.chars().all(|c| c.is_ascii_digit()))
        || (max.len() > 2 && max.starts_with('{') && max.ends_with('}'));
    well_formed.then(|| (&text[..arrow], Some(max.to_string())))
}

fn parse_import(line: &str) -> Option<ImportLine> {
    let mut rest = line;
    let mut public = false;
    let first = rest.split_whitespace().next()?;
    if first.eq_ignore_ascii_case("publicly") || first.eq_ignore_ascii_case("privately") {
        public = first.eq_ignore_ascii_case("publicly");
        rest = rest[first.len()..].trim_start();
    }
    let after = rest.strip_prefix("import")?;
    if !after.starts_with(char::is_whitespace) {
        return None;
    }
    let after = after.trim_start().strip_prefix('"')?;
    let close = after.find('"')?;
    let target = after[..close].to_string();
    let tail = &after[close + 1..];
    if !tail.starts_with(char::is_whitespace) {
        return None;
    }
    let tail = tail.trim_start().strip_prefix("as")?;
    if !tail.starts_with(char::is_whitespace) {
        return None;
    }
    let alias = tail.trim();
    if alias.is_empty() || target.is_empty() {
        return None;
    }
    Some(ImportLine {
        public,
        target,
        alias: (alias != "?").then(|| alias.to_string()),
    })
}

fn parse_classbox(line: &str) -> Option<ClassboxLine> {
    let content = line.strip_prefix('?')?;
    let (datatype, max) = split_max(content).unwrap_or((content, None));
    Some(ClassboxLine {
        datatype: non_empty(datatype),
        max,
    })
}

fn parse_class(line: &str) -> Option<ClassLine> {
    if line.contains('=') || line.contains(':') {
        return None;
    }
    let (head, max) = split_max(line)?;
    let (name, datatype) = match head.find('?') {
        Some(q) => (head[..q].trim(), non_empty(&head[q + 1..])),
        None => (head.trim(), None),
    };
    if !is_valid_name(name) {
        return None;
    }
    Some(ClassLine {
        name: name.to_string(),
        datatype,
        max,
    })
}

fn parse_variable(line: &str) -> Result<Option<VariableLine>> {
    let Some(sep) = line.find(['=', ':']) else {
        return Ok(None);
    };
    let head = &line[..sep];
    let value = line[sep + 1..].trim();

    let (lhs, datatype) = match head.find('?') {
        Some(q) => (&head[..q], non_empty(&head[q + 1..])),
        None => (head, None),
    };
    let words: Vec<&str> = lhs.split_whitespace().collect();
    let (visibility, name) = match words.as_slice() {
        [name] => (Visibility::Public, *name),
        [keyword, name] => match Visibility::from_keyword(keyword) {
            Some(visibility) => (visibility, *name),
            None => return Ok(None),
        },
        [] => return Err(Error::NamingRule(String::new())),
        _ => return Ok(None),
    };

    check_name(name)?;
    if value.is_empty() {
        return Err(Error::InvalidValue);
    }
    Ok(Some(VariableLine {
        visibility,
        name: name.to_string(),
        datatype,
        value: value.to_string(),
    }))
}
