//! Value type registry
//!
//! The fixed set of value kinds, the datatype tokens that select them, and
//! the `test`/`convert` pair for each kind.
//!
//! # Auto-detection
//!
//! Candidates are tried in the order List, Null, Byte, Number, Boolean,
//! String and the first kind whose `test` accepts the token wins. String is
//! last because any double-quoted token is a valid String. Qualifiers:
//!
//! - `auto(not X, Y)` removes X and Y from the candidates
//! - `auto(X, Y)` tries exactly X then Y, in the listed order

pub mod byte;
pub mod list;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::Evaluator;
use crate::value::{Byte, ByteFormat, Number, Value};
use crate::{Error, Result};

// ── Kinds ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    List,
    Null,
    Byte,
    Number,
    Boolean,
    String,
}

/// Canonical auto-detection order
pub const AUTO_ORDER: [Kind; 6] = [
    Kind::List,
    Kind::Null,
    Kind::Byte,
    Kind::Number,
    Kind::Boolean,
    Kind::String,
];

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::List => "List",
            Kind::Null => "Null",
            Kind::Byte => "Byte",
            Kind::Number => "Number",
            Kind::Boolean => "Boolean",
            Kind::String => "String",
        }
    }

    /// Kind named by a qualifier entry (case-insensitive, `none` is Null)
    pub fn from_name(name: &str) -> Option<Kind> {
        let name = name.trim().to_ascii_lowercase();
        let first = name.split_whitespace().next().unwrap_or("");
        match first {
            "list" => Some(Kind::List),
            "null" | "none" => Some(Kind::Null),
            "byte" => Some(Kind::Byte),
            "number" => Some(Kind::Number),
            "boolean" => Some(Kind::Boolean),
            "string" => Some(Kind::String),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Datatypes ─────────────────────────────────────────────

/// Candidate filter for auto-detection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutoFilter {
    #[default]
    Any,
    Not(Vec<Kind>),
    Sure(Vec<Kind>),
}

impl AutoFilter {
    /// Parse the inside of `auto(…)` / `list(…)`; malformed content is `Any`
    fn parse(inner: &str) -> AutoFilter {
        let inner = inner.trim();
        let lower = inner.to_ascii_lowercase();
        let (negated, rest) = match lower.strip_prefix("not") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                (true, rest)
            }
            _ => (false, lower.as_str()),
        };
        let mut kinds: Vec<Kind> = Vec::new();
        for kind in rest.split(',').filter_map(Kind::from_name) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        match (negated, kinds.is_empty()) {
            (_, true) => AutoFilter::Any,
            (true, false) => AutoFilter::Not(kinds),
            (false, false) => AutoFilter::Sure(kinds),
        }
    }

    pub fn candidates(&self) -> Vec<Kind> {
        match self {
            AutoFilter::Any => AUTO_ORDER.to_vec(),
            AutoFilter::Not(removed) => AUTO_ORDER
                .iter()
                .copied()
                .filter(|k| !removed.contains(k))
                .collect(),
            AutoFilter::Sure(kinds) => kinds.clone(),
        }
    }
}

/// A parsed datatype token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    Auto(AutoFilter),
    /// Element filter applies to every leaf
    List(AutoFilter),
    Byte(ByteFormat),
    Number,
    Boolean,
    Null,
    String,
}

/// Split `name(inner)` into the parenthesized part, if any
fn qualifier<'a>(rest: &'a str) -> Option<&'a str> {
    let rest = rest.trim();
    rest.strip_prefix('(')?.strip_suffix(')')
}

impl Datatype {
    /// Select a datatype from a declared token (case-insensitive)
    pub fn parse(token: &str) -> Result<Datatype> {
        let trimmed = token.trim();
        let lower = trimmed.to_ascii_lowercase();
        let invalid = || Error::InvalidDataType(trimmed.to_string());

        if let Some(rest) = lower.strip_prefix("auto") {
            return Ok(Datatype::Auto(
                qualifier(rest).map(AutoFilter::parse).unwrap_or_default(),
            ));
        }
        if let Some(rest) = lower.strip_prefix("list") {
            if rest.trim().is_empty() {
                return Ok(Datatype::List(AutoFilter::Any));
            }
            return qualifier(rest)
                .map(|inner| Datatype::List(AutoFilter::parse(inner)))
                .ok_or_else(invalid);
        }
        if let Some(rest) = lower.strip_prefix("byte") {
            let words: Vec<&str> = rest.split_whitespace().collect();
            return match words.as_slice() {
                [] => Ok(Datatype::Byte(ByteFormat::Raw)),
                ["as", "hex"] => Ok(Datatype::Byte(ByteFormat::Hex)),
                ["as", "binary"] => Ok(Datatype::Byte(ByteFormat::Binary)),
                ["as", "unit"] => Ok(Datatype::Byte(ByteFormat::Unit)),
                _ => Err(invalid()),
            };
        }
        match lower.as_str() {
            "number" => Ok(Datatype::Number),
            "boolean" => Ok(Datatype::Boolean),
            "string" => Ok(Datatype::String),
            "null" | "none" => Ok(Datatype::Null),
            _ => Err(invalid()),
        }
    }

    /// Canonical name, e.g. `Byte as Hex`
    pub fn name(&self) -> String {
        match self {
            Datatype::Auto(_) => "Auto".to_string(),
            Datatype::List(_) => "List".to_string(),
            Datatype::Byte(ByteFormat::Raw) => "Byte".to_string(),
            Datatype::Byte(format) => format!("Byte as {}", format.name()),
            Datatype::Number => "Number".to_string(),
            Datatype::Boolean => "Boolean".to_string(),
            Datatype::Null => "Null".to_string(),
            Datatype::String => "String".to_string(),
        }
    }

    /// Whether a multi-line list may start under this datatype
    pub fn accepts_list(&self) -> bool {
        match self {
            Datatype::List(_) => true,
            Datatype::Auto(filter) => filter.candidates().contains(&Kind::List),
            _ => false,
        }
    }

    /// Element filter used when this datatype holds a list
    pub fn element_filter(&self) -> AutoFilter {
        match self {
            Datatype::List(filter) => filter.clone(),
            _ => AutoFilter::Any,
        }
    }
}

// ── Registry ──────────────────────────────────────────────

/// Stateless `test`/`convert` over the fixed kind set
pub struct Registry<'a> {
    evaluator: &'a dyn Evaluator,
}

impl<'a> Registry<'a> {
    pub fn new(evaluator: &'a dyn Evaluator) -> Self {
        Registry { evaluator }
    }

    /// Whether `raw` has the shape of `kind`
    pub fn test(&self, kind: Kind, raw: &str) -> bool {
        let raw = raw.trim();
        match kind {
            Kind::List => list::is_list(raw),
            Kind::Null => raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("none"),
            Kind::Byte => byte::is_byte(raw),
            Kind::Number => !raw.starts_with('"') && self.evaluator.accepts(raw),
            Kind::Boolean => parse_bool(raw).is_some(),
            Kind::String => raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"'),
        }
    }

    /// Convert `raw` to `kind`; lists use unrestricted element detection
    pub fn convert(&self, kind: Kind, raw: &str) -> Result<Value> {
        let raw = raw.trim();
        if !self.test(kind, raw) {
            return Err(Error::conversion(kind.name(), raw));
        }
        match kind {
            Kind::List => self.convert_list(raw, &AutoFilter::Any),
            Kind::Null => Ok(Value::Null),
            Kind::Byte => Ok(Value::Byte(Byte {
                count: byte::to_count(raw, self.evaluator)?,
                format: ByteFormat::Raw,
            })),
            Kind::Number => self.convert_number(raw).map(Value::Number),
            Kind::Boolean => parse_bool(raw)
                .map(Value::Boolean)
                .ok_or_else(|| Error::conversion(kind.name(), raw)),
            Kind::String => Ok(Value::String(raw[1..raw.len() - 1].to_string())),
        }
    }

    /// First candidate kind that accepts `raw`
    pub fn detect(&self, filter: &AutoFilter, raw: &str) -> Result<Value> {
        let raw = raw.trim();
        filter
            .candidates()
            .into_iter()
            .find(|kind| self.test(*kind, raw))
            .map(|kind| self.convert(kind, raw))
            .unwrap_or_else(|| Err(Error::AutotypeConversion(raw.to_string())))
    }

    /// Convert `raw` under a declared datatype
    pub fn convert_as(&self, datatype: &Datatype, raw: &str) -> Result<Value> {
        match datatype {
            Datatype::Auto(filter) => self.detect(filter, raw),
            Datatype::List(filter) => {
                if !list::is_list(raw) {
                    return Err(Error::conversion("List", raw.trim()));
                }
                self.convert_list(raw, filter)
            }
            // a declared byte also takes a plain count like `255`
            Datatype::Byte(format) => Ok(Value::Byte(Byte {
                count: byte::to_count(raw.trim(), self.evaluator)?,
                format: *format,
            })),
            Datatype::Number => self.convert(Kind::Number, raw),
            Datatype::Boolean => self.convert(Kind::Boolean, raw),
            Datatype::Null => self.convert(Kind::Null, raw),
            Datatype::String => self.convert(Kind::String, raw),
        }
    }

    fn convert_list(&self, raw: &str, filter: &AutoFilter) -> Result<Value> {
        let items = list::scan(raw)?;
        self.convert_items(&items, filter).map(Value::List)
    }

    fn convert_items(&self, items: &[list::Item], filter: &AutoFilter) -> Result<Vec<Value>> {
        items
            .iter()
            .map(|item| match item {
                list::Item::Leaf(leaf) => self.detect(filter, leaf),
                list::Item::List(nested) => self.convert_items(nested, filter).map(Value::List),
            })
            .collect()
    }

    /// Integer literals that overflow `i64` go through the evaluator and
    /// come back as `Float`
    fn convert_number(&self, raw: &str) -> Result<Number> {
        if let Ok(i) = raw.parse::<i64>() {
            return Ok(Number::Int(i));
        }
        if raw.contains('.') {
            if let Ok(v) = raw.parse::<f64>() {
                return Ok(Number::Float(v));
            }
        }
        let v = self
            .evaluator
            .evaluate(raw)
            .map_err(|_| Error::conversion("Number", raw))?;
        Ok(Number::from_f64(v))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
