//! Runtime values produced by the type registry
//!
//! A `Value` is immutable once converted. `Display` is the textual form used
//! for interpolation and for `tabdoc get`; `to_json` is the form used by the
//! materializer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{byte, Kind};

// ── Numbers ───────────────────────────────────────────────

/// Integer or float, keeping integer-ness when there is no fractional part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Collapse an evaluated result to `Int` when it is integral
    pub fn from_f64(v: f64) -> Self {
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            Number::Int(v as i64)
        } else {
            Number::Float(v)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // keep the decimal point so re-parsing yields a float again
            Number::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{:.1}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

// ── Bytes ─────────────────────────────────────────────────

/// Output format requested by a `byte as …` datatype
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteFormat {
    #[default]
    Raw,
    Hex,
    Binary,
    Unit,
}

impl ByteFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ByteFormat::Raw => "Raw",
            ByteFormat::Hex => "Hex",
            ByteFormat::Binary => "Binary",
            ByteFormat::Unit => "Unit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Byte {
    pub count: u64,
    pub format: ByteFormat,
}

impl fmt::Display for Byte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", byte::render(self.count, self.format))
    }
}

// ── Value ─────────────────────────────────────────────────

/// A typed document value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Number),
    Byte(Byte),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Number(_) => Kind::Number,
            Value::Byte(_) => Kind::Byte,
            Value::String(_) => Kind::String,
            Value::List(_) => Kind::List,
        }
    }

    /// Materialized JSON form. Formatted bytes become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(Number::Int(i)) => serde_json::json!(i),
            Value::Number(Number::Float(v)) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Byte(b) if b.format == ByteFormat::Raw => serde_json::json!(b.count),
            Value::Byte(b) => serde_json::Value::String(b.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// Convert a JSON value; objects nested inside arrays are kept as JSON text
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Number(Number::Int(i)),
                None => Value::Number(Number::Float(n.as_f64().unwrap_or(0.0))),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::String(json.to_string()),
        }
    }

    fn fmt_list_item(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", escape_quotes(s)),
            other => write!(f, "{}", other),
        }
    }
}

/// Escape `\` and `"` so the text can sit between double quotes and be
/// read back by the list scanner or the string unescaper
pub fn escape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Byte(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_list_item(f)?;
                }
                write!(f, "]")
            }
        }
    }
}
