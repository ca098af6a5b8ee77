//! Tabdoc Core - engine for an indentation-structured configuration language
//!
//! A document is a sequence of lines. Indentation opens and closes classes,
//! classboxes constrain the datatype and element count of a scope, and
//! variables hold typed values that may interpolate other variables.
//!
//! # Architecture
//!
//! ```text
//! Lines → CommentFilter → Classifier → Engine ──→ Document
//!                                        │           │
//!                   Interpolator ←───────┤           ├→ materialize → JSON
//!                   Registry (types) ←───┤           └→ Editor → point edits
//!                   Importer ←───────────┘
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: Same lines always produce an identical document
//! - **Ordered**: Elements keep the order they were declared in
//! - **Located**: Every error carries the line it was raised on
//! - **Bounded**: Import nesting is capped by [`Config::max_import_depth`]

pub mod accumulate;
pub mod config;
pub mod document;
pub mod edit;
pub mod engine;
pub mod error;
pub mod expr;
pub mod import;
pub mod indent;
pub mod index;
pub mod inherit;
pub mod interpolate;
pub mod limiter;
pub mod materialize;
pub mod scope;
pub mod syntax;
pub mod types;
pub mod value;
pub mod visibility;

pub use config::Config;
pub use document::{Document, Element, ElementKind, Entry, Provenance, Variable};
pub use edit::{Edit, Editor};
pub use engine::Engine;
pub use error::{Error, Result};
pub use import::{ImportFormat, ImportRequest, ImportedRecord, Importer, MemoryImporter};
pub use scope::ScopePath;
pub use value::{Byte, ByteFormat, Number, Value};
pub use visibility::Visibility;

/// Version of the engine crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse lines with the default configuration and no importer
pub fn parse<I, S>(lines: I) -> Result<Document>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Engine::new(Config::default()).parse(lines)
}

/// Parse text with the default configuration and no importer
pub fn parse_str(text: &str) -> Result<Document> {
    parse(split_lines(text))
}

/// Split on `\n`, dropping a trailing `\r` from each line
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}
