//! Import collaborators
//!
//! An import line asks an [`Importer`] for the records of another source and
//! merges them under an alias segment. The core never touches the
//! filesystem: [`MemoryImporter`] serves named in-memory sources, and the
//! CLI ships a filesystem importer.
//!
//! Document sources are parsed by an independent nested [`Engine`] and
//! contribute only their displayable variables. JSON sources are flattened
//! into dotted paths.

use std::collections::HashMap;

use crate::config::Config;
use crate::document::Document;
use crate::engine::Engine;
use crate::scope::ScopePath;
use crate::value::Value;
use crate::visibility::Visibility;
use crate::{Error, Result};

/// Source format, inferred from the target's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Document,
    Json,
}

impl ImportFormat {
    pub fn infer(target: &str) -> Self {
        let is_json = std::path::Path::new(target)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            ImportFormat::Json
        } else {
            ImportFormat::Document
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub target: String,
    pub format: ImportFormat,
    /// Nesting depth the imported source will be parsed at
    pub depth: usize,
}

/// One element contributed by an imported source
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRecord {
    /// Relative to the import alias
    pub path: ScopePath,
    pub visibility: Visibility,
    pub datatype: String,
    pub value: Value,
}

pub trait Importer {
    fn import(&self, request: &ImportRequest) -> Result<Vec<ImportedRecord>>;
}

/// Importer used when none is configured; every target is missing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImporter;

impl Importer for NoImporter {
    fn import(&self, request: &ImportRequest) -> Result<Vec<ImportedRecord>> {
        Err(Error::FileNotFound(request.target.clone()))
    }
}

/// Displayable variables of a parsed document, as import records
pub fn records_from_document(document: &Document) -> Vec<ImportedRecord> {
    document
        .variables()
        .filter(|(_, v)| v.visibility.displayable())
        .map(|(path, v)| ImportedRecord {
            path: path.clone(),
            visibility: v.visibility,
            datatype: v.datatype.clone(),
            value: v.value.clone(),
        })
        .collect()
}

/// Flatten a JSON tree into dotted-path records. Arrays become lists; a
/// scalar root lands under the alias itself.
pub fn flatten_json(json: &serde_json::Value) -> Vec<ImportedRecord> {
    let mut records = Vec::new();
    flatten_into(&ScopePath::root(), json, &mut records);
    records
}

fn flatten_into(prefix: &ScopePath, json: &serde_json::Value, records: &mut Vec<ImportedRecord>) {
    match json {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&prefix.temp_forward(key), child, records);
            }
        }
        scalar => {
            let value = Value::from_json(scalar);
            records.push(ImportedRecord {
                path: prefix.clone(),
                visibility: Visibility::Public,
                datatype: value.kind().name().to_string(),
                value,
            });
        }
    }
}

/// Parse JSON import text
pub fn parse_json_source(target: &str, text: &str) -> Result<Vec<ImportedRecord>> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::Failed(format!("invalid JSON in '{}': {}", target, e)))?;
    Ok(flatten_json(&json))
}

/// Importer over named in-memory sources
#[derive(Debug, Clone, Default)]
pub struct MemoryImporter {
    sources: HashMap<String, String>,
    config: Config,
}

impl MemoryImporter {
    pub fn new(config: Config) -> Self {
        MemoryImporter {
            sources: HashMap::new(),
            config,
        }
    }

    pub fn with_source(mut self, target: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.insert(target.into(), text.into());
        self
    }
}

impl Importer for MemoryImporter {
    fn import(&self, request: &ImportRequest) -> Result<Vec<ImportedRecord>> {
        let text = self
            .sources
            .get(&request.target)
            .ok_or_else(|| Error::FileNotFound(request.target.clone()))?;
        match request.format {
            ImportFormat::Json => parse_json_source(&request.target, text),
            ImportFormat::Document => {
                let document = Engine::new(self.config.clone())
                    .with_importer(Box::new(self.clone()))
                    .with_depth(request.depth)
                    .parse_str(text)?;
                Ok(records_from_document(&document))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;
    use pretty_assertions::assert_eq;

    fn engine(importer: MemoryImporter) -> Engine {
        Engine::new(Config::default()).with_importer(Box::new(importer))
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(ImportFormat::infer("a/b.JSON"), ImportFormat::Json);
        assert_eq!(ImportFormat::infer("a/b.tdoc"), ImportFormat::Document);
        assert_eq!(ImportFormat::infer("noext"), ImportFormat::Document);
    }

    #[test]
    fn test_flatten_json() {
        let json = serde_json::json!({"db": {"host": "h", "ports": [1, 2]}, "on": true});
        let paths: Vec<String> = flatten_json(&json).iter().map(|r| r.path.to_string()).collect();
        assert_eq!(paths, vec!["db.host", "db.ports", "on"]);
        let records = flatten_json(&json);
        assert_eq!(records[1].datatype, "List");
        assert_eq!(records[2].value, Value::Boolean(true));
    }

    #[test]
    fn test_private_import_is_protected() {
        let importer = MemoryImporter::default().with_source("shared.tdoc", "host = \"db\"\n");
        let doc = engine(importer)
            .parse_str("import \"shared.tdoc\" as shared\nurl = \"{shared.host}:5432\"\n")
            .unwrap();
        let host = doc.variable(&ScopePath::parse("shared.host")).unwrap();
        assert_eq!(host.visibility, Visibility::Protected);
        assert_eq!(
            doc.variable(&ScopePath::parse("url")).unwrap().value,
            Value::String("db:5432".into())
        );
        assert_eq!(doc.to_json().unwrap(), serde_json::json!({"url": "db:5432"}));
    }

    #[test]
    fn test_public_import_keeps_visibility_and_hides_protected() {
        let importer = MemoryImporter::default()
            .with_source("lib.tdoc", "a = 1\nprotected b = 2\nprivate c = 3\n");
        let doc = engine(importer)
            .parse_str("publicly import \"lib.tdoc\" as ?\n")
            .unwrap();
        let paths: Vec<String> = doc.variables().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["lib.a", "lib.c"]);
        assert_eq!(
            doc.variable(&ScopePath::parse("lib.c")).unwrap().visibility,
            Visibility::Private
        );
    }

    #[test]
    fn test_json_import_under_scope() {
        let importer = MemoryImporter::default().with_source("cfg.json", r#"{"port": 80}"#);
        let doc = engine(importer)
            .parse_str("server\n\tpublicly import \"cfg.json\" as cfg\n")
            .unwrap();
        assert_eq!(
            doc.variable(&ScopePath::parse("server.cfg.port")).unwrap().value,
            Value::Number(Number::Int(80))
        );
    }

    #[test]
    fn test_missing_target_and_no_importer() {
        let err = engine(MemoryImporter::default())
            .parse_str("import \"nope.tdoc\" as n\n")
            .unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.root(), &Error::FileNotFound("nope.tdoc".into()));

        let err = crate::parse_str("import \"x.tdoc\" as x\n").unwrap_err();
        assert_eq!(err.root(), &Error::FileNotFound("x.tdoc".into()));
    }

    #[test]
    fn test_nested_error_is_wrapped() {
        let importer = MemoryImporter::default().with_source("bad.tdoc", "ok = 1\nx ? integer = 1\n");
        let err = engine(importer).parse_str("import \"bad.tdoc\" as bad\n").unwrap_err();
        match err {
            Error::AtLine { line: 1, source } => match *source {
                Error::Import { target, source } => {
                    assert_eq!(target, "bad.tdoc");
                    assert_eq!(source.line(), Some(2));
                    assert_eq!(source.root(), &Error::InvalidDataType("integer".into()));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_self_import_hits_depth_limit() {
        let config = Config {
            max_import_depth: 3,
            ..Config::default()
        };
        let importer = MemoryImporter::new(config.clone())
            .with_source("loop.tdoc", "import \"loop.tdoc\" as again\n");
        let err = Engine::new(config)
            .with_importer(Box::new(importer))
            .parse_str("import \"loop.tdoc\" as first\n")
            .unwrap_err();
        assert_eq!(err.root(), &Error::ImportDepth(3));
    }

    #[test]
    fn test_alias_rules_enforced() {
        let importer = MemoryImporter::default().with_source("a.tdoc", "x = 1\n");
        let err = engine(importer).parse_str("import \"a.tdoc\" as self\n").unwrap_err();
        assert_eq!(err.root(), &Error::NamingRule("self".into()));
    }
}
