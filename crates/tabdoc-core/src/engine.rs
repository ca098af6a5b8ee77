//! Document engine: one pass over the lines of a document
//!
//! The engine owns every piece of per-parse state: the current scope, the
//! in-progress document, the inheritance and limiter maps, the block comment
//! flag and any list being accumulated. One engine parses one document;
//! imports run in their own nested engine.
//!
//! # Per line
//!
//! 1. Drop comments and blank lines.
//! 2. While a multi-line list is open, feed it and nothing else.
//! 3. Pop the scope by the indentation delta against the previous line.
//!    A class line is only committed once the next line turns out deeper;
//!    otherwise it is dropped, leaving no entry, datatype or limit behind.
//! 4. Classify and dispatch: import, classbox, class, variable.
//!
//! Any error aborts the parse and carries the 1-based line number.

use crate::accumulate::{ListAccumulator, PendingVariable};
use crate::config::Config;
use crate::document::{ClassOpen, Classbox, Document, Element, Entry, Provenance, Variable};
use crate::expr::{Arithmetic, Evaluator};
use crate::import::{ImportFormat, ImportRequest, Importer, NoImporter};
use crate::indent;
use crate::inherit::{self, InheritanceMap};
use crate::interpolate::{self, Interpolator, Mode};
use crate::limiter::ElementLimiter;
use crate::scope::ScopePath;
use crate::syntax::comment::CommentFilter;
use crate::syntax::{self, ClassLine, ClassboxLine, ImportLine, Line, VariableLine};
use crate::types::{list, Datatype, Registry};
use crate::value::Value;
use crate::visibility::Visibility;
use crate::{Error, Result};

/// Datatype of a variable with no declared or inherited datatype
const DEFAULT_DATATYPE: &str = "auto";

/// A class line waiting for its first child
struct PendingClass {
    indent: usize,
    scope: ScopePath,
    entry: Entry,
    datatype: Option<String>,
    max: Option<usize>,
    number: usize,
}

pub struct Engine {
    config: Config,
    evaluator: Box<dyn Evaluator>,
    importer: Box<dyn Importer>,
    depth: usize,

    scope: ScopePath,
    document: Document,
    inheritance: InheritanceMap,
    limiter: ElementLimiter,
    comments: CommentFilter,
    list: Option<ListAccumulator>,
    previous_indent: usize,
    previous_raw: Option<String>,
    open_class: Option<PendingClass>,
}

/// Validate a class/classbox datatype token. Placeholders are resolved per
/// variable, when the scope is used.
fn check_datatype(token: &str) -> Result<()> {
    if inherit::is_unset(token) || interpolate::has_placeholder(token) {
        return Ok(());
    }
    Datatype::parse(token)
        .map(|_| ())
        .map_err(|_| Error::DataTypeNotFound(token.trim().to_string()))
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let comments = CommentFilter::new(&config);
        Engine {
            config,
            evaluator: Box::new(Arithmetic),
            importer: Box::new(NoImporter),
            depth: 0,
            scope: ScopePath::root(),
            document: Document::new(),
            inheritance: InheritanceMap::new(),
            limiter: ElementLimiter::new(),
            comments,
            list: None,
            previous_indent: 0,
            previous_raw: None,
            open_class: None,
        }
    }

    pub fn with_importer(mut self, importer: Box<dyn Importer>) -> Self {
        self.importer = importer;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Import nesting depth of this engine (0 for the top-level document)
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Parse an ordered sequence of raw lines
    pub fn parse<I, S>(mut self, lines: I) -> Result<Document>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, raw) in lines.into_iter().enumerate() {
            let number = i + 1;
            self.feed(number, raw.as_ref())
                .map_err(|e| e.at_line(number))?;
        }
        self.finish()
    }

    /// Parse text, splitting on newlines
    pub fn parse_str(self, text: &str) -> Result<Document> {
        self.parse(crate::split_lines(text))
    }

    fn finish(self) -> Result<Document> {
        if let Some(list) = self.list {
            let pending = list.pending();
            return Err(Error::Failed(format!("unterminated list '{}'", pending.name))
                .at_line(pending.provenance.number));
        }
        if self.document.is_empty() {
            return Err(Error::Failed("document is empty".into()));
        }
        tracing::debug!(elements = self.document.len(), "document parsed");
        Ok(self.document)
    }

    // ── Line dispatch ─────────────────────────────────────

    fn feed(&mut self, number: usize, raw: &str) -> Result<()> {
        let Some(line) = self.comments.filter(raw) else {
            return Ok(());
        };
        if self.list.is_some() {
            return self.continue_list(&line);
        }

        let indent = indent::tab_count(&line);
        self.adjust_scope(indent)?;

        let provenance = Provenance {
            line: line.clone(),
            raw: raw.to_string(),
            previous: self.previous_raw.clone(),
            number,
        };
        let result = match syntax::classify(&line)? {
            Line::Import(import) => self.handle_import(&import),
            Line::Classbox(classbox) => self.handle_classbox(classbox, provenance),
            Line::Class(class) => self.handle_class(class, indent, provenance),
            Line::Variable(variable) => self.handle_variable(variable, provenance),
            Line::Inert => {
                tracing::trace!(number, "inert line");
                Ok(())
            }
        };
        self.previous_indent = indent;
        self.previous_raw = Some(raw.to_string());
        result
    }

    fn adjust_scope(&mut self, indent: usize) -> Result<()> {
        if let Some(class) = self.open_class.take() {
            if indent > class.indent {
                let number = class.number;
                self.commit_class(class).map_err(|e| e.at_line(number))?;
            } else {
                tracing::debug!(scope = %class.scope, "class dropped without children");
                self.scope.backward(1);
            }
        }
        let delta = indent::delta(self.previous_indent, indent);
        if delta > 0 {
            self.scope.backward(delta as usize);
            tracing::debug!(scope = %self.scope, popped = delta, "scope popped");
        }
        Ok(())
    }

    fn interpolator(&self) -> Interpolator<'_> {
        Interpolator::new(&self.document, self.evaluator.as_ref())
    }

    /// Interpolate and parse an arity suffix
    fn arity(&self, max: &str) -> Result<usize> {
        let text = self.interpolator().resolve(max, &self.scope, Mode::Value)?;
        let text = text.trim();
        text.parse::<usize>()
            .map_err(|_| Error::Conversion {
                kind: "arity".into(),
                value: text.to_string(),
            })
    }

    /// Validate and register a class/classbox datatype for inheritance
    fn register_datatype(&mut self, scope: &ScopePath, token: &str) -> Result<()> {
        if inherit::is_unset(token) {
            self.inheritance.unset(scope);
            return Ok(());
        }
        check_datatype(token)?;
        self.inheritance.register(scope, token);
        Ok(())
    }

    // ── Handlers ──────────────────────────────────────────

    /// Validate a class line and hold it until its first child shows up
    fn handle_class(&mut self, class: ClassLine, indent: usize, provenance: Provenance) -> Result<()> {
        if let Some(datatype) = &class.datatype {
            check_datatype(datatype)?;
        }
        self.scope.forward(&class.name);
        let max = class.max.as_deref().map(|max| self.arity(max)).transpose()?;
        tracing::debug!(scope = %self.scope, "class opened");

        self.open_class = Some(PendingClass {
            indent,
            scope: self.scope.clone(),
            number: provenance.number,
            datatype: class.datatype.clone(),
            max,
            entry: Entry {
                element: Element::Class(ClassOpen {
                    name: class.name,
                    datatype: class.datatype,
                    max_elements: class.max,
                }),
                provenance: Some(provenance),
            },
        });
        Ok(())
    }

    fn commit_class(&mut self, class: PendingClass) -> Result<()> {
        self.document.insert(class.scope.clone(), class.entry)?;
        if let Some(datatype) = &class.datatype {
            self.register_datatype(&class.scope, datatype)?;
        }
        if let Some(max) = class.max {
            self.limiter.install(&class.scope, max);
        }
        tracing::debug!(scope = %class.scope, "class committed");
        Ok(())
    }

    fn handle_classbox(&mut self, classbox: ClassboxLine, provenance: Provenance) -> Result<()> {
        let scope = self.scope.clone();
        tracing::debug!(scope = %scope, datatype = ?classbox.datatype, "classbox");
        if let Some(datatype) = &classbox.datatype {
            self.register_datatype(&scope, datatype)?;
        }
        if let Some(max) = &classbox.max {
            let max = self.arity(max)?;
            self.limiter.install(&scope, max);
        }
        self.document.insert_classbox(
            scope,
            Entry {
                element: Element::Classbox(Classbox {
                    datatype: classbox.datatype,
                    max_elements: classbox.max,
                }),
                provenance: Some(provenance),
            },
        );
        Ok(())
    }

    fn handle_variable(&mut self, variable: VariableLine, provenance: Provenance) -> Result<()> {
        let (token, inherited) = match &variable.datatype {
            Some(declared) => (declared.clone(), false),
            None => match self.inheritance.resolve(&self.scope) {
                Some(inherited) => (inherited.to_string(), true),
                None => (DEFAULT_DATATYPE.to_string(), false),
            },
        };

        let (value, token) = {
            let interpolator = self.interpolator();
            let value = interpolator.resolve(&variable.value, &self.scope, Mode::Value)?;
            let token = interpolator.resolve(&token, &self.scope, Mode::Datatype)?;
            (value, token)
        };
        let datatype = Datatype::parse(&token).map_err(|e| {
            if inherited {
                Error::DataTypeNotFound(token.trim().to_string())
            } else {
                e
            }
        })?;

        let pending = PendingVariable {
            name: variable.name,
            visibility: variable.visibility,
            declared_datatype: variable.datatype,
            datatype,
            provenance,
        };

        if pending.datatype.accepts_list() && list::is_unbalanced(&value) {
            tracing::debug!(name = %pending.name, "multi-line list started");
            self.list = Some(ListAccumulator::start(&variable.value, pending));
            return Ok(());
        }

        let converted = Registry::new(self.evaluator.as_ref()).convert_as(&pending.datatype, &value)?;
        self.insert_variable(pending, converted)
    }

    fn continue_list(&mut self, line: &str) -> Result<()> {
        let complete = match self.list.as_mut() {
            Some(list) => list.feed(line),
            None => return Ok(()),
        };
        if !complete {
            return Ok(());
        }
        let Some(list) = self.list.take() else {
            return Ok(());
        };
        let (buffer, pending) = list.finish();
        tracing::debug!(name = %pending.name, "multi-line list completed");

        let value = self.interpolator().resolve(&buffer, &self.scope, Mode::Value)?;
        let datatype = Datatype::List(pending.datatype.element_filter());
        let converted = Registry::new(self.evaluator.as_ref()).convert_as(&datatype, &value)?;
        self.insert_variable(pending, converted)
    }

    fn insert_variable(&mut self, pending: PendingVariable, value: Value) -> Result<()> {
        if !self.limiter.allowed(&self.scope) {
            return Err(Error::NotAllowed(self.scope.to_string()));
        }
        let path = self.scope.temp_forward(&pending.name);
        let value = match value {
            Value::String(s) => Value::String(syntax::unescape(&s)),
            other => other,
        };
        let datatype = match &pending.datatype {
            Datatype::Auto(_) => value.kind().name().to_string(),
            other => other.name(),
        };
        tracing::debug!(path = %path, datatype = %datatype, "variable");

        self.document.insert(
            path,
            Entry {
                element: Element::Variable(Variable {
                    name: pending.name,
                    visibility: pending.visibility,
                    declared_datatype: pending.declared_datatype,
                    datatype,
                    value,
                }),
                provenance: Some(pending.provenance),
            },
        )?;
        self.limiter.consume(&self.scope);
        Ok(())
    }

    fn handle_import(&mut self, import: &ImportLine) -> Result<()> {
        let alias = match &import.alias {
            Some(alias) => alias.clone(),
            None => std::path::Path::new(&import.target)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        syntax::check_alias(&alias)?;

        let depth = self.depth + 1;
        if depth > self.config.max_import_depth {
            return Err(Error::ImportDepth(self.config.max_import_depth));
        }
        let request = ImportRequest {
            target: import.target.clone(),
            format: ImportFormat::infer(&import.target),
            depth,
        };
        let records = self.importer.import(&request).map_err(|e| Error::Import {
            target: import.target.clone(),
            source: Box::new(e),
        })?;

        let prefix = self.scope.temp_forward(&alias);
        let count = records.len();
        for record in records {
            let path = prefix.join(&record.path);
            let visibility = if import.public {
                record.visibility
            } else {
                Visibility::Protected
            };
            let name = path.last().unwrap_or(alias.as_str()).to_string();
            self.document.insert(
                path,
                Entry {
                    element: Element::Variable(Variable {
                        name,
                        visibility,
                        declared_datatype: None,
                        datatype: record.datatype,
                        value: record.value,
                    }),
                    provenance: None,
                },
            )?;
        }
        tracing::debug!(target = %import.target, alias = %alias, count, "import merged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;
    use crate::value::{Number, Byte, ByteFormat};
    use pretty_assertions::assert_eq;

    fn value(doc: &Document, path: &str) -> Value {
        doc.variable(&ScopePath::parse(path))
            .unwrap_or_else(|| panic!("missing {}", path))
            .value
            .clone()
    }

    fn int(i: i64) -> Value {
        Value::Number(Number::Int(i))
    }

    // ── Scenarios ─────────────────────────────────────────

    #[test]
    fn test_single_number() {
        let doc = parse_str("x = 5").unwrap();
        assert_eq!(doc.len(), 1);
        let x = doc.variable(&ScopePath::parse("x")).unwrap();
        assert_eq!(x.value, int(5));
        assert_eq!(x.visibility, Visibility::Public);
        assert_eq!(x.datatype, "Number");
    }

    #[test]
    fn test_inherited_byte_as_hex() {
        let doc = parse_str("Byte_as_Hex ? Byte as Hex\n\tval = 255").unwrap();
        let val = value(&doc, "Byte_as_Hex.val");
        assert_eq!(
            val,
            Value::Byte(Byte {
                count: 255,
                format: ByteFormat::Hex
            })
        );
        assert_eq!(val.to_string(), "0xff");
    }

    #[test]
    fn test_nested_list() {
        let doc = parse_str("list = [1, 2, [3, 4]]").unwrap();
        assert_eq!(
            value(&doc, "list"),
            Value::List(vec![int(1), int(2), Value::List(vec![int(3), int(4)])])
        );
    }

    #[test]
    fn test_string_interpolation_and_private_denial() {
        let doc = parse_str("a = \"hi\"\nb = {a}").unwrap();
        assert_eq!(value(&doc, "b"), Value::String("hi".into()));

        let err = parse_str("private a = \"hi\"\nb = {a}").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.root(), &Error::VariableInterpolation("a".into()));
    }

    #[test]
    fn test_classbox_limit() {
        let err = parse_str("? -> 1\na = 1\nb = 2").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.root(), &Error::NotAllowed(String::new()));
    }

    #[test]
    fn test_unterminated_list() {
        let err = parse_str("x = 1\nports = [1,\n2,\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(err.root(), Error::Failed(_)));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(
            parse_str("# only a comment\n\n").unwrap_err(),
            Error::Failed("document is empty".into())
        );
    }

    // ── Scopes ────────────────────────────────────────────

    #[test]
    fn test_nested_scopes_and_dedent() {
        let source = "\
server
\thost = \"a\"
\tdb
\t\tport = 5432
\tname = \"s\"
top = 1
";
        let doc = parse_str(source).unwrap();
        let paths: Vec<String> = doc.variables().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["server.host", "server.db.port", "server.name", "top"]);
    }

    #[test]
    fn test_childless_class_closed() {
        let doc = parse_str("empty\nx = 1\nouter\n\tinner\n\ty = 2\n").unwrap();
        assert!(doc.variable(&ScopePath::parse("x")).is_some());
        assert!(doc.variable(&ScopePath::parse("outer.y")).is_some());
        assert!(doc.get(&ScopePath::parse("outer")).is_some());
        assert!(doc.get(&ScopePath::parse("outer.inner")).is_none());
        assert!(doc.get(&ScopePath::parse("empty")).is_none());
    }

    #[test]
    fn test_childless_class_frees_its_name() {
        let doc = parse_str("x\ny = 1\nx = 2\n").unwrap();
        assert_eq!(value(&doc, "x"), int(2));
        assert_eq!(value(&doc, "y"), int(1));
    }

    #[test]
    fn test_childless_class_registers_nothing() {
        let doc = parse_str("s ? string -> 0\ns\n\tv = 1\n").unwrap();
        assert_eq!(value(&doc, "s.v"), int(1));
        assert_eq!(doc.get(&ScopePath::parse("s")).unwrap().provenance.as_ref().map(|p| p.number), Some(2));
    }

    #[test]
    fn test_class_collision_reported_on_class_line() {
        let err = parse_str("a = 1\na\n\tb = 2\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.root(), &Error::DuplicatePath("a".into()));
    }

    #[test]
    fn test_class_reopen_and_duplicate_variable() {
        let doc = parse_str("a\n\tx = 1\na\n\ty = 2\n").unwrap();
        assert_eq!(value(&doc, "a.y"), int(2));
        let err = parse_str("x = 1\nx = 2\n").unwrap_err();
        assert_eq!(err.root(), &Error::DuplicatePath("x".into()));
    }

    // ── Datatypes ─────────────────────────────────────────

    #[test]
    fn test_inheritance_and_unset() {
        let source = "\
nums ? number
\ta = 1
\tsub
\t\t? unset
\t\tb = true
";
        let doc = parse_str(source).unwrap();
        assert_eq!(value(&doc, "nums.a"), int(1));
        assert_eq!(value(&doc, "nums.sub.b"), Value::Boolean(true));

        let err = parse_str("nums ? number\n\ta = \"x\"\n").unwrap_err();
        assert!(matches!(err.root(), Error::Conversion { .. }));
    }

    #[test]
    fn test_explicit_datatype_beats_inherited() {
        let doc = parse_str("s ? string\n\tn ? number = 3\n").unwrap();
        assert_eq!(value(&doc, "s.n"), int(3));
    }

    #[test]
    fn test_unknown_datatypes() {
        let err = parse_str("x ? integer = 1").unwrap_err();
        assert_eq!(err.root(), &Error::InvalidDataType("integer".into()));
        let err = parse_str("c ? integer\n\tx = 1").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.root(), &Error::DataTypeNotFound("integer".into()));
    }

    #[test]
    fn test_datatype_interpolation() {
        let doc = parse_str("h ? byte as hex = 16\nv ? {h} = 255").unwrap();
        assert_eq!(value(&doc, "v").to_string(), "0xff");
        let v = doc.variable(&ScopePath::parse("v")).unwrap();
        assert_eq!(v.declared_datatype.as_deref(), Some("{h}"));
        assert_eq!(v.datatype, "Byte as Hex");
    }

    #[test]
    fn test_auto_qualifiers() {
        let doc = parse_str("a ? auto(not number) = 1\nb ? auto(string, number) = 2").unwrap();
        assert_eq!(value(&doc, "a"), Value::Boolean(true));
        assert_eq!(value(&doc, "b"), int(2));
    }

    // ── Lists ─────────────────────────────────────────────

    #[test]
    fn test_multiline_list_and_scope_resume() {
        let source = "\
server
\tports = [
\t\t80,
\t\t[443, 8443]
\t]
\tname = \"s\"
top = 1
";
        let doc = parse_str(source).unwrap();
        assert_eq!(
            value(&doc, "server.ports"),
            Value::List(vec![int(80), Value::List(vec![int(443), int(8443)])])
        );
        assert!(doc.variable(&ScopePath::parse("server.name")).is_some());
        assert!(doc.variable(&ScopePath::parse("top")).is_some());
        let ports = doc.get(&ScopePath::parse("server.ports")).unwrap();
        assert_eq!(ports.provenance.as_ref().map(|p| p.number), Some(2));
    }

    #[test]
    fn test_typed_multiline_list() {
        let doc = parse_str("xs ? list(string) = [\n\"a\",\n\"b\"]\n").unwrap();
        assert_eq!(value(&doc, "xs").to_string(), "[\"a\", \"b\"]");
        let err = parse_str("xs ? list(string) = [\n1]\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_list_interpolation_round_trip() {
        let doc = parse_str("a = [1, 2]\nb = [{a}, 3]\nc = [{a}]\none = [7]\nd = {one}\n").unwrap();
        assert_eq!(value(&doc, "b"), Value::List(vec![int(1), int(2), int(3)]));
        assert_eq!(value(&doc, "c"), Value::List(vec![int(1), int(2)]));
        assert_eq!(value(&doc, "d"), Value::List(vec![int(7)]));
    }

    #[test]
    fn test_quoted_string_interpolates_into_list() {
        let source = "a = \"x\\\"y\"\nb = [{a}]\nc = \"<{a}>\"\nd = {a}\n";
        let doc = parse_str(source).unwrap();
        assert_eq!(value(&doc, "a"), Value::String("x\"y".into()));
        assert_eq!(value(&doc, "b"), Value::List(vec![Value::String("x\"y".into())]));
        assert_eq!(value(&doc, "c"), Value::String("<x\"y>".into()));
        assert_eq!(value(&doc, "d"), Value::String("x\"y".into()));
    }

    // ── Limits and escapes ────────────────────────────────

    #[test]
    fn test_class_limit_with_reference() {
        let source = "max = 2\nports -> {max}\n\ta = 1\n\tb = 2\n\tc = 3\n";
        let err = parse_str(source).unwrap_err();
        assert_eq!(err.line(), Some(5));
        assert_eq!(err.root(), &Error::NotAllowed("ports".into()));
    }

    #[test]
    fn test_string_escapes() {
        let doc = parse_str(r#"s = "a \"quoted\" \{brace\} \#tag""#).unwrap();
        assert_eq!(value(&doc, "s"), Value::String(r#"a "quoted" {brace} #tag"#.into()));
    }

    #[test]
    fn test_comments_ignored() {
        let source = "\
# header
a = 1 // trailing
/* block
b = 2
*/
c = \"http://x\"
";
        let doc = parse_str(source).unwrap();
        let paths: Vec<String> = doc.variables().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["a", "c"]);
        assert_eq!(value(&doc, "c"), Value::String("http://x".into()));
    }

    #[test]
    fn test_provenance_recorded() {
        let doc = parse_str("a = 1\n\nb = 2 # two\n").unwrap();
        let b = doc.get(&ScopePath::parse("b")).unwrap();
        let provenance = b.provenance.as_ref().unwrap();
        assert_eq!(provenance.number, 3);
        assert_eq!(provenance.raw, "b = 2 # two");
        assert_eq!(provenance.line, "b = 2");
        assert_eq!(provenance.previous.as_deref(), Some("a = 1"));
    }

    #[test]
    fn test_determinism() {
        let source = "s\n\ta = [1, \"x\"]\n\tb ? byte as unit = 1536\n";
        let first = parse_str(source).unwrap();
        for _ in 0..100 {
            assert_eq!(parse_str(source).unwrap(), first);
        }
    }
}
