//! Interpolation of `{…}` placeholders
//!
//! # Resolution
//!
//! For each non-escaped `{…}` span (innermost first):
//!
//! 1. Content that evaluates as arithmetic is replaced by the result.
//! 2. Otherwise the content is a dotted reference, optionally followed by
//!    index groups (`{list[0]}`) and optionally rebased with a `.self.`
//!    prefix onto the caller's scope.
//! 3. The referenced variable must exist and its visibility must `fit` the
//!    referencing scope.
//!
//! Strings are inserted quoted unless the placeholder already sits inside a
//! quoted region. Lists of two or more elements lose their outer brackets,
//! so `[{list}]` does not double-wrap. Re-scans until no placeholder is left,
//! bounded by the number of `{` in the input.

use crate::document::Document;
use crate::expr::Evaluator;
use crate::index;
use crate::scope::ScopePath;
use crate::value::{escape_quotes, Number, Value};
use crate::visibility;
use crate::{Error, Result};

const SELF_PREFIX: &str = ".self";

/// What a placeholder is replaced with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The referenced value
    Value,
    /// The referenced element's datatype name
    Datatype,
}

/// Byte offsets of `{` and `}` for every innermost non-empty span
fn spans(text: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut open: Option<usize> = None;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => open = Some(i),
            '}' => {
                if let Some(start) = open.take() {
                    if i > start + 1 {
                        found.push((start, i));
                    }
                }
            }
            _ => {}
        }
    }
    found
}

pub fn has_placeholder(text: &str) -> bool {
    !spans(text).is_empty()
}

/// Whether byte offset `at` falls inside a double-quoted region
fn inside_quotes(text: &str, at: usize) -> bool {
    let mut quoted = false;
    let mut escaped = false;
    for ch in text[..at].chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            _ => {}
        }
    }
    quoted
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "\\{").replace('}', "\\}")
}

/// Resolve a reference path, honoring the `.self` prefix
fn rebase(reference: &str, base: &ScopePath) -> ScopePath {
    match reference.strip_prefix(SELF_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('.') => {
            base.join(&ScopePath::parse(rest))
        }
        _ => ScopePath::parse(reference),
    }
}

/// Text a value takes when substituted
fn render(value: &Value, quoted: bool) -> String {
    let text = match value {
        Value::String(s) if quoted => escape_quotes(s),
        Value::String(s) => format!("\"{}\"", escape_quotes(s)),
        Value::List(items) => {
            let text = value.to_string();
            if items.len() >= 2 {
                text[1..text.len() - 1].to_string()
            } else {
                text
            }
        }
        other => other.to_string(),
    };
    escape_braces(&text)
}

/// Placeholder resolver over an in-progress document
pub struct Interpolator<'a> {
    document: &'a Document,
    evaluator: &'a dyn Evaluator,
}

impl<'a> Interpolator<'a> {
    pub fn new(document: &'a Document, evaluator: &'a dyn Evaluator) -> Self {
        Interpolator {
            document,
            evaluator,
        }
    }

    /// Replace every placeholder in `input`, referencing from `base`
    pub fn resolve(&self, input: &str, base: &ScopePath, mode: Mode) -> Result<String> {
        let passes = input.matches('{').count() + 1;
        let mut text = input.to_string();
        for _ in 0..passes {
            let found = spans(&text);
            if found.is_empty() {
                break;
            }
            let mut out = String::with_capacity(text.len());
            let mut last = 0;
            for (start, end) in found {
                out.push_str(&text[last..start]);
                let quoted = inside_quotes(&text, start);
                out.push_str(&self.substitute(&text[start + 1..end], base, mode, quoted)?);
                last = end + 1;
            }
            out.push_str(&text[last..]);
            text = out;
        }
        Ok(text)
    }

    fn substitute(&self, content: &str, base: &ScopePath, mode: Mode, quoted: bool) -> Result<String> {
        let content = content.trim();
        if mode == Mode::Value {
            if let Ok(result) = self.evaluator.evaluate(content) {
                return Ok(Number::from_f64(result).to_string());
            }
        }

        let reference: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let (path_text, groups) = match reference.find('[') {
            Some(at) => (&reference[..at], Some(&reference[at..])),
            None => (reference.as_str(), None),
        };
        let path = rebase(path_text, base);
        let variable = self
            .document
            .variable(&path)
            .ok_or_else(|| Error::InterpolationPathNotFound(path.to_string()))?;
        if !visibility::fit(variable.visibility, &path, base, true) {
            return Err(Error::VariableInterpolation(path.to_string()));
        }
        tracing::trace!(reference = %path, from = %base, "placeholder resolved");

        match mode {
            Mode::Datatype => match groups {
                Some(groups) => Err(Error::InvalidIndex(groups.to_string())),
                None => Ok(variable.datatype.clone()),
            },
            Mode::Value => {
                let value = match groups {
                    Some(groups) => index::apply(&variable.value, &index::parse_groups(groups)?)?,
                    None => variable.value.clone(),
                };
                Ok(render(&value, quoted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Arithmetic;
    use crate::parse_str;

    fn resolve(source: &str, input: &str, base: &str) -> Result<String> {
        let doc = parse_str(source).unwrap();
        Interpolator::new(&doc, &Arithmetic).resolve(input, &ScopePath::parse(base), Mode::Value)
    }

    // ── Spans ─────────────────────────────────────────────

    #[test]
    fn test_spans_skip_escaped_and_empty() {
        assert_eq!(spans("a {b} c"), vec![(2, 4)]);
        assert_eq!(spans(r"\{b} {}"), vec![]);
        assert_eq!(spans("{{x}}"), vec![(1, 3)]);
        assert!(!has_placeholder("plain"));
    }

    // ── Values ────────────────────────────────────────────

    #[test]
    fn test_arithmetic_shortcut() {
        assert_eq!(resolve("x = 1", "{2 * 3}", "").unwrap(), "6");
        assert_eq!(resolve("x = 1", "{7 / 2}", "").unwrap(), "3.5");
    }

    #[test]
    fn test_string_quoting() {
        let source = "a = \"hi\"";
        assert_eq!(resolve(source, "{a}", "").unwrap(), "\"hi\"");
        assert_eq!(resolve(source, "\"say {a}!\"", "").unwrap(), "\"say hi!\"");
    }

    #[test]
    fn test_list_bracket_stripping() {
        let source = "one = [1]\ntwo = [1, [2, 3]]";
        assert_eq!(resolve(source, "{one}", "").unwrap(), "[1]");
        assert_eq!(resolve(source, "{two}", "").unwrap(), "1, [2, 3]");
        assert_eq!(resolve(source, "[{two}]", "").unwrap(), "[1, [2, 3]]");
    }

    #[test]
    fn test_indexing() {
        let source = "m = [[1, 2], [3, 4]]\ns = \"hello\"";
        assert_eq!(resolve(source, "{m[1][0]}", "").unwrap(), "3");
        assert_eq!(resolve(source, "{m[0]}", "").unwrap(), "1, 2");
        assert_eq!(resolve(source, "{s[1:3]}", "").unwrap(), "\"el\"");
        assert_eq!(
            resolve(source, "{s[0][0]}", ""),
            Err(Error::MultidimensionalIndexingWithString)
        );
    }

    #[test]
    fn test_self_prefix() {
        let source = "server\n\tport = 80";
        assert_eq!(resolve(source, "{.self.port}", "server").unwrap(), "80");
        assert_eq!(resolve(source, "{server.port}", "").unwrap(), "80");
    }

    #[test]
    fn test_nested_placeholders() {
        let source = "n = 1\nlist = [10, 20]";
        assert_eq!(resolve(source, "{list[{n}]}", "").unwrap(), "20");
    }

    // ── Failures ──────────────────────────────────────────

    #[test]
    fn test_missing_path() {
        assert_eq!(
            resolve("x = 1", "{y}", ""),
            Err(Error::InterpolationPathNotFound("y".into()))
        );
    }

    #[test]
    fn test_visibility_denied() {
        assert_eq!(
            resolve("private a = 1", "{a}", ""),
            Err(Error::VariableInterpolation("a".into()))
        );
        assert_eq!(resolve("restricted a = 1", "{a}", "").unwrap(), "1");
        assert_eq!(
            resolve("server\n\trestricted a = 1", "{server.a}", "client"),
            Err(Error::VariableInterpolation("server.a".into()))
        );
    }

    #[test]
    fn test_datatype_mode() {
        let doc = parse_str("h ? byte as hex = 255\nx = 1").unwrap();
        let interp = Interpolator::new(&doc, &Arithmetic);
        let root = ScopePath::root();
        assert_eq!(interp.resolve("{h}", &root, Mode::Datatype).unwrap(), "Byte as Hex");
        assert_eq!(interp.resolve("{x}", &root, Mode::Datatype).unwrap(), "Number");
    }
}
