//! Index groups on interpolated references: `[i]`, `[a:b]`, `[a:]`, `[:b]`,
//! `[:]`, chained as `[0][1]`. Negative positions count from the end and
//! slices exclude their end.

use crate::value::Value;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Single(i64),
    Slice(Option<i64>, Option<i64>),
}

fn parse_bound(text: &str, groups: &str) -> Result<Option<i64>> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::InvalidIndex(groups.to_string()))
}

/// Parse one or more bracketed groups
pub fn parse_groups(groups: &str) -> Result<Vec<Index>> {
    let invalid = || Error::InvalidIndex(groups.to_string());
    let mut indexes = Vec::new();
    let mut rest = groups.trim();
    if rest.is_empty() {
        return Err(invalid());
    }
    while !rest.is_empty() {
        let inner_start = rest.strip_prefix('[').ok_or_else(invalid)?;
        let close = inner_start.find(']').ok_or_else(invalid)?;
        let inner = inner_start[..close].trim();
        rest = inner_start[close + 1..].trim_start();

        let index = match inner.split_once(':') {
            Some((start, end)) => Index::Slice(
                parse_bound(start.trim(), groups)?,
                parse_bound(end.trim(), groups)?,
            ),
            None => Index::Single(parse_bound(inner, groups)?.ok_or_else(invalid)?),
        };
        indexes.push(index);
    }
    Ok(indexes)
}

/// Resolve a possibly negative position against `len`
fn position(index: i64, len: usize, label: &str) -> Result<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved as usize > len {
        return Err(Error::IndexOutOfRange(label.to_string()));
    }
    Ok(resolved as usize)
}

fn bounds(start: Option<i64>, end: Option<i64>, len: usize, label: &str) -> Result<(usize, usize)> {
    let start = start.map_or(Ok(0), |s| position(s, len, label))?;
    let end = end.map_or(Ok(len), |e| position(e, len, label))?;
    Ok((start, end.max(start)))
}

fn label(index: &Index) -> String {
    match index {
        Index::Single(i) => i.to_string(),
        Index::Slice(a, b) => format!(
            "{}:{}",
            a.map(|v| v.to_string()).unwrap_or_default(),
            b.map(|v| v.to_string()).unwrap_or_default()
        ),
    }
}

fn apply_one(value: &Value, index: &Index) -> Result<Value> {
    let label = label(index);
    match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            match *index {
                Index::Single(i) => {
                    let at = position(i, chars.len(), &label)?;
                    chars
                        .get(at)
                        .map(|c| Value::String(c.to_string()))
                        .ok_or(Error::IndexOutOfRange(label))
                }
                Index::Slice(a, b) => {
                    let (start, end) = bounds(a, b, chars.len(), &label)?;
                    Ok(Value::String(chars[start..end].iter().collect()))
                }
            }
        }
        Value::List(items) => match *index {
            Index::Single(i) => {
                let at = position(i, items.len(), &label)?;
                items.get(at).cloned().ok_or(Error::IndexOutOfRange(label))
            }
            Index::Slice(a, b) => {
                let (start, end) = bounds(a, b, items.len(), &label)?;
                Ok(Value::List(items[start..end].to_vec()))
            }
        },
        other => Err(Error::InvalidIndexingTarget(other.kind().name().to_string())),
    }
}

/// Apply index groups left to right
pub fn apply(value: &Value, indexes: &[Index]) -> Result<Value> {
    if matches!(value, Value::String(_)) && indexes.len() > 1 {
        return Err(Error::MultidimensionalIndexingWithString);
    }
    let mut current = value.clone();
    for index in indexes {
        current = apply_one(&current, index)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    fn int(i: i64) -> Value {
        Value::Number(Number::Int(i))
    }

    fn sample() -> Value {
        Value::List(vec![int(1), Value::List(vec![int(2), int(3)]), int(4)])
    }

    #[test]
    fn test_parse_groups() {
        assert_eq!(parse_groups("[0]").unwrap(), vec![Index::Single(0)]);
        assert_eq!(
            parse_groups("[1:][ :-1][:]").unwrap(),
            vec![
                Index::Slice(Some(1), None),
                Index::Slice(None, Some(-1)),
                Index::Slice(None, None)
            ]
        );
        for bad in ["", "[]", "[a]", "[1", "0]", "[1]x", "[1:2:3]"] {
            assert!(matches!(parse_groups(bad), Err(Error::InvalidIndex(_))), "{:?}", bad);
        }
    }

    #[test]
    fn test_list_indexing() {
        let list = sample();
        assert_eq!(apply(&list, &[Index::Single(0)]).unwrap(), int(1));
        assert_eq!(apply(&list, &[Index::Single(-1)]).unwrap(), int(4));
        assert_eq!(apply(&list, &[Index::Single(1), Index::Single(0)]).unwrap(), int(2));
        assert_eq!(
            apply(&list, &[Index::Slice(Some(1), None)]).unwrap(),
            Value::List(vec![Value::List(vec![int(2), int(3)]), int(4)])
        );
        assert!(matches!(
            apply(&list, &[Index::Single(3)]),
            Err(Error::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn test_string_indexing() {
        let s = Value::String("hello".into());
        assert_eq!(apply(&s, &[Index::Single(1)]).unwrap(), Value::String("e".into()));
        assert_eq!(
            apply(&s, &[Index::Slice(Some(1), Some(-1))]).unwrap(),
            Value::String("ell".into())
        );
        assert_eq!(
            apply(&s, &[Index::Slice(Some(3), Some(1))]).unwrap(),
            Value::String(String::new())
        );
        assert_eq!(
            apply(&s, &[Index::Single(0), Index::Single(0)]),
            Err(Error::MultidimensionalIndexingWithString)
        );
    }

    #[test]
    fn test_invalid_target() {
        assert_eq!(
            apply(&int(5), &[Index::Single(0)]),
            Err(Error::InvalidIndexingTarget("Number".into()))
        );
    }
}
