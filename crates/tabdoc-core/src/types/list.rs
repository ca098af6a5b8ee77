//! List tokens
//!
//! Single left-to-right scan with a stack of partially built lists.
//! A backslash makes the next character literal; brackets and commas inside
//! double quotes are literal too, so quoted strings survive a render/parse
//! round trip.

use crate::{Error, Result};

/// Structure of a list token before its leaves are converted
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Leaf(String),
    List(Vec<Item>),
}

/// `[` … `]` after trimming
pub fn is_list(token: &str) -> bool {
    let token = token.trim();
    token.len() >= 2 && token.starts_with('[') && token.ends_with(']')
}

/// Structural brackets `(opens, closes)` in `text`
pub fn bracket_counts(text: &str) -> (usize, usize) {
    let mut opens = 0;
    let mut closes = 0;
    let mut escaped = false;
    let mut quoted = false;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            '[' if !quoted => opens += 1,
            ']' if !quoted => closes += 1,
            _ => {}
        }
    }
    (opens, closes)
}

/// Starts a list that is not closed on the same line
pub fn is_unbalanced(token: &str) -> bool {
    let (opens, closes) = bracket_counts(token);
    token.trim_start().starts_with('[') && opens > closes
}

/// Split a list token into its nested items
pub fn scan(token: &str) -> Result<Vec<Item>> {
    let malformed = || Error::conversion("List", token);
    let mut stack: Vec<Vec<Item>> = vec![Vec::new()];
    let mut current = String::new();
    let mut escaped = false;
    let mut quoted = false;

    fn flush(current: &mut String, top: &mut Vec<Item>) {
        let leaf = current.trim();
        if !leaf.is_empty() {
            top.push(Item::Leaf(leaf.to_string()));
        }
        current.clear();
    }

    for ch in token.trim().chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            _ if quoted => current.push(ch),
            '[' => {
                let top = stack.last_mut().ok_or_else(malformed)?;
                flush(&mut current, top);
                stack.push(Vec::new());
            }
            ']' => {
                let mut finished = stack.pop().ok_or_else(malformed)?;
                flush(&mut current, &mut finished);
                let top = stack.last_mut().ok_or_else(malformed)?;
                top.push(Item::List(finished));
            }
            ',' => {
                let top = stack.last_mut().ok_or_else(malformed)?;
                flush(&mut current, top);
            }
            _ => current.push(ch),
        }
    }

    if stack.len() != 1 || quoted {
        return Err(malformed());
    }
    let mut root = stack.pop().ok_or_else(malformed)?;
    flush(&mut current, &mut root);

    // "[a, b]" nests once; "[a], [b]" is a bare sequence of lists
    match root.as_slice() {
        [Item::List(_)] => match root.pop() {
            Some(Item::List(items)) => Ok(items),
            _ => Err(malformed()),
        },
        _ => Ok(root),
    }
}
