//! Byte quantities
//!
//! A byte token is built from byte atoms (`10 KB`, `0x1f`, `0b1010`) and,
//! optionally, plain numbers, operators and parentheses. At least one byte
//! atom must be present, otherwise the token is a plain Number.
//! Atoms are normalized to raw byte counts before any arithmetic runs.

use crate::expr::Evaluator;
use crate::value::ByteFormat;
use crate::{Error, Result};

/// Unit suffixes, each a power of 1024
pub const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

fn multiplier(power: usize) -> f64 {
    1024f64.powi(power as i32)
}

fn unit_power(text: &str) -> Option<usize> {
    UNITS.iter().position(|u| u.eq_ignore_ascii_case(text))
}

/// Whether `token` has byte shape
pub fn is_byte(token: &str) -> bool {
    normalize(token).is_some_and(|(_, atoms)| atoms > 0)
}

/// Raw byte count of `token`. Plain numbers count as bytes here; only
/// detection requires a byte atom.
pub fn to_count(token: &str, evaluator: &dyn Evaluator) -> Result<u64> {
    let (expression, atoms) =
        normalize(token).ok_or_else(|| Error::conversion("Byte", token))?;
    let value = match expression.parse::<f64>() {
        Ok(v) if atoms <= 1 => v,
        _ => evaluator
            .evaluate(&expression)
            .map_err(|_| Error::conversion("Byte", token))?,
    };
    let rounded = value.round();
    if rounded < 0.0 || rounded > u64::MAX as f64 {
        return Err(Error::conversion("Byte", token));
    }
    Ok(rounded as u64)
}

/// Rewrite every byte atom to its raw count. Returns the rewritten
/// expression and the number of byte atoms, or `None` if the token contains
/// anything that is neither an atom, a number nor an operator.
fn normalize(token: &str) -> Option<(String, usize)> {
    let chars: Vec<char> = token.trim().chars().collect();
    let mut out = String::new();
    let mut atoms = 0;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() || "+-*/%()".contains(ch) {
            out.push(ch);
            i += 1;
            continue;
        }
        if !(ch.is_ascii_digit() || ch == '.') {
            return None;
        }

        // 0x… / 0b… literals
        if ch == '0' && i + 1 < chars.len() {
            let radix = match chars[i + 1] {
                'x' | 'X' => Some(16),
                'b' | 'B' => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                let mut j = i + 2;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let start = j;
                while j < chars.len() && chars[j].is_digit(radix) {
                    j += 1;
                }
                if j > start {
                    let digits: String = chars[start..j].iter().collect();
                    let count = u128::from_str_radix(&digits, radix).ok()?;
                    out.push_str(&count.to_string());
                    atoms += 1;
                    i = j;
                    continue;
                }
                if radix == 16 {
                    return None;
                }
                // "0B" with no binary digits is zero bytes, handled below
            }
        }

        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }
        let number: f64 = chars[start..i].iter().collect::<String>().parse().ok()?;

        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        let unit_start = j;
        while j < chars.len() && chars[j].is_ascii_alphabetic() {
            j += 1;
        }
        if j > unit_start {
            let unit: String = chars[unit_start..j].iter().collect();
            let power = unit_power(&unit)?;
            out.push_str(&format_count(number * multiplier(power)));
            atoms += 1;
            i = j;
        } else {
            out.push_str(&chars[start..i].iter().collect::<String>());
        }
    }

    Some((out, atoms))
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Render a byte count in the requested output format
pub fn render(count: u64, format: ByteFormat) -> String {
    match format {
        ByteFormat::Raw => count.to_string(),
        ByteFormat::Hex => format!("0x{:x}", count),
        ByteFormat::Binary => format!("0b{:b}", count),
        ByteFormat::Unit => render_unit(count),
    }
}

/// Human-readable form: divide by the largest power of 1024 not above the
/// count and print the shortest decimal that round-trips
pub fn render_unit(count: u64) -> String {
    if count == 0 {
        return "0 B".to_string();
    }
    let value = count as f64;
    let power = (0..UNITS.len())
        .rev()
        .find(|p| multiplier(*p) <= value)
        .unwrap_or(0);
    let scaled = value / multiplier(power);
    format!("{} {}", format_count(scaled), UNITS[power])
}
