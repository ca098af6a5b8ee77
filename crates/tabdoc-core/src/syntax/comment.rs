//! Comment stripping
//!
//! Markers are only recognized outside double quotes and when not preceded
//! by a backslash. Block comment state persists across lines.

use crate::config::Config;

/// Byte offset of the first marker outside quotes and escapes
pub fn find_marker<S: AsRef<str>>(line: &str, markers: &[S]) -> Option<usize> {
    let mut escaped = false;
    let mut quoted = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            _ if quoted => {}
            _ => {
                let rest = &line[i..];
                if markers
                    .iter()
                    .any(|m| !m.as_ref().is_empty() && rest.starts_with(m.as_ref()))
                {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// Per-parse comment filter
#[derive(Debug, Clone)]
pub struct CommentFilter {
    markers: Vec<String>,
    open: String,
    close: String,
    in_block: bool,
}

impl CommentFilter {
    pub fn new(config: &Config) -> Self {
        CommentFilter {
            markers: config.comment_markers.clone(),
            open: config.block_comment_open.clone(),
            close: config.block_comment_close.clone(),
            in_block: false,
        }
    }

    pub fn in_block(&self) -> bool {
        self.in_block
    }

    /// Line with any trailing single-line comment removed
    pub fn strip_inline(&self, line: &str) -> String {
        match find_marker(line, &self.markers) {
            Some(at) => line[..at].trim_end().to_string(),
            None => line.to_string(),
        }
    }

    /// Remove `/* … */` spans that open and close on this line
    fn strip_one_line_blocks(&self, line: &str) -> String {
        let mut line = line.to_string();
        while let Some(start) = find_marker(&line, &[&self.open]) {
            let after = start + self.open.len();
            match find_marker(&line[after..], &[&self.close]) {
                Some(end) => {
                    let end = after + end + self.close.len();
                    line.replace_range(start..end, "");
                }
                None => break,
            }
        }
        line
    }

    /// The significant part of `line`, or `None` when the line is noise.
    /// Updates block comment state.
    pub fn filter(&mut self, line: &str) -> Option<String> {
        if self.in_block {
            let at = find_marker(line, &[&self.close])?;
            self.in_block = false;
            let rest = &line[at + self.close.len()..];
            if !rest.trim().is_empty() {
                tracing::trace!(line, "text after a block comment close is ignored");
            }
            return None;
        }

        let line = self.strip_one_line_blocks(line);
        let line = self.strip_inline(&line);
        if line.trim().is_empty() {
            return None;
        }

        if let Some(at) = find_marker(&line, &[&self.close]) {
            // stray close with no open block
            tracing::trace!(column = at, "unmatched block comment close");
            return None;
        }
        if let Some(at) = find_marker(&line, &[&self.open]) {
            self.in_block = true;
            let head = line[..at].trim_end();
            if head.trim().is_empty() {
                return None;
            }
            return Some(head.to_string());
        }

        Some(line)
    }
}
