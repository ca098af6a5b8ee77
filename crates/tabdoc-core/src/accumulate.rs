//! Multi-line list accumulation
//!
//! Started by a variable line whose value opens more `[` than it closes.
//! Every following significant line is appended (trimmed) until the bracket
//! depth returns to zero; nothing else is classified meanwhile.

use crate::document::Provenance;
use crate::types::list;
use crate::types::Datatype;
use crate::visibility::Visibility;

/// A variable waiting for its value
#[derive(Debug, Clone)]
pub struct PendingVariable {
    pub name: String,
    pub visibility: Visibility,
    pub declared_datatype: Option<String>,
    pub datatype: Datatype,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct ListAccumulator {
    depth: usize,
    buffer: String,
    pending: PendingVariable,
}

impl ListAccumulator {
    pub fn start(first: &str, pending: PendingVariable) -> Self {
        let mut accumulator = ListAccumulator {
            depth: 0,
            buffer: String::new(),
            pending,
        };
        accumulator.feed(first);
        accumulator
    }

    /// Append one line; true once the brackets balance
    pub fn feed(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (opens, closes) = list::bracket_counts(line);
        self.depth = (self.depth + opens).saturating_sub(closes);
        self.buffer.push_str(line);
        self.depth == 0
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pending(&self) -> &PendingVariable {
        &self.pending
    }

    pub fn finish(self) -> (String, PendingVariable) {
        (self.buffer, self.pending)
    }
}
