//! Per-scope element limits installed by `-> N` suffixes

use std::collections::HashMap;

use crate::scope::ScopePath;

#[derive(Debug, Clone, Default)]
pub struct ElementLimiter {
    remaining: HashMap<ScopePath, usize>,
}

impl ElementLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or reset) the counter for `scope`
    pub fn install(&mut self, scope: &ScopePath, max: usize) {
        tracing::debug!(scope = %scope, max, "element limit installed");
        self.remaining.insert(scope.clone(), max);
    }

    pub fn allowed(&self, scope: &ScopePath) -> bool {
        self.remaining.get(scope).map_or(true, |n| *n > 0)
    }

    pub fn consume(&mut self, scope: &ScopePath) {
        if let Some(n) = self.remaining.get_mut(scope) {
            *n = n.saturating_sub(1);
        }
    }

    pub fn remaining(&self, scope: &ScopePath) -> Option<usize> {
        self.remaining.get(scope).copied()
    }
}
