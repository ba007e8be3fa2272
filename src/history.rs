//! Bounded undo history of whole-document snapshots.
//!
//! One global stack across all files: undo pops whatever was edited most
//! recently, even if that jumps between files. Capacity is fixed; the
//! oldest snapshot is evicted first.

use std::collections::VecDeque;

/// Maximum number of snapshots retained.
pub const HISTORY_CAPACITY: usize = 50;

/// One undo step: a file and its full serialized markup before the edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub file: String,
    pub snapshot: String,
}

/// Global push-only undo stack with ring-buffer eviction.
#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot taken before an edit. Evicts the oldest entry
    /// once the capacity is exceeded.
    pub fn push(&mut self, file: &str, snapshot: String) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            file: file.to_string(),
            snapshot,
        });
    }

    /// Pop the most recent snapshot across all files.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
