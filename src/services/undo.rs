//! Bounded, global undo stack.

use crate::constants::UNDO_DEPTH;
use crate::models::{LayoutKey, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// State of one key captured before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Key that was about to change
    pub key: LayoutKey,
    /// Snapshot stored at the key before the change, `None` if there was none
    pub prior: Option<Snapshot>,
    /// What the operation did, for status messages
    pub description: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl UndoEntry {
    /// Creates an entry stamped now.
    pub fn new(key: LayoutKey, prior: Option<Snapshot>, description: impl Into<String>) -> Self {
        Self {
            key,
            prior,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// LIFO stack of [`UndoEntry`] capped at a fixed depth.
///
/// When full, pushing evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    depth: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    /// Creates a stack holding at most [`UNDO_DEPTH`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(UNDO_DEPTH)
    }

    /// Creates a stack with a custom depth (at least 1).
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Pushes an entry, evicting the oldest if the stack is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, entry: UndoEntry) -> Option<UndoEntry> {
        let evicted = if self.entries.len() >= self.depth {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Pops the most recent entry.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// Returns the most recent entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&UndoEntry> {
        self.entries.back()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Descriptions from newest to oldest.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|entry| entry.description.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: u8) -> UndoEntry {
        UndoEntry::new(
            LayoutKey::new(1, level).unwrap(),
            None,
            format!("edit {level}"),
        )
    }

    #[test]
    fn test_lifo_order() {
        let mut stack = UndoStack::new();
        stack.push(entry(1));
        stack.push(entry(2));
        assert_eq!(stack.peek().unwrap().key.level, 2);
        assert_eq!(stack.pop().unwrap().key.level, 2);
        assert_eq!(stack.pop().unwrap().key.level, 1);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_oldest_evicted_at_depth() {
        let mut stack = UndoStack::new();
        for level in 1..=UNDO_DEPTH as u8 {
            assert!(stack.push(entry(level)).is_none());
        }
        let evicted = stack.push(entry(30)).unwrap();
        assert_eq!(evicted.key.level, 1);
        assert_eq!(stack.len(), UNDO_DEPTH);

        let descriptions: Vec<&str> = stack.descriptions().collect();
        assert_eq!(descriptions.first(), Some(&"edit 30"));
        assert_eq!(descriptions.last(), Some(&"edit 2"));
    }

    #[test]
    fn test_with_depth_minimum() {
        let mut stack = UndoStack::with_depth(0);
        assert_eq!(stack.depth(), 1);
        stack.push(entry(1));
        stack.push(entry(2));
        assert_eq!(stack.len(), 1);
        stack.clear();
        assert!(stack.is_empty());
    }
}
