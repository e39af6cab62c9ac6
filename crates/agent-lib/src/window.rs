//! Fixed-capacity sliding window of recent entries
//!
//! Entries are kept in arrival order. Pushing past capacity evicts the
//! oldest entry (FIFO); pushes are never rejected.

use std::collections::VecDeque;

/// Default number of entries retained for trend display
pub const DEFAULT_WINDOW_CAPACITY: usize = 30;

/// Bounded, arrival-ordered ring buffer
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> SlidingWindow<T> {
    /// Create a window holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one so the latest entry is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting from the head if over capacity
    pub fn push(&mut self, entry: T) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Independent copy of the retained entries, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for SlidingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
