//! Bounded history of emitted key counts for word-level undo

use std::collections::VecDeque;

pub const DEFAULT_UNDO_DEPTH: usize = 30;

/// One undoable emission and the caller state `S` from before it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry<S> {
    count: usize,
    before: S,
}

/// What a pop takes back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undone<S> {
    /// Keys to remove
    pub count: usize,
    /// State saved with the entry, `None` when only untracked keys remain
    pub before: Option<S>,
}

#[derive(Debug, Clone)]
pub struct UndoStack<S = ()> {
    entries: VecDeque<Entry<S>>,
    depth: usize,
    /// Keys typed since the last push that belong to no word yet
    /// (dictated spaces). Folded into the next push or pop.
    untracked: usize,
}

impl<S> Default for UndoStack<S> {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl<S> UndoStack<S> {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
            untracked: 0,
        }
    }

    /// Record a word that typed `count` keys, with the state it started from
    pub fn push(&mut self, count: usize, before: S) {
        let count = count + std::mem::take(&mut self.untracked);
        if self.depth == 0 || count == 0 {
            return;
        }
        if self.entries.len() >= self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry { count, before });
    }

    /// Keys to remove for the most recent word, if any
    pub fn pop(&mut self) -> Option<Undone<S>> {
        let untracked = std::mem::take(&mut self.untracked);
        match self.entries.pop_back() {
            Some(entry) => Some(Undone {
                count: entry.count + untracked,
                before: Some(entry.before),
            }),
            None if untracked > 0 => Some(Undone {
                count: untracked,
                before: None,
            }),
            None => None,
        }
    }

    pub fn add_untracked(&mut self, count: usize) {
        self.untracked += count;
    }

    /// Forget the `n` most recent entries and anything untracked
    pub fn discard_recent(&mut self, n: usize) {
        let keep = self.entries.len().saturating_sub(n);
        self.entries.truncate(keep);
        self.untracked = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.untracked = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.untracked == 0
    }
}
