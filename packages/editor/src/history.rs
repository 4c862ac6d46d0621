//! # Undo/Redo History
//!
//! Two bounded stacks of full-document frames.
//!
//! ## Design
//!
//! - A frame is captured *before* a structural mutation (`save`)
//! - Undo swaps the current state with the newest `past` frame and keeps
//!   the current state at the front of `future`
//! - Redo is the mirror operation
//! - Saving clears `future`; saving a frame equal to the newest `past`
//!   frame is a no-op
//! - Both stacks drop their oldest frame on overflow
//!
//! Frames are persistent collections, so capturing one is a cheap clone
//! that shares structure with the live document.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(50);
//!
//! history.save(&doc);
//! doc = mutate(doc);
//!
//! if let Some(previous) = history.undo(&doc) {
//!     doc = previous;
//! }
//! ```

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct History<T> {
    /// Oldest frame at the front, most recent at the back
    past: VecDeque<T>,

    /// Next redo frame at the front
    future: VecDeque<T>,

    limit: usize,
}

impl<T: Clone + PartialEq> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Capture `current` as an undo point.
    ///
    /// Returns `false` when `current` equals the newest frame already on
    /// the stack; nothing changes in that case.
    pub fn save(&mut self, current: &T) -> bool {
        if self.past.back() == Some(current) {
            return false;
        }

        self.past.push_back(current.clone());
        if self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
        true
    }

    /// Step back. Returns the frame that should replace `current`.
    pub fn undo(&mut self, current: &T) -> Option<T> {
        let previous = self.past.pop_back()?;

        self.future.push_front(current.clone());
        if self.future.len() > self.limit {
            self.future.pop_back();
        }

        Some(previous)
    }

    /// Step forward. Returns the frame that should replace `current`.
    pub fn redo(&mut self, current: &T) -> Option<T> {
        let next = self.future.pop_front()?;

        self.past.push_back(current.clone());
        if self.past.len() > self.limit {
            self.past.pop_front();
        }

        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl<T: Clone + PartialEq> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
