//! Undo/redo over value snapshots.

use crate::grid::GridConfig;
use tracing::trace;

/// Two stacks of snapshots.
///
/// Call [`EditHistory::record_checkpoint`] with the current value right
/// before a change that should be undoable. A whole drag gesture records one
/// checkpoint, at drag start.
///
/// # Example
/// ```
/// use gridsplit::{EditHistory, GridConfig};
///
/// let mut history = EditHistory::new();
/// let before = GridConfig::new(3, 3);
/// history.record_checkpoint(before.clone());
/// let after = before.clone().with_rows(5);
///
/// let undone = history.undo(after.clone());
/// assert_eq!(undone, before);
/// assert_eq!(history.redo(undone), after);
/// ```
#[derive(Debug, Clone)]
pub struct EditHistory<T = GridConfig> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
}

impl<T> Default for EditHistory<T> {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
}

impl<T> EditHistory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `current` onto the undo stack and clears the redo stack.
    pub fn record_checkpoint(&mut self, current: T) {
        self.undo_stack.push(current);
        self.redo_stack.clear();
        trace!("Checkpoint recorded, undo depth {}", self.undo_stack.len());
    }

    /// Returns the previous value, moving `current` onto the redo stack.
    /// With nothing to undo, `current` comes back unchanged.
    pub fn undo(&mut self, current: T) -> T {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(current);
                previous
            }
            None => current,
        }
    }

    /// Returns the next value, moving `current` onto the undo stack.
    /// With nothing to redo, `current` comes back unchanged.
    pub fn redo(&mut self, current: T) -> T {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(current);
                next
            }
            None => current,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forgets every snapshot.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
