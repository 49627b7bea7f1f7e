//! # Edit History
//!
//! Undo/redo for block markup edits.
//!
//! ## Design
//!
//! - Each edit records the markup a block had before and after
//! - Consecutive edits of the same block coalesce into one entry, so a
//!   typing burst undoes in one step
//! - [`History::checkpoint`] closes the current entry
//! - Undo restores `before` and moves the entry to the redo stack
//! - New edits clear the redo stack
//!
//! Entries name blocks by id. When the block is gone by the time an entry
//! is undone or redone, the entry is discarded and nothing changes.

use crate::document::{DocumentModel, Sequence};

/// One recorded change of a block's markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupEdit {
    pub sequence: Sequence,
    pub block_id: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug)]
pub struct History {
    /// Most recent last
    undo_stack: Vec<MarkupEdit>,

    /// Most recent last
    redo_stack: Vec<MarkupEdit>,

    /// Maximum number of undo levels (0 = unlimited)
    max_depth: usize,

    /// Whether the top entry still absorbs edits of the same block
    open: bool,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_depth(100)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
            open: false,
        }
    }

    pub fn record(&mut self, edit: MarkupEdit) {
        self.redo_stack.clear();

        if self.open {
            if let Some(top) = self.undo_stack.last_mut() {
                if top.sequence == edit.sequence && top.block_id == edit.block_id {
                    top.after = edit.after;
                    return;
                }
            }
        }

        self.undo_stack.push(edit);
        self.open = true;

        if self.max_depth > 0 && self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
    }

    /// Stop coalescing into the current entry
    pub fn checkpoint(&mut self) {
        self.open = false;
    }

    /// Undo the most recent entry. Returns the id of the block it restored.
    pub fn undo(&mut self, model: &mut DocumentModel) -> Option<String> {
        self.open = false;
        let edit = self.undo_stack.pop()?;

        match model.replace_in(edit.sequence, &edit.block_id, edit.before.clone()) {
            Some(_) => {
                let id = edit.block_id.clone();
                self.redo_stack.push(edit);
                Some(id)
            }
            None => {
                tracing::debug!(block_id = %edit.block_id, "Discarding undo entry for missing block");
                None
            }
        }
    }

    /// Redo the most recently undone entry
    pub fn redo(&mut self, model: &mut DocumentModel) -> Option<String> {
        self.open = false;
        let edit = self.redo_stack.pop()?;

        match model.replace_in(edit.sequence, &edit.block_id, edit.after.clone()) {
            Some(_) => {
                let id = edit.block_id.clone();
                self.undo_stack.push(edit);
                Some(id)
            }
            None => {
                tracing::debug!(block_id = %edit.block_id, "Discarding redo entry for missing block");
                None
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = false;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
