//! Bounded undo/redo stacks of document snapshots.

use crate::config::DEFAULT_UNDO_DEPTH;
use crate::snapshot::Snapshot;
use std::collections::VecDeque;

/// Delete a snapshot, logging rather than returning a failure.
pub(crate) fn discard(snapshot: Snapshot) {
    let path = snapshot.path().to_path_buf();
    if let Err(err) = snapshot.delete() {
        tracing::warn!(path = %path.display(), error = %err, "failed to delete snapshot");
    }
}

/// Per-tab undo history
///
/// Both stacks hold their most recent entry last. The undo stack never holds
/// more than `max_depth` entries; the oldest is evicted and deleted first.
#[derive(Debug)]
pub struct UndoManager {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_depth: usize,
}

impl UndoManager {
    /// Create an empty manager. A depth of 0 falls back to the default.
    pub fn new(max_depth: usize) -> Self {
        let max_depth = if max_depth == 0 { DEFAULT_UNDO_DEPTH } else { max_depth };
        Self { undo: VecDeque::new(), redo: Vec::new(), max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Record a new edit checkpoint
    ///
    /// Deletes the whole redo stack: redo is only valid right after an undo.
    pub fn push_undo(&mut self, snapshot: Snapshot) {
        self.clear_redo();
        self.push_undo_keep_redo(snapshot);
    }

    /// Push onto the undo stack without touching redo (puts back an entry whose restore failed)
    pub fn push_undo_keep_redo(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.max_depth {
            if let Some(oldest) = self.undo.pop_front() {
                tracing::debug!(path = %oldest.path().display(), "evicting oldest undo snapshot");
                discard(oldest);
            }
        }
    }

    pub fn push_redo(&mut self, snapshot: Snapshot) {
        self.redo.push(snapshot);
    }

    pub fn pop_undo(&mut self) -> Option<Snapshot> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<Snapshot> {
        self.redo.pop()
    }

    /// Drop the most recent undo entry without restoring it
    pub fn discard_last_undo(&mut self) {
        if let Some(snapshot) = self.undo.pop_back() {
            discard(snapshot);
        }
    }

    pub fn clear_redo(&mut self) {
        for snapshot in self.redo.drain(..) {
            discard(snapshot);
        }
    }

    /// Delete every snapshot on both stacks
    pub fn clear_all(&mut self) {
        for snapshot in self.undo.drain(..) {
            discard(snapshot);
        }
        self.clear_redo();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl Drop for UndoManager {
    fn drop(&mut self) {
        self.clear_all();
    }
}
