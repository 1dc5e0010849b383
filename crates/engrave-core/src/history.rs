//! Linear undo/redo log of scene snapshots.

use crate::document::SceneDocument;
use std::sync::Arc;

/// An immutable snapshot of the scene's objects, without the background.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry(Arc<SceneDocument>);

impl HistoryEntry {
    /// Wrap a document, dropping any background record.
    pub fn new(document: SceneDocument) -> Self {
        let document = if document.background().is_some() {
            document.without_background()
        } else {
            document
        };
        Self(Arc::new(document))
    }

    pub fn document(&self) -> &SceneDocument {
        &self.0
    }
}

/// Undo/redo log with a position pointer.
///
/// `index` is `None` until the first snapshot is recorded. Recording after
/// an undo discards every entry past the pointer.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: Option<usize>,
    /// Maximum number of entries kept; oldest are dropped first.
    limit: Option<usize>,
}

impl History {
    /// Create an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Append a snapshot after the current position.
    pub fn record(&mut self, snapshot: SceneDocument) {
        let next = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(next);
        self.entries.push(HistoryEntry::new(snapshot));

        let mut index = next;
        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
                index -= excess;
            }
        }
        self.index = Some(index);
        log::debug!("Recorded history entry {} of {}", index + 1, self.entries.len());
    }

    /// Step back. Returns the entry to restore, or `None` at the start.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                self.entries.get(i - 1)
            }
            _ => None,
        }
    }

    /// Step forward. Returns the entry to restore, or `None` at the end.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.entries.len() {
            self.index = Some(next);
            self.entries.get(next)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index.map_or(0, |i| i + 1) < self.entries.len()
    }

    /// Entry at the pointer.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    /// Pointer position; `None` means no history yet.
    pub fn position(&self) -> Option<usize> {
        self.index
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }
}
