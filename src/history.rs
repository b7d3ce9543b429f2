//! Undo/Redo history for annotation operations.
//!
//! History is an append-only log of full snapshots plus a current index:
//! undo and redo are pure index moves, and recording a new snapshot after
//! an undo truncates the abandoned redo branch. Each image carries its own
//! log, reset to a single snapshot when the image becomes active.

use crate::constants::history::MAX_SNAPSHOTS;
use crate::model::{Annotation, LabelRegistry};

/// An immutable copy of the annotation sequence at one point in edit
/// history.
///
/// The label registry rides along so that undoing a label-delete cascade
/// restores the label together with its annotations, never leaving a
/// dangling `label_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The full annotation sequence, in z-order.
    pub annotations: Vec<Annotation>,
    /// Label registry state at commit time.
    pub labels: LabelRegistry,
}

impl Snapshot {
    pub fn new(annotations: Vec<Annotation>, labels: LabelRegistry) -> Self {
        Self {
            annotations,
            labels,
        }
    }
}

/// Ordered snapshot log with a movable cursor.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    snapshots: Vec<Snapshot>,
    index: usize,
    max_len: usize,
}

impl HistoryLog {
    /// Create a log containing a single initial snapshot.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            max_len: MAX_SNAPSHOTS,
        }
    }

    /// Create with a custom history bound.
    pub fn with_capacity(initial: Snapshot, max_len: usize) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            max_len: max_len.max(1),
        }
    }

    /// Discard everything and restart from a single snapshot.
    pub fn reset(&mut self, initial: Snapshot) {
        self.snapshots.clear();
        self.snapshots.push(initial);
        self.index = 0;
        log::debug!("🗑️ History reset");
    }

    /// Append a snapshot after the cursor, truncating any redo branch.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        self.index += 1;

        // Bound memory by dropping the oldest snapshots
        while self.snapshots.len() > self.max_len {
            self.snapshots.remove(0);
            self.index -= 1;
        }
        log::debug!("📝 History: snapshot {}/{}", self.index + 1, self.snapshots.len());
    }

    /// The snapshot the cursor points at. This is the displayed state.
    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Move the cursor back one snapshot. No-op at the start of history.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        log::debug!("⏪ Undo -> snapshot {}/{}", self.index + 1, self.snapshots.len());
        Some(&self.snapshots[self.index])
    }

    /// Move the cursor forward one snapshot. No-op at the end of history.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        log::debug!("⏩ Redo -> snapshot {}/{}", self.index + 1, self.snapshots.len());
        Some(&self.snapshots[self.index])
    }

    /// Number of snapshots in the log.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(Snapshot::new(Vec::new(), LabelRegistry::new()))
    }
}

// ============================================================================
// Tests
// ============================================================================
