//! Annotation storage for the active image.
//!
//! The store owns the working annotation sequence (insertion order is
//! z-order) and its history log. Every mutating operation records one
//! snapshot; in-progress gestures mutate the working sequence directly
//! and commit a single snapshot when the gesture finishes.

use crate::history::{HistoryLog, Snapshot};
use crate::model::{Annotation, AnnotationId, Label, LabelId, LabelRegistry, Shape};

/// Annotations and edit history for one image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    next_id: AnnotationId,
    history: HistoryLog,
}

impl AnnotationStore {
    /// Create an empty store whose history starts at one empty snapshot.
    pub fn new(labels: &LabelRegistry) -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 1,
            history: HistoryLog::new(Snapshot::new(Vec::new(), labels.clone())),
        }
    }

    /// Load a stored annotation sequence as the active set.
    ///
    /// The history resets to a single snapshot of the loaded state; prior
    /// edit history for the image is not preserved across navigation.
    pub fn load(annotations: Vec<Annotation>, labels: &LabelRegistry) -> Self {
        let next_id = annotations.iter().map(|a| a.id + 1).max().unwrap_or(1);
        let history = HistoryLog::new(Snapshot::new(annotations.clone(), labels.clone()));
        Self {
            annotations,
            next_id,
            history,
        }
    }

    /// Like [`load`](Self::load) with an explicit history bound.
    pub fn with_capacity(
        annotations: Vec<Annotation>,
        labels: &LabelRegistry,
        max_history: usize,
    ) -> Self {
        let next_id = annotations.iter().map(|a| a.id + 1).max().unwrap_or(1);
        let history =
            HistoryLog::with_capacity(Snapshot::new(annotations.clone(), labels.clone()), max_history);
        Self {
            annotations,
            next_id,
            history,
        }
    }

    /// The working annotation sequence, in z-order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Mutable access for in-progress gestures. Does not commit.
    pub(crate) fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Allocate the next annotation ID. IDs are monotonic for the lifetime
    /// of the store so redo branches never collide.
    pub(crate) fn alloc_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Split borrows for the detection merge: the working sequence and
    /// the ID counter together.
    pub(crate) fn merge_slots(&mut self) -> (&mut Vec<Annotation>, &mut AnnotationId) {
        (&mut self.annotations, &mut self.next_id)
    }

    /// Record the working state as one history snapshot.
    pub fn commit(&mut self, labels: &LabelRegistry) {
        self.history
            .record(Snapshot::new(self.annotations.clone(), labels.clone()));
    }

    /// Discard uncommitted gesture changes, restoring the displayed state.
    pub(crate) fn revert(&mut self) {
        self.annotations = self.history.current().annotations.clone();
    }

    // ========================================================================
    // Committing operations
    // ========================================================================

    /// Add an annotation with the given label and shape. One snapshot.
    pub fn add(&mut self, label: &Label, shape: Shape, labels: &LabelRegistry) -> AnnotationId {
        let id = self.alloc_id();
        self.annotations
            .push(Annotation::new(id, label.id, label.color, shape));
        self.commit(labels);
        log::info!("✅ Added annotation {} (label '{}')", id, label.name);
        id
    }

    /// Remove an annotation by ID. One snapshot if something was removed.
    pub fn remove(&mut self, id: AnnotationId, labels: &LabelRegistry) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        let removed = self.annotations.remove(index);
        self.commit(labels);
        log::info!("🗑️ Deleted annotation {}", id);
        Some(removed)
    }

    /// Replace an annotation's shape. One snapshot if the ID exists.
    pub fn update_shape(&mut self, id: AnnotationId, shape: Shape, labels: &LabelRegistry) -> bool {
        let Some(ann) = self.get_mut(id) else {
            return false;
        };
        ann.shape = shape;
        self.commit(labels);
        true
    }

    /// Delete a label and every annotation referencing it, as one atomic,
    /// undoable step. Returns the number of annotations removed.
    pub fn remove_label_cascade(
        &mut self,
        label_id: LabelId,
        labels: &mut LabelRegistry,
    ) -> usize {
        let removed_label = labels.remove(label_id);
        let before = self.annotations.len();
        self.annotations.retain(|a| a.label_id != label_id);
        let removed = before - self.annotations.len();

        if removed_label.is_none() && removed == 0 {
            return 0;
        }
        self.commit(labels);
        log::info!(
            "🗑️ Removed label {} and {} dependent annotations",
            label_id,
            removed
        );
        removed
    }

    /// Change a label's color, cascading to every annotation that
    /// references it. One snapshot.
    pub fn set_label_color(
        &mut self,
        label_id: LabelId,
        color: [f32; 4],
        labels: &mut LabelRegistry,
    ) -> bool {
        let Some(label) = labels.get_mut(label_id) else {
            return false;
        };
        label.color = color;
        for ann in self.annotations.iter_mut().filter(|a| a.label_id == label_id) {
            ann.color = color;
        }
        self.commit(labels);
        true
    }

    // ========================================================================
    // Undo / Redo
    // ========================================================================

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one snapshot, restoring annotations and labels.
    /// Returns false at the start of history.
    pub fn undo(&mut self, labels: &mut LabelRegistry) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.annotations = snapshot.annotations.clone();
        *labels = snapshot.labels.clone();
        true
    }

    /// Step forward one snapshot. Returns false at the end of history.
    pub fn redo(&mut self, labels: &mut LabelRegistry) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.annotations = snapshot.annotations.clone();
        *labels = snapshot.labels.clone();
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
