//! Label registry for annotation classes.
//!
//! Labels are the named, colored classes that annotations reference. They
//! are created explicitly by the user or synthesized by the detection
//! bridge when a detected class has no matching label yet.

use serde::{Deserialize, Serialize};

use crate::color_utils::label_color;

/// Unique identifier for a label.
pub type LabelId = u32;

/// A named annotation class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Unique identifier.
    pub id: LabelId,
    /// Display name. Names are not required to be unique, but lookups by
    /// name are case-insensitive.
    pub name: String,
    /// Display color (RGBA, 0.0-1.0).
    pub color: [f32; 4],
    /// Optional numeric shortcut shown in the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<u8>,
}

impl Label {
    /// Create a new label with a generated color.
    pub fn new(id: LabelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: label_color(id),
            shortcut: None,
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_shortcut(mut self, shortcut: u8) -> Self {
        self.shortcut = Some(shortcut);
        self
    }
}

/// Ordered collection of labels for a session.
///
/// Insertion order is preserved so number-key shortcuts can address labels
/// by their 1-based position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRegistry {
    labels: Vec<Label>,
    next_id: LabelId,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a new label by name and return its ID.
    pub fn add(&mut self, name: impl Into<String>) -> LabelId {
        let id = self.next_id;
        self.next_id += 1;
        let label = Label::new(id, name);
        log::debug!("🏷️ Added label '{}' (id={})", label.name, id);
        self.labels.push(label);
        id
    }

    /// Get a label by ID.
    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Get a mutable label by ID.
    pub fn get_mut(&mut self, id: LabelId) -> Option<&mut Label> {
        self.labels.iter_mut().find(|l| l.id == id)
    }

    /// Remove a label by ID. Cascading deletion of dependent annotations is
    /// handled by the annotation store.
    pub fn remove(&mut self, id: LabelId) -> Option<Label> {
        let index = self.labels.iter().position(|l| l.id == id)?;
        let label = self.labels.remove(index);
        log::debug!("🗑️ Removed label '{}' (id={})", label.name, id);
        Some(label)
    }

    /// Find a label by name, case-insensitively. The first match in
    /// insertion order wins.
    pub fn find_by_name(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Get the label at a 0-based position (for number-key selection).
    pub fn by_position(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    /// All labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut registry = LabelRegistry::new();
        let id = registry.add("Car");

        assert_eq!(registry.get(id).unwrap().name, "Car");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_by_name_is_case_insensitive() {
        let mut registry = LabelRegistry::new();
        let id = registry.add("Car");

        assert_eq!(registry.find_by_name("car").unwrap().id, id);
        assert_eq!(registry.find_by_name("CAR").unwrap().id, id);
        assert!(registry.find_by_name("person").is_none());
    }

    #[test]
    fn test_by_position() {
        let mut registry = LabelRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");

        assert_eq!(registry.by_position(0).unwrap().id, a);
        assert_eq!(registry.by_position(1).unwrap().id, b);
        assert!(registry.by_position(2).is_none());
    }

    #[test]
    fn test_ids_are_not_reused_after_remove() {
        let mut registry = LabelRegistry::new();
        let a = registry.add("a");
        registry.remove(a);
        let b = registry.add("b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_colors_differ() {
        let mut registry = LabelRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");
        assert_ne!(
            registry.get(a).unwrap().color,
            registry.get(b).unwrap().color
        );
    }
}
