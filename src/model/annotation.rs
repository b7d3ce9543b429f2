//! Annotation data model.
//!
//! This module provides the core geometry types for image annotations:
//! points, the tagged `Shape` variant (rectangle, polygon, point), and the
//! `Annotation` record tying a shape to a label.

use serde::{Deserialize, Serialize};

use crate::constants::threshold;
use crate::model::label::{LabelId, LabelRegistry};

/// Unique identifier for an annotation.
pub type AnnotationId = u64;

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ============================================================================
// Annotation Shape
// ============================================================================

/// The geometry of an annotation (in image coordinates).
///
/// A discriminated variant rather than a trait hierarchy: hit testing,
/// clamping, and serialization all match exhaustively on the shape type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Axis-aligned rectangle defined by top-left corner and size.
    Rect { x: f32, y: f32, w: f32, h: f32 },
    /// Closed polygon defined by ordered vertices.
    Polygon { points: Vec<Point> },
    /// Single point marker.
    Point { x: f32, y: f32 },
}

impl Shape {
    /// Create a normalized rectangle from two corner points.
    ///
    /// Returns `None` if either side is at or below the minimum drag size,
    /// so sub-threshold drags are discarded silently.
    pub fn rect_from_corners(p1: Point, p2: Point) -> Option<Self> {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let w = (p1.x - p2.x).abs();
        let h = (p1.y - p2.y).abs();

        if w > threshold::MIN_DRAG_SIZE && h > threshold::MIN_DRAG_SIZE {
            Some(Shape::Rect { x, y, w, h })
        } else {
            None
        }
    }

    /// Check if a point lies inside this shape.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Rect { x, y, w, h } => {
                p.x >= *x && p.x <= x + w && p.y >= *y && p.y <= y + h
            }
            Shape::Point { x, y } => {
                // Small fixed hit radius for markers
                Point::new(*x, *y).distance_to(&p) < 5.0
            }
            Shape::Polygon { points } => {
                // Ray casting algorithm
                if points.len() < threshold::MIN_POLYGON_VERTICES {
                    return false;
                }
                let mut inside = false;
                let mut j = points.len() - 1;
                for i in 0..points.len() {
                    let (vi, vj) = (points[i], points[j]);
                    if ((vi.y > p.y) != (vj.y > p.y))
                        && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Check structural validity of the shape itself.
    pub fn is_valid(&self) -> bool {
        match self {
            Shape::Rect { w, h, .. } => *w > 0.0 && *h > 0.0,
            Shape::Polygon { points } => points.len() >= threshold::MIN_POLYGON_VERTICES,
            Shape::Point { .. } => true,
        }
    }
}

// ============================================================================
// Annotation
// ============================================================================

/// A single annotation on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier for this annotation.
    pub id: AnnotationId,
    /// The label this annotation belongs to.
    pub label_id: LabelId,
    /// Display color, copied from the label at creation time.
    pub color: [f32; 4],
    /// The shape geometry.
    #[serde(flatten)]
    pub shape: Shape,
}

impl Annotation {
    /// Create a new annotation.
    pub fn new(id: AnnotationId, label_id: LabelId, color: [f32; 4], shape: Shape) -> Self {
        Self {
            id,
            label_id,
            color,
            shape,
        }
    }

    /// Check that the shape is well-formed and the label is registered.
    pub fn is_valid(&self, labels: &LabelRegistry) -> bool {
        self.shape.is_valid() && labels.get(self.label_id).is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
