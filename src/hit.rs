//! Hit testing for annotation selection and resize handles.
//!
//! Only rectangle annotations participate in selection: polygons and
//! points are drawn but not selectable. Handle tests run before body
//! tests so grabbing a corner takes priority over dragging, and the
//! topmost (last-added) annotation wins.

use crate::constants::threshold;
use crate::model::{Annotation, AnnotationId, Point, Shape};
use crate::transform::ViewTransform;

/// A corner resize handle of a rectangle annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Handle {
    /// All handles in drawing order.
    pub fn all() -> &'static [Handle] {
        &[Handle::Nw, Handle::Ne, Handle::Sw, Handle::Se]
    }

    /// The image-space position of this handle on a rectangle.
    pub fn corner(&self, x: f32, y: f32, w: f32, h: f32) -> Point {
        match self {
            Handle::Nw => Point::new(x, y),
            Handle::Ne => Point::new(x + w, y),
            Handle::Sw => Point::new(x, y + h),
            Handle::Se => Point::new(x + w, y + h),
        }
    }

    /// The opposite corner, which stays fixed while this handle is dragged.
    pub fn opposite(&self) -> Handle {
        match self {
            Handle::Nw => Handle::Se,
            Handle::Ne => Handle::Sw,
            Handle::Sw => Handle::Ne,
            Handle::Se => Handle::Nw,
        }
    }
}

/// Result of a pointer-down hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// The annotation that was hit.
    pub id: AnnotationId,
    /// The handle that was grabbed, if any. `None` means the body was hit.
    pub handle: Option<Handle>,
}

/// Test whether `canvas_pt` lands on a handle of the given rectangle.
///
/// Handles are fixed-size squares in canvas space, so the test converts
/// each corner to canvas coordinates rather than scaling the radius.
pub fn handle_at(
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    canvas_pt: Point,
    transform: &ViewTransform,
    image_size: (f32, f32),
    canvas_size: (f32, f32),
) -> Option<Handle> {
    let half = threshold::HANDLE_SIZE / 2.0;
    for handle in Handle::all() {
        let corner = transform.to_canvas_space(handle.corner(x, y, w, h), image_size, canvas_size);
        if (canvas_pt.x - corner.x).abs() <= half && (canvas_pt.y - corner.y).abs() <= half {
            return Some(*handle);
        }
    }
    None
}

/// Find the topmost annotation under a canvas-space pointer position.
///
/// Scans back-to-front (last added wins). For each rectangle the handle
/// test runs first; polygons and points are skipped.
pub fn hit_test(
    annotations: &[Annotation],
    canvas_pt: Point,
    transform: &ViewTransform,
    image_size: (f32, f32),
    canvas_size: (f32, f32),
) -> Option<HitResult> {
    let image_pt = transform.to_image_space_raw(canvas_pt, image_size, canvas_size);

    for ann in annotations.iter().rev() {
        match ann.shape {
            Shape::Rect { x, y, w, h } => {
                if let Some(handle) =
                    handle_at(x, y, w, h, canvas_pt, transform, image_size, canvas_size)
                {
                    return Some(HitResult {
                        id: ann.id,
                        handle: Some(handle),
                    });
                }
                if ann.shape.contains(image_pt) {
                    return Some(HitResult {
                        id: ann.id,
                        handle: None,
                    });
                }
            }
            // Polygons and points are not selectable
            Shape::Polygon { .. } | Shape::Point { .. } => {}
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
