//! Canvas/image coordinate mathematics.
//!
//! The image is drawn centered in the canvas, offset by the pan vector
//! (in canvas pixels), and scaled by the zoom factor about the image
//! center. These functions are extracted for testability.

use crate::constants::zoom;
use crate::model::Point;

/// Pan/zoom transform between canvas space and image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl ViewTransform {
    /// Create a new transform with the given zoom and pan.
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Map a canvas-space point to image space.
    ///
    /// Returns `None` when the point falls outside the image rectangle
    /// `[0, image_w] x [0, image_h]`.
    pub fn to_image_space(
        &self,
        canvas: Point,
        image_size: (f32, f32),
        canvas_size: (f32, f32),
    ) -> Option<Point> {
        let p = self.to_image_space_raw(canvas, image_size, canvas_size);
        if p.x < 0.0 || p.x > image_size.0 || p.y < 0.0 || p.y > image_size.1 {
            None
        } else {
            Some(p)
        }
    }

    /// Map a canvas-space point to image space without bounds checking.
    ///
    /// Gestures in progress keep tracking the pointer after it leaves the
    /// image; callers clamp the result themselves.
    pub fn to_image_space_raw(
        &self,
        canvas: Point,
        image_size: (f32, f32),
        canvas_size: (f32, f32),
    ) -> Point {
        let rel_x = canvas.x - canvas_size.0 / 2.0;
        let rel_y = canvas.y - canvas_size.1 / 2.0;
        Point::new(
            (rel_x - self.pan_x) / self.zoom + image_size.0 / 2.0,
            (rel_y - self.pan_y) / self.zoom + image_size.1 / 2.0,
        )
    }

    /// Map an image-space point to canvas space. Always defined.
    pub fn to_canvas_space(
        &self,
        image: Point,
        image_size: (f32, f32),
        canvas_size: (f32, f32),
    ) -> Point {
        Point::new(
            canvas_size.0 / 2.0 + self.pan_x + (image.x - image_size.0 / 2.0) * self.zoom,
            canvas_size.1 / 2.0 + self.pan_y + (image.y - image_size.1 / 2.0) * self.zoom,
        )
    }

    /// Zoom in one multiplicative step.
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * zoom::FACTOR).min(zoom::MAX);
        log::debug!("🔍 Zoom in: {:.2}x", self.zoom);
    }

    /// Zoom out one multiplicative step.
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / zoom::FACTOR).max(zoom::MIN);
        log::debug!("🔍 Zoom out: {:.2}x", self.zoom);
    }

    /// Reset zoom to 1 and pan to the origin ("fit to screen").
    pub fn fit_to_screen(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        log::debug!("🔄 View reset");
    }

    /// Apply a pan delta in canvas pixels.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom to a new level keeping the point under the cursor fixed.
    ///
    /// 1. Find the image-space point under the cursor
    /// 2. After zooming, adjust pan so that same point stays under cursor
    pub fn zoom_to_cursor(&mut self, new_zoom: f32, cursor: Point, canvas_size: (f32, f32)) {
        let new_zoom = new_zoom.clamp(zoom::MIN, zoom::MAX);
        let rel_x = cursor.x - canvas_size.0 / 2.0;
        let rel_y = cursor.y - canvas_size.1 / 2.0;

        let img_x = (rel_x - self.pan_x) / self.zoom;
        let img_y = (rel_y - self.pan_y) / self.zoom;

        self.zoom = new_zoom;
        self.pan_x = rel_x - img_x * new_zoom;
        self.pan_y = rel_y - img_y * new_zoom;
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

// ============================================================================
// Tests
// ============================================================================
