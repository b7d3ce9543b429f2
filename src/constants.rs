//! Editor constants for consistent behavior across the crate.
//!
//! This module centralizes all hardcoded values for zoom, gesture
//! thresholds, media limits, and detection defaults.

/// Zoom behavior constants.
pub mod zoom {
    /// Multiplicative step for zoom in/out
    pub const FACTOR: f32 = 1.2;
    /// Minimum zoom level
    pub const MIN: f32 = 0.1;
    /// Maximum zoom level
    pub const MAX: f32 = 5.0;
}

/// Gesture and geometry thresholds.
pub mod threshold {
    /// A rectangle drag must exceed this width and height (image pixels)
    /// before a new annotation is committed.
    pub const MIN_DRAG_SIZE: f32 = 5.0;
    /// Resizing never shrinks a rectangle below this size (image pixels).
    pub const MIN_RECT_SIZE: f32 = 10.0;
    /// Side length of a corner resize handle (canvas pixels).
    pub const HANDLE_SIZE: f32 = 8.0;
    /// Minimum number of vertices required for a committed polygon.
    pub const MIN_POLYGON_VERTICES: usize = 3;
}

/// Upload validation limits.
pub mod media {
    /// Maximum accepted image upload size (50 MB).
    pub const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;
    /// Maximum accepted video upload size (200 MB).
    pub const MAX_VIDEO_BYTES: u64 = 200 * 1024 * 1024;
    /// Maximum number of images sent in one batch detection request.
    pub const MAX_BATCH_IMAGES: usize = 50;
}

/// Detection request defaults.
pub mod detect {
    /// Default detection model identifier.
    pub const DEFAULT_MODEL: &str = "yolo/yolov8n.pt";
    /// Default confidence threshold.
    pub const DEFAULT_CONFIDENCE: f32 = 0.25;
    /// Process every Nth video frame by default.
    pub const DEFAULT_FRAME_INTERVAL: u32 = 1;
    /// Maximum video frames processed per request.
    pub const DEFAULT_MAX_FRAMES: u32 = 100;
}

/// History bounds.
pub mod history {
    /// Maximum number of snapshots kept per image history.
    pub const MAX_SNAPSHOTS: usize = 100;
}
