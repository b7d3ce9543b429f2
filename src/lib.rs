//! AutoOD annotation core.
//!
//! The interactive editing engine behind the AutoOD object detection labeler:
//! geometric annotations (rectangles, polygons, points) over raster images,
//! pointer-gesture tools, undo/redo history, multi-image sessions, and merging
//! of machine-generated detections into the same data model.
//!
//! Rendering, persistence formats, and the network transport to the detection
//! service are collaborators outside this crate; only their data shapes are
//! defined here.

mod color_utils;
mod config;
mod constants;
mod detect;
mod error;
mod export;
mod hit;
mod history;
mod input;
mod keybindings;
mod media;
mod model;
mod session;
mod store;
mod tools;
mod transform;

pub use config::{EditorConfig, LogLevel};
pub use constants::{detect as detect_defaults, media as media_limits, threshold, zoom};
pub use detect::{
    BatchItem, BatchItemRequest, BatchOutcome, BatchRequest, BatchResponse, DetectOptions,
    DetectRequest, Detection, DetectionResponse, DetectionService, DetectionTicket, ImageSize,
    MergeOutcome, ModelCatalog, VideoFrameItem, VideoProperties, VideoRequest, VideoResponse,
    merge_detections,
};
pub use error::{DetectError, ExportError, MediaError};
pub use export::{ExportAnnotation, ExportFormat, ExportRequest, ExportService};
pub use hit::{Handle, HitResult, handle_at, hit_test};
pub use history::{HistoryLog, Snapshot};
pub use input::{KeyCode, Modifiers, PointerButton, PointerEvent};
pub use keybindings::KeyBindings;
pub use media::{
    IMAGE_EXTENSIONS, MediaBlob, MediaUpload, VIDEO_EXTENSIONS, is_image_filename,
    is_video_filename,
};
pub use model::{Annotation, AnnotationId, Label, LabelId, LabelRegistry, Point, Shape};
pub use session::Session;
pub use store::AnnotationStore;
pub use tools::{Gesture, Tool, handle_key, handle_pointer};
pub use transform::ViewTransform;
