//! Detection bridge: payload shapes and merge logic.
//!
//! The detection service is an external collaborator; this module defines
//! the data shapes crossing that boundary (mirroring the AutoOD API JSON)
//! and the logic that merges returned detections into the annotation
//! model. Transport is the host's concern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::detect as defaults;
use crate::error::DetectError;
use crate::model::{Annotation, AnnotationId, LabelRegistry, Shape};
use crate::store::AnnotationStore;

// ============================================================================
// Wire Types
// ============================================================================

/// Pixel dimensions reported for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One machine-generated detection.
///
/// `bbox` is kept as raw JSON: the service contract says four absolute
/// pixel corners `[x1, y1, x2, y2]`, but a malformed entry must only
/// drop that single detection, never fail the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Detected class name.
    #[serde(rename = "class")]
    pub class_name: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box `[x1, y1, x2, y2]` in absolute image pixels.
    #[serde(default)]
    pub bbox: serde_json::Value,
    /// Shape hint from the service ("rect").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

impl Detection {
    /// Create a detection with a well-formed bbox (mostly for tests and
    /// synthetic merges).
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox: serde_json::json!(bbox),
            shape: Some("rect".to_string()),
        }
    }

    /// Parse the bbox into corner coordinates.
    ///
    /// Returns `None` unless the value is an array of exactly 4 finite
    /// numbers.
    pub fn bbox_corners(&self) -> Option<[f32; 4]> {
        let items = self.bbox.as_array()?;
        if items.len() != 4 {
            return None;
        }
        let mut corners = [0.0f32; 4];
        for (slot, value) in corners.iter_mut().zip(items) {
            let n = value.as_f64()?;
            if !n.is_finite() {
                return None;
            }
            *slot = n as f32;
        }
        Some(corners)
    }
}

/// Response for a single-image detection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub total_objects: usize,
    #[serde(default)]
    pub class_counts: HashMap<String, usize>,
}

impl DetectionResponse {
    /// Parse a response from its JSON body.
    pub fn from_json(json: &str) -> Result<Self, DetectError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-file result inside a batch response. `error` is set when that
/// item failed; the rest of the batch is unaffected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub total_objects: usize,
    #[serde(default)]
    pub class_counts: HashMap<String, usize>,
}

/// Response for a batch/folder detection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub results: Vec<BatchItem>,
    #[serde(default)]
    pub total_images: usize,
    #[serde(default)]
    pub successful_detections: usize,
    #[serde(default)]
    pub total_objects: usize,
}

/// Per-frame result inside a video response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoFrameItem {
    pub frame_number: u64,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub total_objects: usize,
}

/// Source video properties reported with a video response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoProperties {
    pub total_frames: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// Response for a video detection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub results: Vec<VideoFrameItem>,
    #[serde(default)]
    pub video_properties: VideoProperties,
}

/// Model catalog reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub models: Vec<String>,
    #[serde(rename = "default")]
    pub default_model: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![defaults::DEFAULT_MODEL.to_string()],
            default_model: defaults::DEFAULT_MODEL.to_string(),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Common detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectOptions {
    /// Model identifier, e.g. `"yolo/yolov8n.pt"`.
    pub model: String,
    /// Confidence threshold in `[0, 1]`.
    pub confidence: f32,
    /// Restrict results to these class names, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_filter: Option<Vec<String>>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            confidence: defaults::DEFAULT_CONFIDENCE,
            class_filter: None,
        }
    }
}

/// A single-image detection request: image bytes plus parameters.
#[derive(Debug, Clone, Copy)]
pub struct DetectRequest<'a> {
    pub filename: &'a str,
    pub image: &'a [u8],
    pub options: &'a DetectOptions,
}

/// One file inside a batch request.
#[derive(Debug, Clone, Copy)]
pub struct BatchItemRequest<'a> {
    pub filename: &'a str,
    pub image: &'a [u8],
}

/// A multi-image detection request.
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    pub items: Vec<BatchItemRequest<'a>>,
    pub options: &'a DetectOptions,
}

/// A video detection request with frame sampling caps.
#[derive(Debug, Clone, Copy)]
pub struct VideoRequest<'a> {
    pub filename: &'a str,
    pub video: &'a [u8],
    pub options: &'a DetectOptions,
    /// Process every Nth frame.
    pub frame_interval: u32,
    /// Stop after this many processed frames.
    pub max_frames: u32,
}

/// Collaborator interface to the external detection service.
///
/// Implementations own the transport; per-item failures inside a batch
/// are reported through [`BatchItem::error`], not as an `Err`.
pub trait DetectionService {
    fn detect(&self, request: &DetectRequest<'_>) -> Result<DetectionResponse, DetectError>;

    fn detect_batch(&self, request: &BatchRequest<'_>) -> Result<BatchResponse, DetectError>;

    fn detect_video(&self, request: &VideoRequest<'_>) -> Result<VideoResponse, DetectError>;

    /// Available model identifiers.
    fn models(&self) -> Result<ModelCatalog, DetectError> {
        Ok(ModelCatalog::default())
    }
}

/// Handle for an in-flight single-image detection.
///
/// The session hands one out per request; a result is only applied when
/// its ticket generation still matches, so a superseded request's late
/// result is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionTicket {
    pub generation: u64,
    pub image_id: String,
}

// ============================================================================
// Merge Logic
// ============================================================================

/// What a merge did to one image's annotation set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rectangles appended.
    pub added: usize,
    /// Detections dropped for malformed or degenerate bboxes.
    pub skipped: usize,
    /// Labels synthesized for unseen class names.
    pub labels_created: usize,
}

/// Aggregate result of a batch or video merge. Per-item failures never
/// abort the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items whose detections were merged.
    pub processed: usize,
    /// Items that reported an error or matched no session image.
    pub failed: usize,
    /// Total rectangles appended across all items.
    pub added: usize,
    /// Total labels synthesized across all items.
    pub labels_created: usize,
}

/// Merge detections into the active image's store as one committed
/// snapshot.
pub fn merge_detections(
    store: &mut AnnotationStore,
    labels: &mut LabelRegistry,
    detections: &[Detection],
) -> MergeOutcome {
    let (annotations, next_id) = store.merge_slots();
    let outcome = merge_into(annotations, next_id, labels, detections);
    if outcome.added > 0 {
        store.commit(labels);
    }
    log::info!(
        "🤖 Merged detections: {} added, {} skipped, {} labels created",
        outcome.added,
        outcome.skipped,
        outcome.labels_created
    );
    outcome
}

/// Merge detections into a stored (inactive) annotation sequence.
///
/// Inactive images have no live history; their log is rebuilt from the
/// stored set when they next become active.
pub(crate) fn merge_into_set(
    set: &mut Vec<Annotation>,
    labels: &mut LabelRegistry,
    detections: &[Detection],
) -> MergeOutcome {
    let mut next_id = set.iter().map(|a| a.id + 1).max().unwrap_or(1);
    merge_into(set, &mut next_id, labels, detections)
}

fn merge_into(
    annotations: &mut Vec<Annotation>,
    next_id: &mut AnnotationId,
    labels: &mut LabelRegistry,
    detections: &[Detection],
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for det in detections {
        let Some([x1, y1, x2, y2]) = det.bbox_corners() else {
            log::warn!("⚠️ Dropping detection '{}': malformed bbox", det.class_name);
            outcome.skipped += 1;
            continue;
        };
        let (w, h) = (x2 - x1, y2 - y1);
        if w <= 0.0 || h <= 0.0 {
            log::warn!(
                "⚠️ Dropping detection '{}': degenerate bbox ({}x{})",
                det.class_name,
                w,
                h
            );
            outcome.skipped += 1;
            continue;
        }

        // Case-insensitive resolution also covers labels synthesized
        // earlier in this same batch.
        let label_id = match labels.find_by_name(&det.class_name) {
            Some(label) => label.id,
            None => {
                outcome.labels_created += 1;
                labels.add(det.class_name.clone())
            }
        };
        let color = labels
            .get(label_id)
            .map(|l| l.color)
            .unwrap_or([1.0, 1.0, 1.0, 1.0]);

        let id = *next_id;
        *next_id += 1;
        annotations.push(Annotation::new(id, label_id, color, Shape::Rect { x: x1, y: y1, w, h }));
        outcome.added += 1;
    }

    outcome
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AnnotationStore, LabelRegistry) {
        let labels = LabelRegistry::new();
        let store = AnnotationStore::new(&labels);
        (store, labels)
    }

    #[test]
    fn test_merge_converts_corners_to_origin_size() {
        let (mut store, mut labels) = setup();
        let dets = [Detection::new("car", 0.9, [10.0, 10.0, 100.0, 80.0])];

        let outcome = merge_detections(&mut store, &mut labels, &dets);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.labels_created, 1);

        let ann = &store.annotations()[0];
        assert_eq!(
            ann.shape,
            Shape::Rect {
                x: 10.0,
                y: 10.0,
                w: 90.0,
                h: 70.0
            }
        );
        assert_eq!(labels.find_by_name("car").unwrap().id, ann.label_id);
    }

    #[test]
    fn test_degenerate_bbox_never_produces_annotation() {
        let (mut store, mut labels) = setup();
        let dets = [
            Detection::new("car", 0.9, [100.0, 10.0, 100.0, 80.0]), // zero width
            Detection::new("car", 0.9, [10.0, 80.0, 100.0, 20.0]),  // negative height
        ];

        let outcome = merge_detections(&mut store, &mut labels, &dets);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.skipped, 2);
        assert!(store.is_empty());
        // No annotation means no label synthesis and no snapshot
        assert!(labels.is_empty());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_malformed_bboxes_drop_single_detection() {
        let (mut store, mut labels) = setup();
        let mut short = Detection::new("car", 0.9, [0.0; 4]);
        short.bbox = serde_json::json!([1.0, 2.0, 3.0]);
        let mut not_array = Detection::new("dog", 0.8, [0.0; 4]);
        not_array.bbox = serde_json::json!("oops");
        let mut non_numeric = Detection::new("cat", 0.8, [0.0; 4]);
        non_numeric.bbox = serde_json::json!([1.0, 2.0, "three", 4.0]);
        let good = Detection::new("person", 0.7, [0.0, 0.0, 50.0, 50.0]);

        let outcome =
            merge_detections(&mut store, &mut labels, &[short, not_array, non_numeric, good]);
        assert_eq!(outcome.skipped, 3);
        assert_eq!(outcome.added, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_label_resolution_is_case_insensitive_within_batch() {
        let (mut store, mut labels) = setup();
        let dets = [
            Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0]),
            Detection::new("Car", 0.8, [20.0, 0.0, 30.0, 10.0]),
            Detection::new("person", 0.7, [40.0, 0.0, 50.0, 10.0]),
        ];

        let outcome = merge_detections(&mut store, &mut labels, &dets);
        assert_eq!(outcome.labels_created, 2);
        assert_eq!(labels.len(), 2);

        let anns = store.annotations();
        assert_eq!(anns[0].label_id, anns[1].label_id);
        assert_ne!(anns[0].label_id, anns[2].label_id);
    }

    #[test]
    fn test_merge_is_one_undoable_snapshot() {
        let (mut store, mut labels) = setup();
        let dets = [
            Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0]),
            Detection::new("person", 0.8, [20.0, 0.0, 30.0, 10.0]),
        ];
        merge_detections(&mut store, &mut labels, &dets);
        assert_eq!(store.len(), 2);

        assert!(store.undo(&mut labels));
        assert!(store.is_empty());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_merge_into_set_allocates_past_existing_ids() {
        let mut labels = LabelRegistry::new();
        let car = labels.add("car");
        let color = labels.get(car).unwrap().color;
        let mut set = vec![Annotation::new(
            5,
            car,
            color,
            Shape::Rect {
                x: 0.0,
                y: 0.0,
                w: 10.0,
                h: 10.0,
            },
        )];

        merge_into_set(
            &mut set,
            &mut labels,
            &[Detection::new("car", 0.9, [0.0, 0.0, 20.0, 20.0])],
        );
        assert_eq!(set.len(), 2);
        assert!(set[1].id > 5);
    }

    #[test]
    fn test_response_parsing_matches_service_json() {
        let json = r#"{
            "detections": [
                {"class": "car", "confidence": 0.92, "bbox": [10, 10, 100, 80], "shape": "rect"}
            ],
            "image_size": {"width": 640, "height": 480},
            "total_objects": 1,
            "class_counts": {"car": 1}
        }"#;
        let response = DetectionResponse::from_json(json).unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.image_size.width, 640);
        assert_eq!(
            response.detections[0].bbox_corners(),
            Some([10.0, 10.0, 100.0, 80.0])
        );
    }

    #[test]
    fn test_batch_item_error_parsing() {
        let json = r#"{
            "results": [
                {"filename": "a.jpg", "detections": [], "error": "File too large - maximum 50MB"},
                {"filename": "b.jpg", "detections": [
                    {"class": "dog", "confidence": 0.5, "bbox": [0, 0, 5, 5]}
                ]}
            ],
            "total_images": 2,
            "successful_detections": 1,
            "total_objects": 1
        }"#;
        let response: BatchResponse = serde_json::from_str(json).unwrap();
        assert!(response.results[0].error.is_some());
        assert!(response.results[1].error.is_none());
        assert_eq!(response.successful_detections, 1);
    }
}
