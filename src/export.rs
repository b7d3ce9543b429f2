//! Export collaborator data shapes.
//!
//! The session builds an [`ExportRequest`] from the active image; the
//! collaborator encodes the requested formats and returns a downloadable
//! archive. Encoding correctness is out of scope here.

use serde::{Deserialize, Serialize};

use crate::detect::ImageSize;
use crate::error::ExportError;
use crate::model::{Annotation, LabelRegistry, Shape};

/// Annotation formats the collaborator can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    Yolo,
    Coco,
    Csv,
    Json,
}

/// One annotation in the export payload.
///
/// `bbox` is `[x1, y1, x2, y2]`; polygons are exported by their bounding
/// box with shape `"poly"`. Manual annotations carry confidence 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportAnnotation {
    pub id: u64,
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
    pub shape: String,
}

/// The full request handed to the export collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub annotations: Vec<ExportAnnotation>,
    pub image_size: ImageSize,
    pub formats: Vec<ExportFormat>,
    pub classes: Vec<String>,
}

impl ExportRequest {
    /// Build the payload from an annotation sequence.
    ///
    /// Point annotations have no box representation in the export formats
    /// and are skipped.
    pub fn from_annotations(
        annotations: &[Annotation],
        labels: &LabelRegistry,
        image_size: ImageSize,
        formats: Vec<ExportFormat>,
    ) -> Self {
        let mut exported = Vec::with_capacity(annotations.len());
        for ann in annotations {
            let Some(label) = labels.get(ann.label_id) else {
                continue;
            };
            let (bbox, shape) = match &ann.shape {
                Shape::Rect { x, y, w, h } => ([*x, *y, x + w, y + h], "rect"),
                Shape::Polygon { points } => {
                    let mut min = (f32::INFINITY, f32::INFINITY);
                    let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
                    for p in points {
                        min = (min.0.min(p.x), min.1.min(p.y));
                        max = (max.0.max(p.x), max.1.max(p.y));
                    }
                    ([min.0, min.1, max.0, max.1], "poly")
                }
                Shape::Point { .. } => continue,
            };
            exported.push(ExportAnnotation {
                id: ann.id,
                class_name: label.name.clone(),
                confidence: 1.0,
                bbox,
                shape: shape.to_string(),
            });
        }

        Self {
            annotations: exported,
            image_size,
            formats,
            classes: labels.iter().map(|l| l.name.clone()).collect(),
        }
    }

    /// Serialize the request body.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Collaborator interface producing a downloadable archive.
pub trait ExportService {
    fn export(&self, request: &ExportRequest) -> Result<Vec<u8>, ExportError>;
}

// ============================================================================
// Tests
// ============================================================================
