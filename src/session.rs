//! Session controller: images, navigation, detection, and the owned
//! editor state.
//!
//! All UI-facing state (active tool, selection, zoom/pan, active label)
//! lives in this one object and is threaded through the tool handlers;
//! there are no ambient globals. The session also owns the per-image
//! annotation map, the active image's store, and the media blobs whose
//! release bounds memory growth.

use std::collections::HashMap;

use web_time::Instant;

use crate::config::EditorConfig;
use crate::constants::media;
use crate::detect::{
    self, BatchItemRequest, BatchOutcome, BatchRequest, DetectOptions, DetectRequest, Detection,
    DetectionResponse, DetectionService, DetectionTicket, ImageSize, MergeOutcome, VideoRequest,
};
use crate::error::{DetectError, MediaError};
use crate::export::{ExportFormat, ExportRequest};
use crate::input::{KeyCode, Modifiers, PointerEvent};
use crate::keybindings::KeyBindings;
use crate::media::{MediaBlob, MediaUpload};
use crate::model::{Annotation, AnnotationId, LabelId, LabelRegistry, Point};
use crate::store::AnnotationStore;
use crate::tools::{self, Gesture, Tool};
use crate::transform::ViewTransform;

/// One image (or extracted video frame) in the session.
#[derive(Debug)]
pub(crate) struct ImageEntry {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Retained upload bytes. Video frames extracted by the detection
    /// service carry no bytes of their own.
    pub blob: Option<MediaBlob>,
}

/// The annotation editing session.
pub struct Session {
    pub(crate) images: Vec<ImageEntry>,
    pub(crate) current: usize,
    /// Stored annotation sets for images that are not active.
    pub(crate) stored: HashMap<String, Vec<Annotation>>,
    /// Working set and history for the active image.
    pub(crate) store: AnnotationStore,
    pub(crate) labels: LabelRegistry,

    // UI state
    pub(crate) tool: Tool,
    pub(crate) active_label: Option<LabelId>,
    pub(crate) selection: Option<AnnotationId>,
    pub(crate) transform: ViewTransform,
    pub(crate) canvas_size: (f32, f32),
    pub(crate) gesture: Gesture,
    pub(crate) bindings: KeyBindings,

    // Detection guard
    video: Option<MediaBlob>,
    detect_busy: bool,
    detect_generation: u64,

    config: EditorConfig,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let labels = LabelRegistry::new();
        let store = AnnotationStore::with_capacity(Vec::new(), &labels, config.max_history);
        Self {
            images: Vec::new(),
            current: 0,
            stored: HashMap::new(),
            store,
            labels,
            tool: Tool::default(),
            active_label: None,
            selection: None,
            transform: ViewTransform::identity(),
            canvas_size: (0.0, 0.0),
            gesture: Gesture::Idle,
            bindings: KeyBindings::default(),
            video: None,
            detect_busy: false,
            detect_generation: 0,
            config,
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Feed a pointer event to the active tool.
    pub fn pointer(&mut self, event: PointerEvent) {
        tools::handle_pointer(self, event);
    }

    /// Feed a key press to the editor.
    pub fn key(&mut self, key: KeyCode, modifiers: Modifiers) {
        tools::handle_key(self, key, modifiers);
    }

    /// Tell the editor how large the canvas viewport is.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.canvas_size = (width, height);
    }

    // ========================================================================
    // View
    // ========================================================================

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn zoom_in(&mut self) {
        self.transform.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.transform.zoom_out();
    }

    pub fn fit_to_screen(&mut self) {
        self.transform.fit_to_screen();
    }

    /// Zoom keeping the image point under `cursor` fixed.
    pub fn zoom_to_cursor(&mut self, new_zoom: f32, cursor: Point) {
        self.transform.zoom_to_cursor(new_zoom, cursor, self.canvas_size);
    }

    // ========================================================================
    // Tools, labels, selection
    // ========================================================================

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch the active tool, cancelling any gesture in progress.
    pub fn select_tool(&mut self, tool: Tool) {
        tools::cancel_gesture(self);
        self.tool = tool;
        log::debug!("🖌️ Tool: {}", tool.name());
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    /// Create a label and make it active.
    pub fn add_label(&mut self, name: impl Into<String>) -> LabelId {
        let id = self.labels.add(name);
        self.active_label = Some(id);
        id
    }

    /// Delete a label, cascading to its annotations as one undoable step.
    pub fn remove_label(&mut self, id: LabelId) -> usize {
        let removed = self.store.remove_label_cascade(id, &mut self.labels);
        if self.active_label == Some(id) {
            self.active_label = None;
        }
        self.prune_selection();
        removed
    }

    /// Recolor a label, cascading to its annotations. One undoable step.
    pub fn set_label_color(&mut self, id: LabelId, color: [f32; 4]) -> bool {
        self.store.set_label_color(id, color, &mut self.labels)
    }

    pub fn active_label_id(&self) -> Option<LabelId> {
        self.active_label
    }

    pub fn set_active_label(&mut self, id: Option<LabelId>) {
        self.active_label = id;
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    /// Delete the selected annotation. One undoable step.
    pub fn delete_selection(&mut self) -> bool {
        let Some(id) = self.selection.take() else {
            return false;
        };
        self.store.remove(id, &self.labels).is_some()
    }

    fn prune_selection(&mut self) {
        if let Some(id) = self.selection {
            if self.store.get(id).is_none() {
                self.selection = None;
            }
        }
    }

    // ========================================================================
    // Annotations and history
    // ========================================================================

    /// The active image's annotation sequence, in z-order.
    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// The stored annotation set for any image in the session.
    pub fn stored_annotations(&self, image_id: &str) -> Option<&[Annotation]> {
        if self.current_image() == Some(image_id) {
            return Some(self.store.annotations());
        }
        self.stored.get(image_id).map(|v| v.as_slice())
    }

    /// Replace an image's annotation set wholesale, e.g. when a
    /// persistence collaborator loads saved annotations. For the active
    /// image this restarts its history at the restored state.
    pub fn restore_annotations(&mut self, image_id: &str, annotations: Vec<Annotation>) -> bool {
        if self.current_image() == Some(image_id) {
            self.store =
                AnnotationStore::with_capacity(annotations, &self.labels, self.config.max_history);
            self.selection = None;
            return true;
        }
        let Some(set) = self.stored.get_mut(image_id) else {
            return false;
        };
        *set = annotations;
        true
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.store.undo(&mut self.labels);
        if moved {
            self.prune_selection();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.store.redo(&mut self.labels);
        if moved {
            self.prune_selection();
        }
        moved
    }

    // ========================================================================
    // Images and navigation
    // ========================================================================

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Identifier of the active image.
    pub fn current_image(&self) -> Option<&str> {
        self.images.get(self.current).map(|e| e.id.as_str())
    }

    /// Pixel size of the active image for coordinate math.
    pub(crate) fn image_size(&self) -> (f32, f32) {
        self.images
            .get(self.current)
            .map(|e| (e.width as f32, e.height as f32))
            .unwrap_or((0.0, 0.0))
    }

    /// Pixel size of the active image.
    pub fn current_image_size(&self) -> Option<ImageSize> {
        self.images.get(self.current).map(|e| ImageSize {
            width: e.width,
            height: e.height,
        })
    }

    pub fn next_image(&mut self) -> bool {
        self.advance(1)
    }

    pub fn previous_image(&mut self) -> bool {
        self.advance(-1)
    }

    /// Move to a neighboring image: the outgoing set is saved into the
    /// per-image map and the incoming image's history restarts at a
    /// single snapshot of its stored set.
    fn advance(&mut self, delta: isize) -> bool {
        let target = self.current as isize + delta;
        if target < 0 || target as usize >= self.images.len() {
            return false;
        }
        tools::cancel_gesture(self);

        let outgoing = &self.images[self.current];
        self.stored
            .insert(outgoing.id.clone(), self.store.annotations().to_vec());

        self.current = target as usize;
        let incoming = &self.images[self.current];
        let annotations = self.stored.get(&incoming.id).cloned().unwrap_or_default();
        self.store =
            AnnotationStore::with_capacity(annotations, &self.labels, self.config.max_history);
        self.selection = None;
        self.transform.fit_to_screen();
        log::info!(
            "🖼️ Image {}/{}: {}",
            self.current + 1,
            self.images.len(),
            incoming.id
        );
        true
    }

    /// Replace the session contents with the given image uploads.
    ///
    /// Every upload is validated before any state changes; previously
    /// retained media is released afterwards. Each new image starts with
    /// an empty annotation set.
    pub fn load_images(&mut self, uploads: Vec<MediaUpload>) -> Result<usize, MediaError> {
        let mut validated = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            let dims = upload.validate_image()?;
            validated.push(dims);
        }

        self.release_media();
        self.images = uploads
            .into_iter()
            .zip(validated)
            .map(|(upload, (width, height))| ImageEntry {
                blob: Some(MediaBlob::new(upload.name.clone(), upload.bytes)),
                id: upload.name,
                width,
                height,
            })
            .collect();
        self.stored = self
            .images
            .iter()
            .map(|e| (e.id.clone(), Vec::new()))
            .collect();
        self.current = 0;
        self.store =
            AnnotationStore::with_capacity(Vec::new(), &self.labels, self.config.max_history);
        self.selection = None;
        self.gesture = Gesture::Idle;
        self.transform.fit_to_screen();
        log::info!("📂 Loaded {} images", self.images.len());
        Ok(self.images.len())
    }

    /// Replace the session contents with a video upload.
    ///
    /// Frames are extracted by the detection service; the image list
    /// stays empty until a video detection response introduces them.
    pub fn load_video(&mut self, upload: MediaUpload) -> Result<(), MediaError> {
        upload.validate_video()?;

        self.release_media();
        self.images = Vec::new();
        self.stored = HashMap::new();
        self.current = 0;
        self.store =
            AnnotationStore::with_capacity(Vec::new(), &self.labels, self.config.max_history);
        self.selection = None;
        self.gesture = Gesture::Idle;
        self.transform.fit_to_screen();
        self.video = Some(MediaBlob::new(upload.name, upload.bytes));
        log::info!("🎞️ Loaded video");
        Ok(())
    }

    /// Release every retained media blob. Called when uploads are
    /// superseded and when the session ends; independent of history.
    fn release_media(&mut self) {
        for entry in &mut self.images {
            if let Some(blob) = entry.blob.as_mut() {
                blob.release();
            }
        }
        if let Some(video) = self.video.as_mut() {
            video.release();
        }
        self.video = None;
    }

    /// Explicitly end the session, releasing retained media.
    pub fn end(&mut self) {
        self.release_media();
        log::info!("👋 Session ended");
    }

    // ========================================================================
    // Detection bridge
    // ========================================================================

    pub fn detection_busy(&self) -> bool {
        self.detect_busy
    }

    /// Detection options seeded from the session configuration.
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            model: self.config.default_model.clone(),
            confidence: self.config.default_confidence,
            class_filter: None,
        }
    }

    /// Begin a single-image detection for the active image.
    ///
    /// The busy flag serializes detections: a second request while one is
    /// outstanding is refused rather than queued.
    pub fn request_detection(&mut self) -> Result<DetectionTicket, DetectError> {
        if self.detect_busy {
            return Err(DetectError::Busy);
        }
        let entry = self.images.get(self.current).ok_or(MediaError::NoImage)?;
        if !entry.blob.as_ref().is_some_and(|b| !b.is_released()) {
            return Err(MediaError::NoImage.into());
        }
        self.detect_generation += 1;
        self.detect_busy = true;
        Ok(DetectionTicket {
            generation: self.detect_generation,
            image_id: entry.id.clone(),
        })
    }

    /// Apply the outcome of a detection started with
    /// [`request_detection`](Self::request_detection).
    ///
    /// Only the most recently issued ticket is honored; a superseded
    /// result is rejected without touching annotation state. A service
    /// error clears the busy flag and leaves state unchanged.
    pub fn apply_detection(
        &mut self,
        ticket: &DetectionTicket,
        result: Result<DetectionResponse, DetectError>,
    ) -> Result<MergeOutcome, DetectError> {
        if ticket.generation != self.detect_generation {
            log::warn!(
                "⚠️ Dropping stale detection result (generation {})",
                ticket.generation
            );
            return Err(DetectError::Stale {
                generation: ticket.generation,
            });
        }
        self.detect_busy = false;
        let response = result?;
        match self.merge_for_image(&ticket.image_id, &response.detections) {
            Some(outcome) => Ok(outcome),
            None => {
                log::warn!("⚠️ Detection target '{}' left the session", ticket.image_id);
                Ok(MergeOutcome::default())
            }
        }
    }

    /// Run a single-image detection synchronously against a service.
    pub fn auto_annotate(
        &mut self,
        service: &dyn DetectionService,
        options: &DetectOptions,
    ) -> Result<MergeOutcome, DetectError> {
        let ticket = self.request_detection()?;
        let started = Instant::now();
        let result = match self.images.get(self.current).and_then(|e| e.blob.as_ref()) {
            Some(blob) => service.detect(&DetectRequest {
                filename: &ticket.image_id,
                image: blob.bytes(),
                options,
            }),
            None => Err(MediaError::NoImage.into()),
        };
        log::debug!("🤖 Detection call took {:?}", started.elapsed());
        self.apply_detection(&ticket, result)
    }

    /// Run detection across every image in the session.
    ///
    /// Items fail independently: one image's error is counted and skipped
    /// without aborting the rest.
    pub fn auto_annotate_all(
        &mut self,
        service: &dyn DetectionService,
        options: &DetectOptions,
    ) -> Result<BatchOutcome, DetectError> {
        if self.detect_busy {
            return Err(DetectError::Busy);
        }
        if self.images.is_empty() {
            return Err(MediaError::NoImage.into());
        }
        self.detect_busy = true;

        let cap = self.config.max_batch_images.min(media::MAX_BATCH_IMAGES);
        let response = {
            let items: Vec<BatchItemRequest<'_>> = self
                .images
                .iter()
                .filter_map(|e| {
                    let blob = e.blob.as_ref()?;
                    (!blob.is_released()).then(|| BatchItemRequest {
                        filename: &e.id,
                        image: blob.bytes(),
                    })
                })
                .take(cap)
                .collect();
            if self.images.len() > cap {
                log::warn!(
                    "⚠️ Batch capped at {} of {} images",
                    cap,
                    self.images.len()
                );
            }
            let started = Instant::now();
            let response = service.detect_batch(&BatchRequest { items, options });
            log::debug!("🤖 Batch detection call took {:?}", started.elapsed());
            response
        };
        self.detect_busy = false;
        let response = response?;

        let mut outcome = BatchOutcome::default();
        for item in &response.results {
            if item.error.is_some() {
                log::warn!(
                    "⚠️ Batch item '{}' failed: {}",
                    item.filename,
                    item.error.as_deref().unwrap_or("unknown error")
                );
                outcome.failed += 1;
                continue;
            }
            match self.merge_for_image(&item.filename, &item.detections) {
                Some(merge) => {
                    outcome.processed += 1;
                    outcome.added += merge.added;
                    outcome.labels_created += merge.labels_created;
                }
                None => outcome.failed += 1,
            }
        }
        log::info!(
            "🤖 Batch merge: {} processed, {} failed, {} annotations",
            outcome.processed,
            outcome.failed,
            outcome.added
        );
        Ok(outcome)
    }

    /// Run detection over the loaded video, introducing one session image
    /// per processed frame.
    pub fn auto_annotate_video(
        &mut self,
        service: &dyn DetectionService,
        options: &DetectOptions,
        frame_interval: u32,
        max_frames: u32,
    ) -> Result<BatchOutcome, DetectError> {
        if self.detect_busy {
            return Err(DetectError::Busy);
        }
        let Some(video) = self.video.as_ref().filter(|v| !v.is_released()) else {
            return Err(MediaError::NoImage.into());
        };

        self.detect_busy = true;
        let response = service.detect_video(&VideoRequest {
            filename: video.name(),
            video: video.bytes(),
            options,
            frame_interval,
            max_frames,
        });
        self.detect_busy = false;
        let response = response?;

        let (width, height) = (
            response.video_properties.width,
            response.video_properties.height,
        );
        let mut outcome = BatchOutcome::default();
        for frame in &response.results {
            if frame.error.is_some() {
                outcome.failed += 1;
                continue;
            }
            let id = format!("frame_{:06}", frame.frame_number);
            if !self.images.iter().any(|e| e.id == id) {
                self.images.push(ImageEntry {
                    id: id.clone(),
                    width,
                    height,
                    blob: None,
                });
                self.stored.insert(id.clone(), Vec::new());
            }
            match self.merge_for_image(&id, &frame.detections) {
                Some(merge) => {
                    outcome.processed += 1;
                    outcome.added += merge.added;
                    outcome.labels_created += merge.labels_created;
                }
                None => outcome.failed += 1,
            }
        }
        log::info!(
            "🎞️ Video merge: {} frames, {} failed, {} annotations",
            outcome.processed,
            outcome.failed,
            outcome.added
        );
        Ok(outcome)
    }

    /// Merge detections into whichever set holds `image_id`: the active
    /// store (one committed snapshot) or a stored set.
    fn merge_for_image(&mut self, image_id: &str, detections: &[Detection]) -> Option<MergeOutcome> {
        if self.current_image() == Some(image_id) {
            return Some(detect::merge_detections(
                &mut self.store,
                &mut self.labels,
                detections,
            ));
        }
        let set = self.stored.get_mut(image_id)?;
        Some(detect::merge_into_set(set, &mut self.labels, detections))
    }

    // ========================================================================
    // Export collaborator
    // ========================================================================

    /// Build the export request for the active image. `None` without an
    /// image.
    pub fn export_request(&self, formats: Vec<ExportFormat>) -> Option<ExportRequest> {
        let image_size = self.current_image_size()?;
        Some(ExportRequest::from_annotations(
            self.store.annotations(),
            &self.labels,
            image_size,
            formats,
        ))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_media();
    }
}

// ============================================================================
// Test fixtures
// ============================================================================

#[cfg(test)]
impl Session {
    /// Build a session with synthetic image entries, bypassing upload
    /// validation. Blob bytes are placeholders.
    pub(crate) fn with_test_images(images: &[(&str, u32, u32)]) -> Self {
        let mut session = Session::new();
        session.images = images
            .iter()
            .map(|(id, width, height)| ImageEntry {
                id: (*id).to_string(),
                width: *width,
                height: *height,
                blob: Some(MediaBlob::new(*id, vec![0u8; 16])),
            })
            .collect();
        session.stored = session
            .images
            .iter()
            .map(|e| (e.id.clone(), Vec::new()))
            .collect();
        // Canvas matches the first image so canvas and image coordinates
        // coincide at identity transform.
        if let Some(first) = session.images.first() {
            session.canvas_size = (first.width as f32, first.height as f32);
        }
        session
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BatchItem, BatchResponse, VideoFrameItem, VideoProperties, VideoResponse};
    use crate::model::Shape;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Shape {
        Shape::Rect { x, y, w, h }
    }

    fn add_rect(session: &mut Session, shape: Shape) -> AnnotationId {
        let label = session
            .active_label()
            .cloned()
            .expect("test session needs an active label");
        session.store.add(&label, shape, &session.labels)
    }

    /// Detection service stub with canned responses.
    struct StubService {
        single: Result<DetectionResponse, String>,
        batch: Option<BatchResponse>,
        video: Option<VideoResponse>,
    }

    impl StubService {
        fn with_single(response: DetectionResponse) -> Self {
            Self {
                single: Ok(response),
                batch: None,
                video: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                single: Err(message.to_string()),
                batch: None,
                video: None,
            }
        }
    }

    impl DetectionService for StubService {
        fn detect(&self, _request: &DetectRequest<'_>) -> Result<DetectionResponse, DetectError> {
            self.single
                .clone()
                .map_err(DetectError::service)
        }

        fn detect_batch(&self, _request: &BatchRequest<'_>) -> Result<BatchResponse, DetectError> {
            self.batch
                .clone()
                .ok_or_else(|| DetectError::service("no batch response configured"))
        }

        fn detect_video(&self, _request: &VideoRequest<'_>) -> Result<VideoResponse, DetectError> {
            self.video
                .clone()
                .ok_or_else(|| DetectError::service("no video response configured"))
        }
    }

    #[test]
    fn test_navigation_preserves_outgoing_set() {
        init_logs();
        let mut session = Session::with_test_images(&[("a.png", 200, 100), ("b.png", 200, 100)]);
        session.add_label("car");
        add_rect(&mut session, rect(10.0, 10.0, 50.0, 40.0));

        let before = session.annotations().to_vec();
        assert!(session.next_image());
        assert_eq!(session.current_image(), Some("b.png"));
        assert!(session.annotations().is_empty());
        assert_eq!(session.stored_annotations("a.png").unwrap(), &before[..]);

        assert!(session.previous_image());
        assert_eq!(session.annotations(), &before[..]);
    }

    #[test]
    fn test_navigation_resets_history() {
        let mut session = Session::with_test_images(&[("a.png", 200, 100), ("b.png", 200, 100)]);
        session.add_label("car");
        add_rect(&mut session, rect(10.0, 10.0, 50.0, 40.0));
        assert!(session.store().can_undo());

        session.next_image();
        session.previous_image();
        // History does not persist across navigation.
        assert!(!session.store().can_undo());
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_advance_at_ends_is_noop() {
        let mut session = Session::with_test_images(&[("a.png", 200, 100)]);
        assert!(!session.previous_image());
        assert!(!session.next_image());
        assert_eq!(session.current_image(), Some("a.png"));
    }

    #[test]
    fn test_remove_label_clears_selection_and_active() {
        let mut session = Session::with_test_images(&[("a.png", 200, 100)]);
        let car = session.add_label("car");
        let id = add_rect(&mut session, rect(0.0, 0.0, 20.0, 20.0));
        session.selection = Some(id);

        let removed = session.remove_label(car);
        assert_eq!(removed, 1);
        assert_eq!(session.selection(), None);
        assert_eq!(session.active_label_id(), None);

        // One undo brings back both the label and the annotation
        assert!(session.undo());
        assert_eq!(session.annotations().len(), 1);
        assert!(session.labels().get(car).is_some());
    }

    #[test]
    fn test_auto_annotate_merges_into_active_image() {
        init_logs();
        let mut session = Session::with_test_images(&[("a.png", 640, 480)]);
        let response = DetectionResponse {
            detections: vec![Detection::new("car", 0.9, [10.0, 10.0, 100.0, 80.0])],
            ..DetectionResponse::default()
        };
        let service = StubService::with_single(response);

        let outcome = session
            .auto_annotate(&service, &session.detect_options())
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.labels_created, 1);
        assert!(!session.detection_busy());

        let ann = &session.annotations()[0];
        assert_eq!(ann.shape, rect(10.0, 10.0, 90.0, 70.0));
        assert_eq!(
            session.labels().find_by_name("car").unwrap().id,
            ann.label_id
        );
    }

    #[test]
    fn test_detection_failure_leaves_state_unchanged_and_retryable() {
        let mut session = Session::with_test_images(&[("a.png", 640, 480)]);
        let failing = StubService::failing("connection refused");

        let err = session
            .auto_annotate(&failing, &session.detect_options())
            .unwrap_err();
        assert!(matches!(err, DetectError::Service(_)));
        assert!(session.annotations().is_empty());
        assert!(!session.detection_busy());

        // Retry succeeds once the service recovers
        let service = StubService::with_single(DetectionResponse {
            detections: vec![Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0])],
            ..DetectionResponse::default()
        });
        let outcome = session
            .auto_annotate(&service, &session.detect_options())
            .unwrap();
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn test_busy_flag_refuses_second_detection() {
        let mut session = Session::with_test_images(&[("a.png", 640, 480)]);
        let _ticket = session.request_detection().unwrap();
        assert!(session.detection_busy());
        assert!(matches!(
            session.request_detection(),
            Err(DetectError::Busy)
        ));
    }

    #[test]
    fn test_stale_detection_result_is_dropped() {
        let mut session = Session::with_test_images(&[("a.png", 640, 480)]);
        let old = session.request_detection().unwrap();
        // The first request errors out, freeing the guard for a new one.
        let _ = session.apply_detection(&old, Err(DetectError::service("timeout")));
        let fresh = session.request_detection().unwrap();

        let response = DetectionResponse {
            detections: vec![Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0])],
            ..DetectionResponse::default()
        };
        // The old ticket's late result must not apply.
        assert!(matches!(
            session.apply_detection(&old, Ok(response.clone())),
            Err(DetectError::Stale { .. })
        ));
        assert!(session.annotations().is_empty());

        // The fresh ticket applies normally.
        let outcome = session.apply_detection(&fresh, Ok(response)).unwrap();
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn test_batch_partial_failure_reports_counts() {
        init_logs();
        let mut session = Session::with_test_images(&[
            ("a.png", 640, 480),
            ("b.png", 640, 480),
            ("c.png", 640, 480),
        ]);
        let service = StubService {
            single: Err("unused".to_string()),
            batch: Some(BatchResponse {
                results: vec![
                    BatchItem {
                        filename: "a.png".to_string(),
                        detections: vec![Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0])],
                        ..BatchItem::default()
                    },
                    BatchItem {
                        filename: "b.png".to_string(),
                        error: Some("Invalid image file - could not decode".to_string()),
                        ..BatchItem::default()
                    },
                    BatchItem {
                        filename: "c.png".to_string(),
                        detections: vec![
                            Detection::new("car", 0.8, [0.0, 0.0, 10.0, 10.0]),
                            Detection::new("person", 0.7, [20.0, 0.0, 30.0, 10.0]),
                        ],
                        ..BatchItem::default()
                    },
                ],
                total_images: 3,
                successful_detections: 2,
                total_objects: 3,
            }),
            video: None,
        };

        let outcome = session
            .auto_annotate_all(&service, &session.detect_options())
            .unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.added, 3);

        // Active image merged through the store with one snapshot
        assert_eq!(session.annotations().len(), 1);
        assert!(session.store().can_undo());
        // Inactive image's stored set was updated independently
        assert_eq!(session.stored_annotations("c.png").unwrap().len(), 2);
        assert!(session.stored_annotations("b.png").unwrap().is_empty());
        // Both "car" detections share one label across the batch
        assert_eq!(session.labels().len(), 2);
    }

    #[test]
    fn test_video_merge_introduces_frames() {
        let mut session = Session::new();
        session
            .load_video(MediaUpload::new("clip.mp4", vec![0u8; 2048]))
            .unwrap();
        assert_eq!(session.image_count(), 0);

        let service = StubService {
            single: Err("unused".to_string()),
            batch: None,
            video: Some(VideoResponse {
                results: vec![
                    VideoFrameItem {
                        frame_number: 0,
                        detections: vec![Detection::new("car", 0.9, [0.0, 0.0, 10.0, 10.0])],
                        ..VideoFrameItem::default()
                    },
                    VideoFrameItem {
                        frame_number: 30,
                        detections: vec![Detection::new("car", 0.8, [5.0, 5.0, 15.0, 15.0])],
                        ..VideoFrameItem::default()
                    },
                ],
                video_properties: VideoProperties {
                    total_frames: 60,
                    fps: 30.0,
                    width: 1280,
                    height: 720,
                },
            }),
        };

        let outcome = session
            .auto_annotate_video(&service, &session.detect_options(), 30, 100)
            .unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(session.image_count(), 2);
        assert_eq!(session.current_image(), Some("frame_000000"));
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.stored_annotations("frame_000030").unwrap().len(), 1);
        assert_eq!(
            session.current_image_size(),
            Some(ImageSize {
                width: 1280,
                height: 720
            })
        );
    }

    #[test]
    fn test_load_images_validates_before_mutating() {
        let mut session = Session::with_test_images(&[("old.png", 100, 100)]);
        session.add_label("car");
        add_rect(&mut session, rect(0.0, 0.0, 20.0, 20.0));

        // One bad upload rejects the whole batch, leaving the session as-is
        let err = session.load_images(vec![MediaUpload::new("junk.txt", vec![0u8; 8])]);
        assert!(matches!(err, Err(MediaError::UnsupportedType { .. })));
        assert_eq!(session.current_image(), Some("old.png"));
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_end_releases_media() {
        let mut session = Session::with_test_images(&[("a.png", 100, 100)]);
        session.end();
        assert!(
            session
                .images
                .iter()
                .all(|e| e.blob.as_ref().is_none_or(|b| b.is_released()))
        );
        // A detection request now has no bytes to send
        assert!(session.request_detection().is_err());
    }

    #[test]
    fn test_restore_annotations() {
        let mut session = Session::with_test_images(&[("a.png", 200, 100), ("b.png", 200, 100)]);
        let car = session.add_label("car");
        let color = session.labels().get(car).unwrap().color;
        let saved = vec![Annotation::new(1, car, color, rect(5.0, 5.0, 30.0, 30.0))];

        // Inactive image: goes to the stored map
        assert!(session.restore_annotations("b.png", saved.clone()));
        assert_eq!(session.stored_annotations("b.png").unwrap().len(), 1);

        // Active image: becomes the working set with a fresh history
        assert!(session.restore_annotations("a.png", saved));
        assert_eq!(session.annotations().len(), 1);
        assert!(!session.store().can_undo());

        assert!(!session.restore_annotations("missing.png", Vec::new()));
    }

    #[test]
    fn test_export_request_shapes() {
        let mut session = Session::with_test_images(&[("a.png", 640, 480)]);
        session.add_label("car");
        add_rect(&mut session, rect(10.0, 10.0, 90.0, 70.0));
        add_rect(
            &mut session,
            Shape::Polygon {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(50.0, 0.0),
                    Point::new(25.0, 40.0),
                ],
            },
        );
        add_rect(&mut session, Shape::Point { x: 5.0, y: 5.0 });

        let request = session
            .export_request(vec![ExportFormat::Yolo, ExportFormat::Coco])
            .unwrap();
        // Points are not exported; rect and polygon are
        assert_eq!(request.annotations.len(), 2);
        assert_eq!(request.annotations[0].shape, "rect");
        assert_eq!(request.annotations[0].bbox, [10.0, 10.0, 100.0, 80.0]);
        assert_eq!(request.annotations[1].shape, "poly");
        assert_eq!(request.classes, vec!["car".to_string()]);
        assert_eq!(request.image_size.width, 640);
    }
}
