//! Tool state machine: pointer and keyboard events become store mutations.
//!
//! One gesture runs at a time. In-progress gestures mutate the working
//! annotation sequence directly for live feedback; a single history
//! snapshot is committed when the gesture finishes. Escape always
//! returns to `Idle` and discards uncommitted changes.

use crate::constants::threshold;
use crate::hit;
use crate::input::{KeyCode, Modifiers, PointerButton, PointerEvent};
use crate::model::{AnnotationId, Label, Point, Shape};
use crate::session::Session;

/// Annotation tools available in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Selection tool for selecting, moving and resizing annotations
    #[default]
    Select,
    /// Rectangle annotation tool
    Rect,
    /// Polygon annotation tool
    Polygon,
    /// Point annotation tool
    Point,
}

impl Tool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Rect => "Rectangle",
            Tool::Polygon => "Polygon",
            Tool::Point => "Point",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [Tool] {
        &[Tool::Select, Tool::Rect, Tool::Polygon, Tool::Point]
    }

    /// Check if this tool creates annotations (not Select).
    pub fn is_drawing_tool(&self) -> bool {
        !matches!(self, Tool::Select)
    }
}

/// The pointer gesture currently in progress.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging out a new rectangle (image space).
    Drawing { anchor: Point, current: Point },
    /// Translating the view (canvas space).
    Panning { last: Point },
    /// Moving a rectangle, holding the grab offset from its origin.
    DraggingAnnotation {
        id: AnnotationId,
        grab_dx: f32,
        grab_dy: f32,
        moved: bool,
    },
    /// Resizing a rectangle by one corner handle.
    ResizingAnnotation {
        id: AnnotationId,
        handle: hit::Handle,
        changed: bool,
    },
    /// Collecting polygon vertices across clicks.
    AccumulatingPolygon { points: Vec<Point> },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

// ============================================================================
// Pointer Handling
// ============================================================================

/// Feed one pointer event through the state machine.
pub fn handle_pointer(session: &mut Session, event: PointerEvent) {
    if session.current_image().is_none() {
        return;
    }
    match event {
        PointerEvent::Down {
            pos,
            button,
            modifiers,
        } => pointer_down(session, pos, button, modifiers),
        PointerEvent::Moved { pos } => pointer_moved(session, pos),
        PointerEvent::Up { pos } => pointer_up(session, pos),
        PointerEvent::DoubleClick { pos } => double_click(session, pos),
    }
}

fn pointer_down(session: &mut Session, pos: Point, button: PointerButton, modifiers: Modifiers) {
    let image_size = session.image_size();
    let canvas_size = session.canvas_size;

    // Polygon accumulation survives pointer-ups; every further click
    // appends a vertex.
    if let Gesture::AccumulatingPolygon { points } = &mut session.gesture {
        if button == PointerButton::Left {
            if let Some(p) = session
                .transform
                .to_image_space(pos, image_size, canvas_size)
            {
                points.push(p);
                log::debug!("✏️ Polygon vertex {} at ({:.1}, {:.1})", points.len(), p.x, p.y);
            }
        }
        return;
    }

    if !session.gesture.is_idle() {
        return;
    }

    // Middle button or Alt+left pans regardless of the active tool and
    // never touches annotations.
    if button == PointerButton::Middle || (button == PointerButton::Left && modifiers.alt) {
        session.gesture = Gesture::Panning { last: pos };
        log::debug!("🖐️ Pan started at ({:.1}, {:.1})", pos.x, pos.y);
        return;
    }
    if button != PointerButton::Left {
        return;
    }

    match session.tool {
        Tool::Select => {
            let hit = hit::hit_test(
                session.store.annotations(),
                pos,
                &session.transform,
                image_size,
                canvas_size,
            );
            match hit {
                Some(hit::HitResult {
                    id,
                    handle: Some(handle),
                }) => {
                    session.selection = Some(id);
                    session.gesture = Gesture::ResizingAnnotation {
                        id,
                        handle,
                        changed: false,
                    };
                    log::debug!("↔️ Resizing annotation {} via {:?}", id, handle);
                }
                Some(hit::HitResult { id, handle: None }) => {
                    session.selection = Some(id);
                    let p = session
                        .transform
                        .to_image_space_raw(pos, image_size, canvas_size);
                    let (grab_dx, grab_dy) = match session.store.get(id).map(|a| &a.shape) {
                        Some(&Shape::Rect { x, y, .. }) => (p.x - x, p.y - y),
                        _ => (0.0, 0.0),
                    };
                    session.gesture = Gesture::DraggingAnnotation {
                        id,
                        grab_dx,
                        grab_dy,
                        moved: false,
                    };
                    log::debug!("🔍 Selected annotation {}", id);
                }
                None => {
                    session.selection = None;
                }
            }
        }
        Tool::Rect => {
            let Some(p) = session
                .transform
                .to_image_space(pos, image_size, canvas_size)
            else {
                return;
            };
            if session.active_label().is_none() {
                log::debug!("✏️ Ignoring rectangle draw: no active label");
                return;
            }
            session.gesture = Gesture::Drawing {
                anchor: p,
                current: p,
            };
            log::debug!("✏️ Started rectangle at ({:.1}, {:.1})", p.x, p.y);
        }
        Tool::Polygon => {
            let Some(p) = session
                .transform
                .to_image_space(pos, image_size, canvas_size)
            else {
                return;
            };
            if session.active_label().is_none() {
                log::debug!("✏️ Ignoring polygon draw: no active label");
                return;
            }
            session.gesture = Gesture::AccumulatingPolygon { points: vec![p] };
            log::debug!("✏️ Started polygon at ({:.1}, {:.1})", p.x, p.y);
        }
        Tool::Point => {
            let Some(p) = session
                .transform
                .to_image_space(pos, image_size, canvas_size)
            else {
                return;
            };
            let Some(label) = session.active_label().cloned() else {
                log::debug!("✏️ Ignoring point draw: no active label");
                return;
            };
            // Point tool commits immediately; there is no drag phase.
            session
                .store
                .add(&label, Shape::Point { x: p.x, y: p.y }, &session.labels);
        }
    }
}

fn pointer_moved(session: &mut Session, pos: Point) {
    let image_size = session.image_size();
    let canvas_size = session.canvas_size;

    match &mut session.gesture {
        Gesture::Panning { last } => {
            let (dx, dy) = (pos.x - last.x, pos.y - last.y);
            *last = pos;
            session.transform.pan_by(dx, dy);
        }
        Gesture::Drawing { current, .. } => {
            let p = session
                .transform
                .to_image_space_raw(pos, image_size, canvas_size);
            *current = Point::new(
                p.x.clamp(0.0, image_size.0),
                p.y.clamp(0.0, image_size.1),
            );
        }
        Gesture::DraggingAnnotation {
            id,
            grab_dx,
            grab_dy,
            moved,
        } => {
            let id = *id;
            let p = session
                .transform
                .to_image_space_raw(pos, image_size, canvas_size);
            let target = (p.x - *grab_dx, p.y - *grab_dy);
            let moved_flag: &mut bool = moved;
            if let Some(ann) = session.store.get_mut(id) {
                if let Shape::Rect { x, y, w, h } = &mut ann.shape {
                    let new_x = target.0.clamp(0.0, (image_size.0 - *w).max(0.0));
                    let new_y = target.1.clamp(0.0, (image_size.1 - *h).max(0.0));
                    if new_x != *x || new_y != *y {
                        *x = new_x;
                        *y = new_y;
                        *moved_flag = true;
                    }
                }
            }
        }
        Gesture::ResizingAnnotation { id, handle, changed } => {
            let (id, handle) = (*id, *handle);
            let p = session
                .transform
                .to_image_space_raw(pos, image_size, canvas_size);
            let m = Point::new(
                p.x.clamp(0.0, image_size.0),
                p.y.clamp(0.0, image_size.1),
            );
            let changed_flag: &mut bool = changed;
            if let Some(ann) = session.store.get_mut(id) {
                if let Shape::Rect { x, y, w, h } = &mut ann.shape {
                    let anchor = handle.opposite().corner(*x, *y, *w, *h);
                    let (nx, nw) = resize_axis(anchor.x, m.x, image_size.0);
                    let (ny, nh) = resize_axis(anchor.y, m.y, image_size.1);
                    if (nx, ny, nw, nh) != (*x, *y, *w, *h) {
                        *x = nx;
                        *y = ny;
                        *w = nw;
                        *h = nh;
                        *changed_flag = true;
                    }
                }
            }
        }
        Gesture::Idle | Gesture::AccumulatingPolygon { .. } => {}
    }
}

/// Recompute one axis of a corner resize: the anchor coordinate stays
/// fixed, the dragged side follows the pointer with a minimum-size floor,
/// and the result is re-clamped into the image.
fn resize_axis(anchor: f32, pointer: f32, image_extent: f32) -> (f32, f32) {
    let size = (pointer - anchor).abs().max(threshold::MIN_RECT_SIZE);
    let size = size.min(image_extent);
    let origin = if pointer >= anchor { anchor } else { anchor - size };
    let origin = origin.clamp(0.0, (image_extent - size).max(0.0));
    (origin, size)
}

fn pointer_up(session: &mut Session, _pos: Point) {
    match std::mem::take(&mut session.gesture) {
        Gesture::Drawing { anchor, current } => {
            // Sub-threshold drags are discarded silently.
            if let Some(shape) = Shape::rect_from_corners(anchor, current) {
                if let Some(label) = session.active_label().cloned() {
                    session.store.add(&label, shape, &session.labels);
                }
            }
        }
        Gesture::DraggingAnnotation { moved, id, .. } => {
            if moved {
                // One history entry for the whole drag gesture.
                session.store.commit(&session.labels);
                log::debug!("✅ Move committed for annotation {}", id);
            }
        }
        Gesture::ResizingAnnotation { changed, id, .. } => {
            if changed {
                session.store.commit(&session.labels);
                log::debug!("✅ Resize committed for annotation {}", id);
            }
        }
        Gesture::Panning { .. } | Gesture::Idle => {}
        // Polygon accumulation continues across pointer-ups.
        polygon @ Gesture::AccumulatingPolygon { .. } => {
            session.gesture = polygon;
        }
    }
}

fn double_click(session: &mut Session, _pos: Point) {
    let Gesture::AccumulatingPolygon { points } = &session.gesture else {
        return;
    };
    if points.len() < threshold::MIN_POLYGON_VERTICES {
        // Not enough vertices: keep accumulating.
        log::debug!(
            "📝 Polygon needs at least {} points, has {}",
            threshold::MIN_POLYGON_VERTICES,
            points.len()
        );
        return;
    }
    let points = points.clone();
    session.gesture = Gesture::Idle;
    if let Some(label) = session.active_label().cloned() {
        session
            .store
            .add(&label, Shape::Polygon { points }, &session.labels);
    }
}

// ============================================================================
// Keyboard Handling
// ============================================================================

/// Feed one key press through the editor.
pub fn handle_key(session: &mut Session, key: KeyCode, modifiers: Modifiers) {
    if key == KeyCode::Escape {
        cancel_gesture(session);
        return;
    }

    if modifiers.command() {
        match key {
            KeyCode::Z if modifiers.shift => {
                cancel_gesture(session);
                session.redo();
            }
            KeyCode::Z => {
                cancel_gesture(session);
                session.undo();
            }
            KeyCode::Y => {
                cancel_gesture(session);
                session.redo();
            }
            _ => {}
        }
        return;
    }

    if let Some(tool) = session.bindings.tool_for_key(key) {
        session.select_tool(tool);
        return;
    }

    match key {
        KeyCode::Delete | KeyCode::Backspace => {
            cancel_gesture(session);
            session.delete_selection();
        }
        _ => {
            if let Some(position) = key.digit_position() {
                if let Some(label) = session.labels.by_position(position) {
                    let id = label.id;
                    session.active_label = Some(id);
                    log::debug!("🏷️ Active label set to {} (key {})", id, position + 1);
                }
            }
        }
    }
}

/// Abort the gesture in progress, discarding uncommitted changes.
pub(crate) fn cancel_gesture(session: &mut Session) {
    match session.gesture {
        Gesture::Idle => return,
        Gesture::DraggingAnnotation { .. } | Gesture::ResizingAnnotation { .. } => {
            // The working sequence was mutated for live feedback; restore
            // the last committed state.
            session.store.revert();
        }
        Gesture::Drawing { .. } | Gesture::Panning { .. } | Gesture::AccumulatingPolygon { .. } => {}
    }
    session.gesture = Gesture::Idle;
    log::debug!("❌ Gesture cancelled");
}

/// Convenience: the label a drawing tool would apply.
impl Session {
    pub(crate) fn active_label(&self) -> Option<&Label> {
        self.active_label.and_then(|id| self.labels.get(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
