//! Pointer gesture reconciliation: drag versus pinch over the preview.
//!
//! The gesture mode is never stored. It is derived from how many pointers
//! are currently down, so lifting fingers in any order always leaves the
//! reconciler in a consistent state.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::Camera;
use crate::geometry::{distance, midpoint};

/// Opaque pointer identifier assigned by the host.
pub type PointerId = i64;

/// Pointer device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// A pointer-down event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub id: PointerId,
    pub position: Point,
    pub button: MouseButton,
    pub kind: PointerKind,
}

impl PointerInput {
    /// A primary-button press at `position`.
    pub fn primary(id: PointerId, position: Point, kind: PointerKind) -> Self {
        Self {
            id,
            position,
            button: MouseButton::Left,
            kind,
        }
    }
}

/// Latest known position of an active pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub id: PointerId,
    pub position: Point,
}

/// Gesture mode derived from the number of active pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureMode {
    Idle,
    Dragging,
    Pinching,
}

impl GestureMode {
    fn from_count(count: usize) -> Self {
        match count {
            0 => GestureMode::Idle,
            1 => GestureMode::Dragging,
            _ => GestureMode::Pinching,
        }
    }
}

/// Pointer capture errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Pointer {0} is not capturable")]
    NotCapturable(PointerId),
    #[error("Capture target detached")]
    Detached,
    #[error("Capture error: {0}")]
    Other(String),
}

/// Host hook that routes a pointer's later events to the preview even
/// when it leaves the element.
pub trait PointerCapture {
    fn capture(&mut self, id: PointerId) -> Result<(), CaptureError>;
    fn release(&mut self, id: PointerId) -> Result<(), CaptureError>;
}

/// Capture hook for hosts that deliver every pointer event anyway.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn capture(&mut self, _id: PointerId) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self, _id: PointerId) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Result of feeding one pointer event to the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureResponse {
    /// The event was consumed by the reconciler.
    pub handled: bool,
    /// The camera was changed.
    pub view_changed: bool,
    /// The last pointer went up; the interaction is over.
    pub interaction_ended: bool,
}

impl GestureResponse {
    const IGNORED: Self = Self {
        handled: false,
        view_changed: false,
        interaction_ended: false,
    };

    const HANDLED: Self = Self {
        handled: true,
        view_changed: false,
        interaction_ended: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PinchBaseline {
    distance: f64,
    scale: f64,
}

/// Tracks active pointers and turns their motion into camera updates.
#[derive(Debug, Clone, Default)]
pub struct GestureReconciler {
    /// Active pointers in press order.
    pointers: Vec<PointerSample>,
    /// `pointer - offset` at drag start; `offset = pointer - anchor` while dragging.
    drag_anchor: Option<Vec2>,
    /// Distance and scale captured when the current pinch pair formed.
    pinch: Option<PinchBaseline>,
}

impl GestureReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gesture mode.
    pub fn mode(&self) -> GestureMode {
        GestureMode::from_count(self.pointers.len())
    }

    /// Number of pointers currently down.
    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Last known sample for a pointer.
    pub fn sample(&self, id: PointerId) -> Option<PointerSample> {
        self.pointers.iter().copied().find(|p| p.id == id)
    }

    fn index_of(&self, id: PointerId) -> Option<usize> {
        self.pointers.iter().position(|p| p.id == id)
    }

    fn anchor_drag(&mut self, position: Point, camera: &Camera) {
        self.drag_anchor = Some(position.to_vec2() - camera.offset);
    }

    fn start_pinch(&mut self, camera: &Camera) {
        let (a, b) = (self.pointers[0].position, self.pointers[1].position);
        self.pinch = Some(PinchBaseline {
            distance: distance(a, b),
            scale: camera.scale,
        });
    }

    /// Handle a pointer going down.
    pub fn pointer_down(
        &mut self,
        input: PointerInput,
        camera: &Camera,
        capture: &mut dyn PointerCapture,
    ) -> GestureResponse {
        if input.kind == PointerKind::Mouse && input.button != MouseButton::Left {
            return GestureResponse::IGNORED;
        }

        match self.index_of(input.id) {
            Some(i) => self.pointers[i].position = input.position,
            None => {
                self.pointers.push(PointerSample {
                    id: input.id,
                    position: input.position,
                });
                if let Err(e) = capture.capture(input.id) {
                    log::debug!("Pointer capture failed for {}: {}", input.id, e);
                }
            }
        }

        match self.pointers.len() {
            1 => {
                self.pinch = None;
                self.anchor_drag(input.position, camera);
                log::debug!("Gesture: dragging");
            }
            2 => {
                self.drag_anchor = None;
                self.start_pinch(camera);
                log::debug!("Gesture: pinching");
            }
            _ => {}
        }

        GestureResponse::HANDLED
    }

    /// Handle a pointer moving. Unknown pointers are ignored.
    pub fn pointer_move(
        &mut self,
        id: PointerId,
        position: Point,
        camera: &mut Camera,
    ) -> GestureResponse {
        let Some(index) = self.index_of(id) else {
            return GestureResponse::IGNORED;
        };
        self.pointers[index].position = position;

        match self.mode() {
            GestureMode::Idle => GestureResponse::IGNORED,
            GestureMode::Dragging => {
                let Some(anchor) = self.drag_anchor else {
                    return GestureResponse::HANDLED;
                };
                let offset = position.to_vec2() - anchor;
                let view_changed = offset != camera.offset;
                camera.set_offset(offset);
                GestureResponse {
                    view_changed,
                    ..GestureResponse::HANDLED
                }
            }
            GestureMode::Pinching => {
                let Some(baseline) = self.pinch else {
                    return GestureResponse::HANDLED;
                };
                if baseline.distance <= 0.0 {
                    return GestureResponse::HANDLED;
                }
                let (a, b) = (self.pointers[0].position, self.pointers[1].position);
                let target = camera.clamp_scale(baseline.scale * (distance(a, b) / baseline.distance));
                let view_changed = camera.zoom_at(midpoint(a, b), target / camera.scale);
                GestureResponse {
                    view_changed,
                    ..GestureResponse::HANDLED
                }
            }
        }
    }

    /// Handle a pointer going up or being cancelled.
    pub fn pointer_up(
        &mut self,
        id: PointerId,
        camera: &Camera,
        capture: &mut dyn PointerCapture,
    ) -> GestureResponse {
        let Some(index) = self.index_of(id) else {
            return GestureResponse::IGNORED;
        };
        self.pointers.remove(index);
        if let Err(e) = capture.release(id) {
            log::debug!("Pointer capture release failed for {}: {}", id, e);
        }

        match self.pointers.len() {
            0 => {
                self.drag_anchor = None;
                self.pinch = None;
                log::debug!("Gesture: idle");
                GestureResponse {
                    interaction_ended: true,
                    ..GestureResponse::HANDLED
                }
            }
            1 => {
                self.pinch = None;
                let remaining = self.pointers[0].position;
                self.anchor_drag(remaining, camera);
                log::debug!("Gesture: back to dragging");
                GestureResponse::HANDLED
            }
            _ => {
                if index < 2 {
                    // The tracked pair changed; measure from here on.
                    self.start_pinch(camera);
                }
                GestureResponse::HANDLED
            }
        }
    }

    /// Forget every pointer without touching the camera.
    pub fn cancel_all(&mut self, capture: &mut dyn PointerCapture) {
        for pointer in self.pointers.drain(..) {
            if let Err(e) = capture.release(pointer.id) {
                log::debug!("Pointer capture release failed for {}: {}", pointer.id, e);
            }
        }
        self.drag_anchor = None;
        self.pinch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCapture {
        captured: Vec<PointerId>,
        released: Vec<PointerId>,
        fail_release: bool,
    }

    impl PointerCapture for RecordingCapture {
        fn capture(&mut self, id: PointerId) -> Result<(), CaptureError> {
            self.captured.push(id);
            Ok(())
        }

        fn release(&mut self, id: PointerId) -> Result<(), CaptureError> {
            self.released.push(id);
            if self.fail_release {
                Err(CaptureError::Detached)
            } else {
                Ok(())
            }
        }
    }

    fn touch(id: PointerId, x: f64, y: f64) -> PointerInput {
        PointerInput::primary(id, Point::new(x, y), PointerKind::Touch)
    }

    #[test]
    fn test_mode_follows_pointer_count() {
        let mut gestures = GestureReconciler::new();
        let camera = Camera::new();
        let mut capture = NoCapture;
        assert_eq!(gestures.mode(), GestureMode::Idle);

        gestures.pointer_down(touch(1, 0.0, 0.0), &camera, &mut capture);
        assert_eq!(gestures.mode(), GestureMode::Dragging);

        gestures.pointer_down(touch(2, 10.0, 0.0), &camera, &mut capture);
        assert_eq!(gestures.mode(), GestureMode::Pinching);

        gestures.pointer_up(1, &camera, &mut capture);
        assert_eq!(gestures.mode(), GestureMode::Dragging);

        let response = gestures.pointer_up(2, &camera, &mut capture);
        assert!(response.interaction_ended);
        assert_eq!(gestures.mode(), GestureMode::Idle);
    }

    #[test]
    fn test_secondary_mouse_button_rejected() {
        let mut gestures = GestureReconciler::new();
        let camera = Camera::new();
        let mut capture = RecordingCapture::default();
        let input = PointerInput {
            id: 1,
            position: Point::new(5.0, 5.0),
            button: MouseButton::Right,
            kind: PointerKind::Mouse,
        };
        let response = gestures.pointer_down(input, &camera, &mut capture);
        assert!(!response.handled);
        assert_eq!(gestures.mode(), GestureMode::Idle);
        assert!(capture.captured.is_empty());
    }

    #[test]
    fn test_drag_moves_offset() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        camera.offset = Vec2::new(100.0, 50.0);
        let mut capture = NoCapture;

        gestures.pointer_down(
            PointerInput::primary(1, Point::new(10.0, 10.0), PointerKind::Mouse),
            &camera,
            &mut capture,
        );
        let response = gestures.pointer_move(1, Point::new(40.0, -10.0), &mut camera);
        assert!(response.view_changed);
        assert_eq!(camera.offset, Vec2::new(130.0, 30.0));
    }

    #[test]
    fn test_unknown_pointer_move_ignored() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        let response = gestures.pointer_move(7, Point::new(1.0, 1.0), &mut camera);
        assert!(!response.handled);
        assert_eq!(camera.offset, Vec2::ZERO);
    }

    #[test]
    fn test_pinch_doubles_scale_about_midpoint() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        camera.scale = 1.5;
        let mut capture = NoCapture;

        gestures.pointer_down(touch(1, 100.0, 100.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 200.0, 100.0), &camera, &mut capture);

        gestures.pointer_move(1, Point::new(50.0, 100.0), &mut camera);
        assert!((camera.scale - 2.25).abs() < 1e-9);

        // The zoom centre is the live midpoint, (150, 100) after this move.
        let midpoint = Point::new(150.0, 100.0);
        let graph = camera.screen_to_graph(midpoint);
        gestures.pointer_move(2, Point::new(250.0, 100.0), &mut camera);

        assert!((camera.scale - 3.0).abs() < 1e-9);
        let screen = camera.graph_to_screen(graph);
        assert!((screen.x - midpoint.x).abs() < 1e-9);
        assert!((screen.y - midpoint.y).abs() < 1e-9);
    }

    #[test]
    fn test_pinch_clamped_to_max() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        camera.scale = 10.0;
        let mut capture = NoCapture;

        gestures.pointer_down(touch(1, 0.0, 0.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 10.0, 0.0), &camera, &mut capture);
        gestures.pointer_move(2, Point::new(20.0, 0.0), &mut camera);

        assert!((camera.scale - camera.max_scale).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coincident_pinch_does_not_divide_by_zero() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        let mut capture = NoCapture;

        gestures.pointer_down(touch(1, 30.0, 30.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 30.0, 30.0), &camera, &mut capture);
        let response = gestures.pointer_move(2, Point::new(60.0, 30.0), &mut camera);

        assert!(response.handled);
        assert!(!response.view_changed);
        assert!((camera.scale - 1.0).abs() < f64::EPSILON);
        assert!(camera.offset.is_finite());
    }

    #[test]
    fn test_lifting_one_finger_does_not_jump() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        let mut capture = NoCapture;

        gestures.pointer_down(touch(1, 100.0, 100.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 200.0, 100.0), &camera, &mut capture);
        gestures.pointer_move(2, Point::new(300.0, 100.0), &mut camera);
        let after_pinch = camera.view();

        gestures.pointer_up(1, &camera, &mut capture);
        assert_eq!(camera.view(), after_pinch);

        // Moving the remaining finger drags from where it is, without a jump.
        let graph = camera.screen_to_graph(Point::new(300.0, 100.0));
        gestures.pointer_move(2, Point::new(320.0, 90.0), &mut camera);
        let screen = camera.graph_to_screen(graph);
        assert!((screen.x - 320.0).abs() < 1e-9);
        assert!((screen.y - 90.0).abs() < 1e-9);
        assert!((camera.scale - after_pinch.scale).abs() < f64::EPSILON);
    }

    #[test]
    fn test_capture_released_once_even_when_release_fails() {
        let mut gestures = GestureReconciler::new();
        let camera = Camera::new();
        let mut capture = RecordingCapture {
            fail_release: true,
            ..Default::default()
        };

        gestures.pointer_down(touch(4, 0.0, 0.0), &camera, &mut capture);
        let response = gestures.pointer_up(4, &camera, &mut capture);
        assert!(response.interaction_ended);

        // A duplicate cancel for the same pointer is ignored.
        let response = gestures.pointer_up(4, &camera, &mut capture);
        assert!(!response.handled);

        assert_eq!(capture.captured, vec![4]);
        assert_eq!(capture.released, vec![4]);
    }

    #[test]
    fn test_third_pointer_keeps_pair() {
        let mut gestures = GestureReconciler::new();
        let mut camera = Camera::new();
        let mut capture = NoCapture;

        gestures.pointer_down(touch(1, 0.0, 0.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 100.0, 0.0), &camera, &mut capture);
        gestures.pointer_down(touch(3, 500.0, 500.0), &camera, &mut capture);
        assert_eq!(gestures.mode(), GestureMode::Pinching);

        // Only the first two pointers drive the pinch.
        gestures.pointer_move(3, Point::new(900.0, 900.0), &mut camera);
        assert!((camera.scale - 1.0).abs() < f64::EPSILON);

        // Lifting one of the pair re-baselines on the new pair.
        gestures.pointer_up(1, &camera, &mut capture);
        assert_eq!(gestures.mode(), GestureMode::Pinching);
        gestures.pointer_move(3, Point::new(900.0, 900.0), &mut camera);
        assert!((camera.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cancel_all_releases_everything() {
        let mut gestures = GestureReconciler::new();
        let camera = Camera::new();
        let mut capture = RecordingCapture::default();

        gestures.pointer_down(touch(1, 0.0, 0.0), &camera, &mut capture);
        gestures.pointer_down(touch(2, 1.0, 0.0), &camera, &mut capture);
        gestures.cancel_all(&mut capture);

        assert_eq!(gestures.mode(), GestureMode::Idle);
        assert_eq!(capture.released, vec![1, 2]);
    }
}
