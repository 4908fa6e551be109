//! The viewer: one owned state object behind the preview pane.
//!
//! Hosts forward pointer, wheel, keyboard and editor events here and read
//! back the transform to apply, the artifact to display and any notices to
//! show. Nothing in here touches a real window, clipboard or layout engine
//! directly; those come in through the traits in [`crate::render`],
//! [`crate::storage`], [`crate::gesture`] and [`crate::platform`].

use std::sync::Arc;

use kurbo::{Point, Size, Vec2};

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use crate::camera::{Camera, ViewTransform};
use crate::config::{ConfigError, ViewerConfig};
use crate::frame::FrameScheduler;
use crate::geometry::{ArtifactGeometry, Bounds, valid_bounding_box};
use crate::gesture::{
    GestureMode, GestureReconciler, GestureResponse, PointerCapture, PointerId, PointerInput,
};
use crate::keys::{KeyAction, Modifiers, global_key_action, preview_key_action};
use crate::notice::Notice;
use crate::platform::{Capabilities, Clipboard, RgbaImage};
use crate::render::{
    LayoutEngine, LayoutError, RenderCoordinator, RenderDebounce, RenderError, RenderOutcome,
    RenderStart, RenderTicket,
};
use crate::session::{LoadedSession, PersistedSession, SessionStore};
use crate::split::{PaneSplit, SplitAxis};
use crate::storage::KeyValueStore;

/// Viewer state for a single preview pane.
pub struct Viewer<A, S: KeyValueStore> {
    config: ViewerConfig,
    camera: Camera,
    gestures: GestureReconciler,
    frames: FrameScheduler,
    renderer: RenderCoordinator<A>,
    session: SessionStore<S>,
    debounce: RenderDebounce,
    document: String,
    split: PaneSplit,
    auto_render: bool,
    viewport: Size,
    capabilities: Capabilities,
    notices: Vec<Notice>,
    /// Set after a failed save so the warning is shown once, not per event.
    save_warned: bool,
}

impl<A: ArtifactGeometry, S: KeyValueStore> Viewer<A, S> {
    /// Create a viewer with an empty document and identity transform.
    pub fn new(config: ViewerConfig, storage: Arc<S>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            camera: Camera::with_config(&config),
            gestures: GestureReconciler::new(),
            frames: FrameScheduler::new(),
            renderer: RenderCoordinator::new(),
            session: SessionStore::new(storage, config.session_key.clone()),
            debounce: RenderDebounce::from_millis(config.render_debounce_ms),
            document: String::new(),
            split: PaneSplit::default(),
            auto_render: false,
            viewport: Size::ZERO,
            capabilities: Capabilities::default(),
            notices: Vec::new(),
            save_warned: false,
            config,
        })
    }

    /// Set what the host platform supports.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn session_store(&self) -> &SessionStore<S> {
        &self.session
    }

    // --- Session ---

    /// Read the stored session without applying it.
    pub fn load(&self) -> LoadedSession {
        self.session.load()
    }

    /// Apply the stored session, or start from `default_document`.
    ///
    /// Returns true when the restored document is non-empty and should be
    /// rendered, keeping the restored transform (no fit).
    pub fn restore_session(&mut self, default_document: &str) -> bool {
        let loaded = self.load();
        if loaded == LoadedSession::Purged {
            self.notify(Notice::warning("Saved session was unreadable and has been reset"));
        }

        match loaded.into_session() {
            Some(session) => {
                self.document = session.document_or(default_document).to_string();
                self.camera.restore(session.transform());
                self.split = session.split();
                self.auto_render = session.auto_render();
                log::info!("Session restored");
            }
            None => {
                self.document = default_document.to_string();
                self.camera.reset();
                self.split = PaneSplit::default();
                self.auto_render = false;
            }
        }
        self.frames.invalidate();
        !self.document.trim().is_empty()
    }

    /// Persist the current state. Failures become a warning notice.
    pub fn save(&mut self) -> bool {
        let record = PersistedSession::capture(
            &self.document,
            self.camera.view(),
            self.split,
            self.auto_render,
        );
        match self.session.save(&record) {
            Ok(()) => {
                self.save_warned = false;
                true
            }
            Err(e) => {
                log::warn!("Failed to save session: {}", e);
                if !self.save_warned {
                    self.save_warned = true;
                    self.notify(Notice::warning(format!("Could not save session: {}", e)));
                }
                false
            }
        }
    }

    // --- Viewport and transform ---

    /// Record the preview pane's current size in screen pixels.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// The transform currently in effect.
    pub fn transform(&self) -> ViewTransform {
        self.camera.view()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn zoom_percent(&self) -> i64 {
        self.camera.zoom_percent()
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    fn view_changed(&mut self) {
        self.frames.request();
        self.save();
    }

    /// Zoom by `factor` about `origin`, or the viewport centre.
    pub fn zoom(&mut self, factor: f64, origin: Option<Point>) -> bool {
        let origin = origin.unwrap_or_else(|| self.viewport_center());
        let changed = self.camera.zoom_at(origin, factor);
        if changed {
            self.view_changed();
        }
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom(self.config.zoom_step, None)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom(1.0 / self.config.zoom_step, None)
    }

    /// Fit the artifact into the viewport. Returns false when there is no
    /// artifact to fit; the transform then resets to identity, as it does
    /// for unusable geometry.
    pub fn fit_to_view(&mut self) -> bool {
        let bounds = match self.renderer.artifact() {
            Some(artifact) => valid_bounding_box(artifact),
            None => {
                self.reset_transform();
                return false;
            }
        };
        match bounds {
            Ok(bounds) => {
                self.camera
                    .fit_to_bounds(bounds.rect, self.viewport, self.config.fit_padding)
            }
            Err(_) => self.camera.reset(),
        }
        log::debug!("Fit to view: {:?}", self.camera.view());
        self.view_changed();
        true
    }

    /// Double-click on the preview fits the artifact.
    pub fn on_double_click(&mut self) -> bool {
        self.fit_to_view()
    }

    /// Return to the identity transform.
    pub fn reset_transform(&mut self) {
        self.camera.reset();
        self.view_changed();
    }

    // --- Pointer, wheel and keyboard ---

    pub fn gesture_mode(&self) -> GestureMode {
        self.gestures.mode()
    }

    pub fn on_pointer_down(
        &mut self,
        input: PointerInput,
        capture: &mut dyn PointerCapture,
    ) -> GestureResponse {
        self.gestures.pointer_down(input, &self.camera, capture)
    }

    pub fn on_pointer_move(&mut self, id: PointerId, position: Point) -> GestureResponse {
        let response = self.gestures.pointer_move(id, position, &mut self.camera);
        if response.view_changed {
            self.frames.request();
        }
        response
    }

    /// Handle pointer up or cancel. The session is saved once the last
    /// pointer is lifted.
    pub fn on_pointer_up(
        &mut self,
        id: PointerId,
        capture: &mut dyn PointerCapture,
    ) -> GestureResponse {
        let response = self.gestures.pointer_up(id, &self.camera, capture);
        if response.interaction_ended {
            self.save();
        }
        response
    }

    /// Abandon the current gesture, e.g. when the pane loses focus.
    pub fn cancel_gestures(&mut self, capture: &mut dyn PointerCapture) {
        self.gestures.cancel_all(capture);
    }

    /// Wheel zoom about `origin`. Negative deltas zoom in.
    pub fn on_wheel(&mut self, delta_y: f64, origin: Point) -> bool {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }
        let factor = if delta_y < 0.0 {
            self.config.zoom_step
        } else {
            1.0 / self.config.zoom_step
        };
        self.zoom(factor, Some(origin))
    }

    pub fn on_key_pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
        self.view_changed();
    }

    pub fn on_key_zoom(&mut self, factor: f64) -> bool {
        self.zoom(factor, None)
    }

    /// Handle a key press. Pan and zoom are applied here; the action is
    /// returned so the host knows the key was consumed, and so it can run
    /// [`KeyAction::RenderAndFit`] itself.
    pub fn on_key(&mut self, key: &str, modifiers: Modifiers, preview_focused: bool) -> Option<KeyAction> {
        let action = global_key_action(key, modifiers).or_else(|| {
            if preview_focused && !modifiers.command() {
                preview_key_action(key, &self.config)
            } else {
                None
            }
        })?;

        match action {
            KeyAction::Pan(delta) => self.on_key_pan(delta),
            KeyAction::Zoom(factor) => {
                self.on_key_zoom(factor);
            }
            KeyAction::RenderAndFit => {}
        }
        Some(action)
    }

    // --- Rendering ---

    /// The artifact currently displayed.
    pub fn artifact(&self) -> Option<&A> {
        self.renderer.artifact()
    }

    /// Bounding box of the displayed artifact.
    pub fn bounding_box(&self) -> Option<Bounds> {
        self.renderer
            .artifact()
            .and_then(|artifact| valid_bounding_box(artifact).ok())
    }

    pub fn is_rendering(&self) -> bool {
        self.renderer.is_rendering()
    }

    /// Export and copy need a finished artifact.
    pub fn actions_enabled(&self) -> bool {
        self.renderer.artifact().is_some() && !self.renderer.is_rendering()
    }

    /// First half of a render: claim the coordinator.
    ///
    /// Hosts that cannot hold `&mut Viewer` across the layout call use this
    /// with [`finish_render`](Self::finish_render). Empty text clears the
    /// preview right away.
    pub fn begin_render(&mut self, text: &str, fit_after: bool) -> Result<RenderStart, RenderError> {
        let start = self.renderer.begin(text, fit_after)?;
        if start == RenderStart::Cleared {
            self.camera.reset();
            self.frames.invalidate();
            self.save();
        }
        Ok(start)
    }

    /// Second half of a render: apply the layout engine's result.
    pub fn finish_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<A, LayoutError>,
    ) -> RenderOutcome {
        let outcome = self.renderer.finish(ticket, result);
        match &outcome {
            RenderOutcome::Rendered { fit_after } => {
                self.frames.invalidate();
                if *fit_after {
                    self.fit_to_view();
                } else {
                    self.save();
                }
            }
            RenderOutcome::Failed(e) => {
                self.camera.reset();
                self.frames.invalidate();
                self.save();
                self.notify(Notice::error(e.user_message()));
            }
            RenderOutcome::Cleared | RenderOutcome::Stale => {}
        }
        outcome
    }

    /// Render `text` with `engine` and apply the result.
    pub async fn request_render<E>(
        &mut self,
        engine: &E,
        text: &str,
        fit_after: bool,
    ) -> Result<RenderOutcome, RenderError>
    where
        E: LayoutEngine<Artifact = A>,
    {
        let ticket = match self.begin_render(text, fit_after)? {
            RenderStart::Cleared => return Ok(RenderOutcome::Cleared),
            RenderStart::Started(ticket) => ticket,
        };
        let result = engine.render(text).await;
        Ok(self.finish_render(ticket, result))
    }

    /// Render the current document.
    pub async fn render_document<E>(
        &mut self,
        engine: &E,
        fit_after: bool,
    ) -> Result<RenderOutcome, RenderError>
    where
        E: LayoutEngine<Artifact = A>,
    {
        let text = self.document.clone();
        self.request_render(engine, &text, fit_after).await
    }

    // --- Document and auto-render ---

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Replace the document after an edit. Arms the auto-render debounce
    /// when auto-render is on.
    pub fn set_document(&mut self, text: impl Into<String>, now: Instant) {
        self.document = text.into();
        self.save();
        if self.auto_render {
            self.debounce.arm(now);
        }
    }

    pub fn auto_render(&self) -> bool {
        self.auto_render
    }

    /// Toggle auto-render. Returns true when the host should render now.
    pub fn set_auto_render(&mut self, enabled: bool) -> bool {
        self.auto_render = enabled;
        if !enabled {
            self.debounce.cancel();
        }
        self.save();
        enabled && !self.document.trim().is_empty()
    }

    /// Deadline of the pending auto-render, for hosts that set timers.
    pub fn render_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Returns true once when the pending auto-render is due.
    pub fn auto_render_due(&mut self, now: Instant) -> bool {
        self.auto_render && self.debounce.fire(now)
    }

    /// Empty the document and the preview. A render still in flight is
    /// abandoned and its result ignored.
    pub fn clear_all(&mut self) {
        self.document.clear();
        self.renderer.clear();
        self.debounce.cancel();
        self.camera.reset();
        self.frames.invalidate();
        self.save();
        self.notify(Notice::info("Cleared"));
    }

    /// Replace the document with clipboard text. Returns true when the
    /// document changed and should be rendered.
    pub fn paste_from(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> bool {
        if !self.capabilities.clipboard_text {
            self.notify(Notice::warning("Reading the clipboard is not supported here"));
            return false;
        }
        match clipboard.read_text() {
            Ok(text) if !text.trim().is_empty() => {
                self.set_document(text, now);
                self.notify(Notice::info("Pasted from clipboard"));
                true
            }
            Ok(_) => {
                self.notify(Notice::warning("Clipboard is empty"));
                false
            }
            Err(e) => {
                log::warn!("Clipboard read failed: {}", e);
                self.notify(Notice::error(format!("Could not read clipboard: {}", e)));
                false
            }
        }
    }

    /// Put a rasterised preview on the clipboard.
    pub fn copy_image(&mut self, clipboard: &mut dyn Clipboard, image: &RgbaImage) -> bool {
        if !self.capabilities.clipboard_image {
            self.notify(Notice::warning("Copying images is not supported here"));
            return false;
        }
        match clipboard.write_image(image) {
            Ok(()) => {
                self.notify(Notice::success("Copied PNG to clipboard"));
                true
            }
            Err(e) => {
                log::warn!("Clipboard write failed: {}", e);
                self.notify(Notice::error(format!("Copy failed: {}", e)));
                false
            }
        }
    }

    // --- Layout ---

    pub fn split(&self) -> PaneSplit {
        self.split
    }

    /// Resize the panes from a resizer drag.
    pub fn set_split_from_pointer(&mut self, pointer: Point, container: Size, window_width: f64) -> bool {
        let axis = SplitAxis::for_window_width(window_width);
        let Some(split) = PaneSplit::from_drag(axis, pointer, container) else {
            return false;
        };
        self.split = split;
        self.save();
        true
    }

    // --- Frames and notices ---

    /// True once per pending apply: the host should queue a frame callback.
    pub fn take_frame_request(&mut self) -> bool {
        self.frames.take_schedule()
    }

    /// Run the queued frame. Returns the transform to write, if it changed.
    pub fn on_frame(&mut self) -> Option<ViewTransform> {
        self.frames.run(self.camera.view())
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Take all queued notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
