//! Camera module for pan/zoom transforms over the rendered diagram.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, ViewerConfig};

/// Scale and offset applied to the diagram, in screen pixels.
///
/// A graph point `g` is displayed at `g * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: Vec2::ZERO,
    };

    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset: Vec2::new(offset_x, offset_y),
        }
    }

    /// CSS transform applied to the preview element.
    pub fn css(&self) -> String {
        format!(
            "translate3d({}px, {}px, 0) scale({})",
            self.offset.x, self.offset.y, self.scale
        )
    }

    /// Whether every component is a finite number and the scale is positive.
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0 && self.offset.is_finite()
    }
}

/// Camera manages the view transform for the preview pane.
///
/// The scale is always kept within `[min_scale, max_scale]`; offsets are
/// unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Current zoom level
    pub scale: f64,
    /// Minimum allowed zoom level
    pub min_scale: f64,
    /// Maximum allowed zoom level
    pub max_scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
        }
    }
}

impl Camera {
    /// Create a new camera at identity with default bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity camera with the configured scale bounds.
    pub fn with_config(config: &ViewerConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            ..Self::default()
        }
    }

    /// Snapshot of the current transform.
    pub fn view(&self) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            offset: self.offset,
        }
    }

    /// Clamp a scale to the camera's bounds.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Get the affine transform from graph space to screen space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Get the inverse transform from screen space to graph space.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to graph coordinates.
    pub fn screen_to_graph(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a graph point to screen coordinates.
    pub fn graph_to_screen(&self, graph_point: Point) -> Point {
        self.transform() * graph_point
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Set the offset directly.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Zoom by `factor`, keeping the given screen point fixed.
    ///
    /// Returns false when the clamped scale is unchanged.
    pub fn zoom_at(&mut self, origin: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_scale = self.clamp_scale(self.scale * factor);
        if new_scale == self.scale {
            return false;
        }

        let graph_x = (origin.x - self.offset.x) / self.scale;
        let graph_y = (origin.y - self.offset.y) / self.scale;

        self.offset = Vec2::new(origin.x - graph_x * new_scale, origin.y - graph_y * new_scale);
        self.scale = new_scale;
        true
    }

    /// Reset camera to identity.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }

    /// Restore a previously saved transform.
    ///
    /// The scale is clamped into bounds; an invalid transform resets to identity.
    pub fn restore(&mut self, view: ViewTransform) {
        if !view.is_valid() {
            log::warn!("Ignoring invalid saved transform {:?}", view);
            self.reset();
            return;
        }
        self.scale = self.clamp_scale(view.scale);
        self.offset = view.offset;
    }

    /// Fit the camera so `bounds` is fully visible and centered in `viewport`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() || !bounds.is_finite() {
            self.reset();
            return;
        }

        let available = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = available.width / bounds.width();
        let scale_y = available.height / bounds.height();
        self.scale = self.clamp_scale(scale_x.min(scale_y));

        self.offset = Vec2::new(
            (viewport.width - bounds.width() * self.scale) / 2.0 - bounds.x0 * self.scale,
            (viewport.height - bounds.height() * self.scale) / 2.0 - bounds.y0 * self.scale,
        );
    }

    /// Zoom level as a rounded percentage for display.
    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }
}
