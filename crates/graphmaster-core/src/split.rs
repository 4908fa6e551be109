//! Editor/preview pane split.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Default share of the editor pane, in percent.
pub const DEFAULT_EDITOR_PERCENT: f64 = 25.0;
/// Smallest share either pane can be resized to.
pub const MIN_PANE_PERCENT: f64 = 10.0;
/// Largest share either pane can be resized to.
pub const MAX_PANE_PERCENT: f64 = 90.0;
/// Window width above which the panes sit side by side.
pub const SIDE_BY_SIDE_MIN_WIDTH: f64 = 800.0;

/// Direction the resizer moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitAxis {
    /// Panes side by side; the resizer moves along x.
    Horizontal,
    /// Panes stacked; the resizer moves along y.
    Vertical,
}

impl SplitAxis {
    /// Axis used for a window of the given width.
    pub fn for_window_width(width: f64) -> Self {
        if width > SIDE_BY_SIDE_MIN_WIDTH {
            SplitAxis::Horizontal
        } else {
            SplitAxis::Vertical
        }
    }
}

/// How the main container is divided between editor and preview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaneSplit {
    editor_percent: f64,
}

impl Default for PaneSplit {
    fn default() -> Self {
        Self {
            editor_percent: DEFAULT_EDITOR_PERCENT,
        }
    }
}

impl PaneSplit {
    /// Split with the editor taking `percent` of the container, clamped.
    pub fn new(percent: f64) -> Self {
        if !percent.is_finite() {
            return Self::default();
        }
        Self {
            editor_percent: percent.clamp(MIN_PANE_PERCENT, MAX_PANE_PERCENT),
        }
    }

    /// Split from a resizer drag: `pointer` is measured from the container's
    /// leading edge along the split axis, `extent` is the container's length
    /// on that axis.
    pub fn from_pointer(pointer: f64, extent: f64) -> Option<Self> {
        if !(extent.is_finite() && extent > 0.0) {
            return None;
        }
        Some(Self::new(pointer / extent * 100.0))
    }

    pub fn editor_percent(&self) -> f64 {
        self.editor_percent
    }

    pub fn preview_percent(&self) -> f64 {
        100.0 - self.editor_percent
    }

    /// CSS `flex` value for the editor pane.
    pub fn editor_flex(&self) -> String {
        format!("0 0 {}%", self.editor_percent)
    }

    /// CSS `flex` value for the preview pane.
    pub fn preview_flex(&self) -> String {
        format!("1 1 {}%", self.preview_percent())
    }

    /// Split from a resizer drag inside a container of `container` size.
    /// `pointer` is relative to the container's top-left corner; only the
    /// coordinate along `axis` is used.
    pub fn from_drag(axis: SplitAxis, pointer: Point, container: Size) -> Option<Self> {
        match axis {
            SplitAxis::Horizontal => Self::from_pointer(pointer.x, container.width),
            SplitAxis::Vertical => Self::from_pointer(pointer.y, container.height),
        }
    }

    /// Recover a split from a saved editor `flex` value such as `"0 0 33%"`.
    pub fn from_editor_flex(flex: &str) -> Option<Self> {
        let basis = flex.split_whitespace().last()?;
        let percent = basis.strip_suffix('%')?.parse::<f64>().ok()?;
        percent.is_finite().then(|| Self::new(percent))
    }
}
