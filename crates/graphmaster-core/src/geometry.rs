//! Geometry helpers for pinch tracking and artifact bounds.

use std::str::FromStr;

use kurbo::{Point, Rect, Size};
use thiserror::Error;

/// Geometry errors.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Artifact has no usable bounding box")]
    NoBoundingBox,
}

/// Euclidean distance between two screen points.
///
/// Only ratios of successive distances are meaningful to callers.
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Midpoint of two screen points.
pub fn midpoint(a: Point, b: Point) -> Point {
    a.midpoint(b)
}

/// Geometry queries a rendered artifact must answer.
///
/// Every query may fail or return degenerate values; [`valid_bounding_box`]
/// sorts out which one to trust.
pub trait ArtifactGeometry {
    /// The bounds of the drawn content, if the artifact could measure them.
    fn intrinsic_bounds(&self) -> Option<Rect>;

    /// The declared `viewBox` rectangle, if any.
    fn view_box(&self) -> Option<Rect>;

    /// The declared `width`/`height` attributes, if any.
    fn declared_size(&self) -> Option<Size>;
}

/// Where a bounding box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSource {
    Intrinsic,
    ViewBox,
    DeclaredSize,
}

/// A bounding box that is finite and strictly positive in both dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub rect: Rect,
    pub source: BoundsSource,
}

fn is_usable(rect: Rect) -> bool {
    rect.is_finite() && rect.width() > 0.0 && rect.height() > 0.0
}

/// Resolve an artifact's bounding box, falling back from the measured
/// content bounds to the `viewBox` and finally to the declared size at the
/// origin.
pub fn valid_bounding_box<A: ArtifactGeometry + ?Sized>(artifact: &A) -> Result<Bounds, GeometryError> {
    if let Some(rect) = artifact.intrinsic_bounds().filter(|r| is_usable(*r)) {
        return Ok(Bounds {
            rect,
            source: BoundsSource::Intrinsic,
        });
    }

    if let Some(rect) = artifact.view_box().filter(|r| is_usable(*r)) {
        log::warn!("Using viewBox as bounding box fallback");
        return Ok(Bounds {
            rect,
            source: BoundsSource::ViewBox,
        });
    }

    if let Some(size) = artifact.declared_size() {
        let rect = Rect::from_origin_size(Point::ZERO, size);
        if is_usable(rect) {
            log::warn!("Using width/height attributes as bounding box fallback");
            return Ok(Bounds {
                rect,
                source: BoundsSource::DeclaredSize,
            });
        }
    }

    log::warn!("Could not determine a valid bounding box for the artifact");
    Err(GeometryError::NoBoundingBox)
}

/// Parse the number of a length attribute such as `"62pt"` or `" 10.5px"`.
/// The unit is dropped: Graphviz declares sizes in points and the viewBox
/// uses the same numbers.
pub fn parse_length(value: &str) -> Option<f64> {
    let length = svgtypes::Length::from_str(value.trim()).ok()?;
    length.number.is_finite().then_some(length.number)
}

/// Parse a `viewBox` attribute value (`"minX minY width height"`, separated
/// by whitespace and/or commas). Non-positive sizes are rejected.
pub fn parse_view_box(value: &str) -> Option<Rect> {
    let vb = svgtypes::ViewBox::from_str(value).ok()?;
    (vb.w > 0.0 && vb.h > 0.0).then(|| Rect::new(vb.x, vb.y, vb.x + vb.w, vb.y + vb.h))
}
