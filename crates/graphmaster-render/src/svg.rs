//! Rendered SVG documents and their geometry.

use std::fmt;
use std::sync::Arc;

use graphmaster_core::geometry::{ArtifactGeometry, parse_length, parse_view_box};
use kurbo::{Affine, Rect, Size, Vec2};
use thiserror::Error;

/// SVG parsing errors.
#[derive(Debug, Error)]
pub enum SvgError {
    #[error("Invalid SVG markup: {0}")]
    Markup(String),
    #[error("Root element is <{0}>, expected <svg>")]
    NotSvg(String),
    #[error("Failed to parse SVG: {0}")]
    Parse(String),
}

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Root attributes read straight from the markup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RootAttributes {
    view_box: Option<Rect>,
    declared_size: Option<Size>,
}

fn read_root_attributes(source: &str) -> Result<RootAttributes, SvgError> {
    // Graphviz emits a DOCTYPE, which roxmltree refuses by default.
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(source, options)
        .map_err(|e| SvgError::Markup(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(SvgError::NotSvg(root.tag_name().name().to_string()));
    }

    let view_box = root.attribute("viewBox").and_then(parse_view_box);
    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);
    let declared_size = match (width, height) {
        (Some(w), Some(h)) => Some(Size::new(w, h)),
        _ => None,
    };

    Ok(RootAttributes {
        view_box,
        declared_size,
    })
}

/// A rendered SVG document.
///
/// Geometry is reported in the document's user space (the `viewBox`
/// coordinate system when one is declared).
pub struct SvgArtifact {
    source: String,
    tree: usvg::Tree,
    attributes: RootAttributes,
    /// Maps the parsed tree's canvas pixels back to user space.
    canvas_to_user: Affine,
}

impl fmt::Debug for SvgArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvgArtifact")
            .field("bytes", &self.source.len())
            .field("view_box", &self.attributes.view_box)
            .field("declared_size", &self.attributes.declared_size)
            .finish()
    }
}

impl SvgArtifact {
    /// The SVG markup as produced by the layout engine.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tree, in canvas pixels.
    pub fn tree(&self) -> &usvg::Tree {
        &self.tree
    }

    /// Transform from the parsed tree's canvas pixels to user space.
    pub fn canvas_to_user(&self) -> Affine {
        self.canvas_to_user
    }
}

impl ArtifactGeometry for SvgArtifact {
    fn intrinsic_bounds(&self) -> Option<Rect> {
        let root = self.tree.root();
        if !root.has_children() {
            return None;
        }
        let bbox = root.abs_bounding_box();
        let canvas = Rect::new(
            bbox.left() as f64,
            bbox.top() as f64,
            bbox.right() as f64,
            bbox.bottom() as f64,
        );
        Some(self.canvas_to_user.transform_rect_bbox(canvas))
    }

    fn view_box(&self) -> Option<Rect> {
        self.attributes.view_box
    }

    fn declared_size(&self) -> Option<Size> {
        self.attributes.declared_size
    }
}

/// Parses SVG markup into [`SvgArtifact`]s.
///
/// Holds the font database so system fonts are loaded once.
#[derive(Clone)]
pub struct SvgParser {
    options: Arc<usvg::Options<'static>>,
}

impl Default for SvgParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgParser {
    /// Parser using the system fonts.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        log::debug!("Loaded {} font faces", options.fontdb.len());
        Self::with_options(options)
    }

    /// Parser with custom options, e.g. without any fonts in tests.
    pub fn with_options(options: usvg::Options<'static>) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    pub fn parse(&self, source: impl Into<String>) -> Result<SvgArtifact, SvgError> {
        let source = source.into();
        let attributes = read_root_attributes(&source)?;
        let tree = usvg::Tree::from_str(&source, &self.options)
            .map_err(|e| SvgError::Parse(e.to_string()))?;

        let size = tree.size();
        let canvas_to_user = match attributes.view_box {
            Some(vb) if vb.width() > 0.0 && vb.height() > 0.0 => {
                let sx = vb.width() / size.width() as f64;
                let sy = vb.height() / size.height() as f64;
                Affine::translate(Vec2::new(vb.x0, vb.y0)) * Affine::scale_non_uniform(sx, sy)
            }
            _ => Affine::IDENTITY,
        };

        Ok(SvgArtifact {
            source,
            tree,
            attributes,
            canvas_to_user,
        })
    }
}

/// Prepare markup for saving as a standalone file: ensure an XML
/// declaration and the SVG namespace.
pub fn normalize_svg(source: &str) -> String {
    let trimmed = source.trim_start();
    let mut svg = if trimmed.starts_with("<?xml") {
        trimmed.to_string()
    } else {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n{}",
            trimmed
        )
    };

    let namespace = format!("xmlns=\"{}\"", SVG_NAMESPACE);
    if !svg.contains(&namespace) {
        if let Some(index) = svg.find("<svg") {
            svg.insert_str(index + "<svg".len(), &format!(" {}", namespace));
        }
    }
    svg
}
