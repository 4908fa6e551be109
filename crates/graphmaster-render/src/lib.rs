//! GraphMaster Render Library
//!
//! Native collaborators for the viewer core: SVG artifacts, the Graphviz
//! layout engine and export to SVG, PNG and PDF.

pub mod export;
pub mod graphviz;
pub mod svg;

pub use export::{
    COPY_DPI, DOWNLOAD_DPI, ExportError, ExportFormat, export, rasterize, sanitize_filename,
};
pub use graphviz::GraphvizCli;
pub use svg::{SvgArtifact, SvgError, SvgParser, normalize_svg};
