//! Export of rendered graphs to SVG, PNG and PDF, and raster images for
//! the clipboard.

use std::str::FromStr;

use graphmaster_core::geometry::{GeometryError, valid_bounding_box};
use graphmaster_core::platform::RgbaImage;
use kurbo::{Affine, Rect, Vec2};
use thiserror::Error;

use crate::svg::{SvgArtifact, normalize_svg};

/// Resolution of CSS pixels.
pub const CSS_DPI: f64 = 96.0;
/// Resolution of downloaded images.
pub const DOWNLOAD_DPI: f64 = 600.0;
/// Resolution of images copied to the clipboard.
pub const COPY_DPI: f64 = 300.0;
/// Smallest raster scale factor.
pub const MIN_RASTER_SCALE: f64 = 0.1;
/// File name used when the requested one is empty.
pub const DEFAULT_FILE_STEM: &str = "graph";

const INCHES_PER_METER: f64 = 39.3701;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnknownFormat(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("Image too large: {width}x{height}")]
    TooLarge { width: f64, height: f64 },
    #[error("Failed to allocate a {0}x{1} image")]
    PixmapAlloc(u32, u32),
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),
    #[error("Failed to parse SVG for PDF conversion: {0}")]
    PdfParse(String),
    #[error("PDF conversion failed: {0}")]
    PdfConvert(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Svg => "image/svg+xml;charset=utf-8",
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Turn a user-entered name into a safe file name with the format's
/// extension.
pub fn sanitize_filename(name: &str, format: ExportFormat) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() {
        DEFAULT_FILE_STEM
    } else {
        stem.as_str()
    };
    format!("{}.{}", stem, format.extension())
}

/// Raster scale for a target resolution.
pub fn raster_scale(dpi: f64) -> f64 {
    (dpi / CSS_DPI).max(MIN_RASTER_SCALE)
}

/// Size in pixels of `bounds` rasterised at `scale`.
fn raster_size(bounds: Rect, scale: f64) -> ExportResult<(u32, u32)> {
    let width = (bounds.width() * scale).ceil();
    let height = (bounds.height() * scale).ceil();
    if !(width >= 1.0 && height >= 1.0 && width <= u32::MAX as f64 && height <= u32::MAX as f64) {
        return Err(ExportError::TooLarge { width, height });
    }
    Ok((width as u32, height as u32))
}

fn to_skia(transform: Affine) -> tiny_skia::Transform {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    tiny_skia::Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Rasterise the artifact's bounding box at `dpi` onto a white background.
pub fn rasterize(artifact: &SvgArtifact, dpi: f64) -> ExportResult<RgbaImage> {
    let bounds = valid_bounding_box(artifact)?.rect;
    let scale = raster_scale(dpi);
    let (width, height) = raster_size(bounds, scale)?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::PixmapAlloc(width, height))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    // Canvas pixels -> user space -> bounding box at the origin, scaled.
    let transform = Affine::scale(scale)
        * Affine::translate(-Vec2::new(bounds.x0, bounds.y0))
        * artifact.canvas_to_user();
    resvg::render(artifact.tree(), to_skia(transform), &mut pixmap.as_mut());

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        pixels.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    log::debug!("Rasterised {}x{} at {} dpi", width, height, dpi);
    Ok(RgbaImage {
        width,
        height,
        pixels,
    })
}

/// Encode an image as PNG, recording `dpi` in the `pHYs` chunk.
pub fn encode_png(image: &RgbaImage, dpi: f64) -> ExportResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let pixels_per_meter = (dpi * INCHES_PER_METER).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder
            .write_header()
            .map_err(|e| ExportError::PngEncode(e.to_string()))?;
        writer
            .write_image_data(&image.pixels)
            .map_err(|e| ExportError::PngEncode(e.to_string()))?;
    }
    Ok(png_data)
}

/// Standalone SVG file contents.
pub fn export_svg(artifact: &SvgArtifact) -> String {
    normalize_svg(artifact.source())
}

/// PNG file contents at `dpi`.
pub fn export_png(artifact: &SvgArtifact, dpi: f64) -> ExportResult<Vec<u8>> {
    let image = rasterize(artifact, dpi)?;
    encode_png(&image, dpi)
}

/// Vector PDF file contents.
pub fn export_pdf(artifact: &SvgArtifact) -> ExportResult<Vec<u8>> {
    let mut options = svg2pdf::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = svg2pdf::usvg::Tree::from_str(artifact.source(), &options)
        .map_err(|e| ExportError::PdfParse(e.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| ExportError::PdfConvert(e.to_string()))
}

/// File contents for `format`. `dpi` only applies to PNG.
pub fn export(artifact: &SvgArtifact, format: ExportFormat, dpi: f64) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Svg => Ok(export_svg(artifact).into_bytes()),
        ExportFormat::Png => export_png(artifact, dpi),
        ExportFormat::Pdf => export_pdf(artifact),
    }
}
