//! Host capability probing.
//!
//! Hosts differ in what they can do with the preview (image clipboard,
//! fullscreen). They probe once at startup and hand the result to the
//! viewer; everything else talks to the traits here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the host supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Images can be written to the clipboard.
    pub clipboard_image: bool,
    /// Text can be read from the clipboard.
    pub clipboard_text: bool,
    /// The preview can go fullscreen.
    pub fullscreen: bool,
}

/// Platform operation errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Not supported on this platform")]
    Unsupported,
    #[error("Permission denied: {0}")]
    Denied(String),
    #[error("Platform error: {0}")]
    Other(String),
}

/// An RGBA8 image, rows top to bottom, not premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Clipboard access for the host.
pub trait Clipboard {
    /// Put an image on the clipboard.
    fn write_image(&mut self, image: &RgbaImage) -> Result<(), PlatformError>;

    /// Read plain text from the clipboard.
    fn read_text(&mut self) -> Result<String, PlatformError>;
}
