//! System clipboard through `arboard`.

use std::borrow::Cow;

use graphmaster_core::platform::{Capabilities, Clipboard, PlatformError, RgbaImage};

/// The system clipboard.
pub struct SystemClipboard {
    clipboard: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, PlatformError> {
        let clipboard = arboard::Clipboard::new().map_err(map_error)?;
        Ok(Self { clipboard })
    }
}

fn map_error(e: arboard::Error) -> PlatformError {
    match e {
        arboard::Error::ClipboardNotSupported => PlatformError::Unsupported,
        arboard::Error::ClipboardOccupied => PlatformError::Denied(e.to_string()),
        other => PlatformError::Other(other.to_string()),
    }
}

impl Clipboard for SystemClipboard {
    fn write_image(&mut self, image: &RgbaImage) -> Result<(), PlatformError> {
        // arboard expects raw RGBA pixels, not encoded PNG data.
        let image_data = arboard::ImageData {
            width: image.width as usize,
            height: image.height as usize,
            bytes: Cow::Borrowed(&image.pixels),
        };
        self.clipboard.set_image(image_data).map_err(map_error)?;
        log::info!("PNG copied to clipboard ({}x{})", image.width, image.height);
        Ok(())
    }

    fn read_text(&mut self) -> Result<String, PlatformError> {
        self.clipboard.get_text().map_err(map_error)
    }
}

/// Probe what this host supports.
pub fn probe_capabilities() -> Capabilities {
    match arboard::Clipboard::new() {
        Ok(_) => Capabilities {
            clipboard_image: true,
            clipboard_text: true,
            fullscreen: false,
        },
        Err(e) => {
            log::warn!("Clipboard unavailable: {}", e);
            Capabilities::default()
        }
    }
}
