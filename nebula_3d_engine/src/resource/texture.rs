//! Texture data as supplied by the asset loader.
//!
//! Pixel buffers arrive fully decoded as tightly-packed RGBA8; the engine
//! does no image format parsing. The backend stages the buffer to a
//! device-local image and generates the full mip chain.

use crate::error::{Error, Result};

/// Bytes per pixel of the decoded format (RGBA, 8 bits per channel)
pub const TEXTURE_BYTES_PER_PIXEL: usize = 4;

/// A decoded texture ready for upload
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Debug name (shows up in logs)
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Tightly-packed RGBA8 pixels, row-major, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Check dimensions against the pixel buffer length
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture '{}' has zero extent ({}x{})",
                self.name, self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize * TEXTURE_BYTES_PER_PIXEL;
        if self.pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "texture '{}': {} bytes of pixel data, expected {}",
                self.name,
                self.pixels.len(),
                expected
            )));
        }

        Ok(())
    }

    /// Byte size of the level-0 image
    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
