use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::geometry::GlyphGrid;

/// A decoded frame: tightly packed `rgb24` rows, `width * height * 3` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| count.checked_mul(3))
            .ok_or_else(|| anyhow!("frame size overflow for {}x{}", width, height))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer size mismatch for {}x{} (expected {} bytes, got {})",
                width,
                height,
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Resamples to the glyph grid; a frame already at grid size is returned as is.
    pub fn rescale(self, grid: GlyphGrid) -> Result<Self> {
        if self.width == grid.width && self.height == grid.height {
            return Ok(self);
        }
        let (width, height) = (self.width, self.height);
        let image = RgbImage::from_raw(width, height, self.pixels)
            .ok_or_else(|| anyhow!("failed to wrap {}x{} frame for resampling", width, height))?;
        let resized = imageops::resize(&image, grid.width, grid.height, FilterType::Triangle);
        Ok(Self {
            width: grid.width,
            height: grid.height,
            pixels: resized.into_raw(),
        })
    }
}

/// One frame converted to text, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    index: u64,
    text: String,
}

impl RenderedFrame {
    pub fn new(index: u64, text: String) -> Self {
        Self { index, text }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
