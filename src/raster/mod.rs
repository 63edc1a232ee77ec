//! Raster source abstraction.
//!
//! The engine never decodes images. A caller hands it something that knows its
//! natural size and can copy a sub-rectangle of RGBA pixels into a tile-sized
//! buffer. Everything else (file formats, fetching, colour handling) stays on
//! the caller's side of this trait.
//!
//! ```text
//! ┌─────────────────────────┐
//! │        TileStore        │
//! └────────────┬────────────┘
//!              │ copy_region(x, y, w, h, &mut buf)
//!              ▼
//! ┌─────────────────────────┐
//! │   RasterSource Trait    │
//! └────────────┬────────────┘
//!              ▼
//! ┌─────────────────────────┐
//! │ ImageRaster (RgbaImage) │
//! └─────────────────────────┘
//! ```

use std::path::Path;

use image::RgbaImage;

use crate::error::{ImageLoadError, TileMaterializationError};

/// Bytes per pixel of every tile buffer (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

// =============================================================================
// RasterSource Trait
// =============================================================================

/// A decoded, immutable source image addressed in world (pixel) coordinates.
pub trait RasterSource {
    /// Natural width in pixels.
    fn width(&self) -> u32;

    /// Natural height in pixels.
    fn height(&self) -> u32;

    /// Copy the `width x height` region at `(x, y)` into `dst` as tightly
    /// packed RGBA8 rows.
    ///
    /// `dst` is exactly `width * height * BYTES_PER_PIXEL` bytes long.
    fn copy_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        dst: &mut [u8],
    ) -> Result<(), TileMaterializationError>;
}

/// Check that a region request is inside `raster` and that `dst` fits it.
///
/// Shared by every `RasterSource` implementation in this crate.
pub fn check_region(
    raster: &(impl RasterSource + ?Sized),
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    dst_len: usize,
) -> Result<(), TileMaterializationError> {
    let fits_x = x.checked_add(width).is_some_and(|r| r <= raster.width());
    let fits_y = y.checked_add(height).is_some_and(|b| b <= raster.height());
    if !fits_x || !fits_y {
        return Err(TileMaterializationError::RegionOutOfBounds {
            x,
            y,
            width,
            height,
            raster_width: raster.width(),
            raster_height: raster.height(),
        });
    }

    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if dst_len != expected {
        return Err(TileMaterializationError::BufferSize {
            expected,
            actual: dst_len,
        });
    }

    Ok(())
}

// =============================================================================
// ImageRaster
// =============================================================================

/// A raster backed by a fully decoded `image::RgbaImage`.
#[derive(Debug, Clone)]
pub struct ImageRaster {
    pixels: RgbaImage,
}

impl ImageRaster {
    /// Wrap already decoded pixels.
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decode an image file into an RGBA raster.
    ///
    /// This is the caller-side decode step; its failure is what
    /// `TileEngine::load_decoded` reports as an `ImageLoadError`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageLoadError> {
        let decoded = image::open(path.as_ref())?;
        Ok(Self::new(decoded.into_rgba8()))
    }

    /// Borrow the decoded pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl From<RgbaImage> for ImageRaster {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

impl RasterSource for ImageRaster {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn copy_region(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        dst: &mut [u8],
    ) -> Result<(), TileMaterializationError> {
        check_region(self, x, y, width, height, dst.len())?;

        let src = self.pixels.as_raw();
        let src_stride = self.pixels.width() as usize * BYTES_PER_PIXEL;
        let row_len = width as usize * BYTES_PER_PIXEL;

        for (row, dst_row) in dst.chunks_exact_mut(row_len).enumerate() {
            let start = (y as usize + row) * src_stride + x as usize * BYTES_PER_PIXEL;
            dst_row.copy_from_slice(&src[start..start + row_len]);
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
