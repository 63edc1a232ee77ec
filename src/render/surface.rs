//! Output surfaces.
//!
//! The engine clears the surface once per pass and then issues one
//! `draw_tile` call per loaded, on-screen tile. Rectangles are in device
//! pixels (screen pixels times the device pixel ratio).

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::raster::BYTES_PER_PIXEL;
use crate::view::Smoothing;

/// Axis-aligned rectangle in screen or device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Borrowed RGBA8 pixels of one materialized tile.
#[derive(Debug, Clone, Copy)]
pub struct TileImage<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Per-pass diagnostics, reported to the surface when the overlay is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugOverlay {
    /// Tiles in the visible (buffered) cell range
    pub visible_tiles: usize,

    /// Tiles in the whole grid
    pub total_tiles: usize,

    /// Tiles drawn this pass
    pub drawn_tiles: usize,

    /// Memory held by loaded tiles, in MiB
    pub memory_mb: f64,

    /// Duration of the pass in milliseconds
    pub last_render_ms: f64,

    /// Current render quality
    pub quality: f64,

    /// Current scale
    pub scale: f64,

    /// Device-pixel outlines of the visible cells
    pub outlines: Vec<ScreenRect>,
}

// =============================================================================
// Surface Trait
// =============================================================================

/// Drawable target for a render pass.
pub trait Surface {
    /// Erase the whole surface.
    fn clear(&mut self);

    /// Draw `tile` stretched over `dest` with the given resampling.
    fn draw_tile(&mut self, tile: TileImage<'_>, dest: ScreenRect, smoothing: Smoothing);

    /// Draw the debug overlay. Surfaces without an overlay ignore it.
    fn draw_overlay(&mut self, _overlay: &DebugOverlay) {}
}

// =============================================================================
// PixelSurface
// =============================================================================

const OUTLINE_COLOR: [u8; 4] = [255, 0, 255, 255];

/// In-memory RGBA framebuffer.
///
/// Tiles are resampled with `image::imageops::resize`: nearest when smoothing
/// is disabled, triangle at medium and Catmull-Rom at high.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    frame: RgbaImage,
    background: Rgba<u8>,
    draw_calls: usize,
}

impl PixelSurface {
    /// Create a transparent `width x height` surface (device pixels).
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, Rgba([0, 0, 0, 0]))
    }

    pub fn with_background(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            frame: RgbaImage::from_pixel(width, height, background),
            background,
            draw_calls: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.frame.get_pixel(x, y).0)
    }

    /// Tiles drawn since the last clear.
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn into_image(self) -> RgbaImage {
        self.frame
    }

    /// Clip `dest` to the framebuffer, as pixel index ranges.
    fn clip(&self, dest: &ScreenRect) -> Option<(u32, u32, u32, u32)> {
        let x0 = dest.x.max(0.0).floor();
        let y0 = dest.y.max(0.0).floor();
        let x1 = (dest.x + dest.width).min(f64::from(self.width())).ceil();
        let y1 = (dest.y + dest.height).min(f64::from(self.height())).ceil();
        if !(x1 > x0 && y1 > y0) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn outline(&mut self, rect: &ScreenRect) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let color = Rgba(OUTLINE_COLOR);
        for x in x0..x1 {
            self.frame.put_pixel(x, y0, color);
            self.frame.put_pixel(x, y1 - 1, color);
        }
        for y in y0..y1 {
            self.frame.put_pixel(x0, y, color);
            self.frame.put_pixel(x1 - 1, y, color);
        }
    }
}

impl Surface for PixelSurface {
    fn clear(&mut self) {
        let background = self.background;
        self.frame.pixels_mut().for_each(|p| *p = background);
        self.draw_calls = 0;
    }

    fn draw_tile(&mut self, tile: TileImage<'_>, dest: ScreenRect, smoothing: Smoothing) {
        if tile.width == 0 || tile.height == 0 || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let expected = tile.width as usize * tile.height as usize * BYTES_PER_PIXEL;
        let Some(pixels) = tile.pixels.get(..expected) else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.clip(&dest) else {
            return;
        };
        let Some(source) = RgbaImage::from_raw(tile.width, tile.height, pixels.to_vec()) else {
            return;
        };

        // Device pixels per texel
        let kx = dest.width / f64::from(tile.width);
        let ky = dest.height / f64::from(tile.height);

        // Only resample the texels that cover the clipped area
        let src_x0 = ((f64::from(x0) - dest.x) / kx).floor().max(0.0) as u32;
        let src_y0 = ((f64::from(y0) - dest.y) / ky).floor().max(0.0) as u32;
        let src_x1 = ((f64::from(x1) - dest.x) / kx).ceil().min(f64::from(tile.width)) as u32;
        let src_y1 = ((f64::from(y1) - dest.y) / ky).ceil().min(f64::from(tile.height)) as u32;
        if src_x1 <= src_x0 || src_y1 <= src_y0 {
            return;
        }

        let left = (dest.x + f64::from(src_x0) * kx).round();
        let top = (dest.y + f64::from(src_y0) * ky).round();
        let right = (dest.x + f64::from(src_x1) * kx).round();
        let bottom = (dest.y + f64::from(src_y1) * ky).round();
        let out_width = (right - left).max(1.0) as u32;
        let out_height = (bottom - top).max(1.0) as u32;

        let window = imageops::crop_imm(&source, src_x0, src_y0, src_x1 - src_x0, src_y1 - src_y0);
        let scaled = imageops::resize(&*window, out_width, out_height, filter_for(smoothing));
        imageops::replace(&mut self.frame, &scaled, left as i64, top as i64);
        self.draw_calls += 1;
    }

    fn draw_overlay(&mut self, overlay: &DebugOverlay) {
        for rect in &overlay.outlines {
            self.outline(rect);
        }
    }
}

fn filter_for(smoothing: Smoothing) -> FilterType {
    match smoothing {
        Smoothing::Disabled => FilterType::Nearest,
        Smoothing::Medium => FilterType::Triangle,
        Smoothing::High => FilterType::CatmullRom,
    }
}

// =============================================================================
// Tests
// =============================================================================
