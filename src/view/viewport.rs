//! Viewport (camera) state and pan/zoom/fit math.
//!
//! `x` and `y` are the scroll offset of the screen's top-left corner into the
//! raster scaled by `scale`, in screen pixels. The world (raster pixel) point
//! under screen point `(sx, sy)` is therefore `((x + sx) / scale, (y + sy) / scale)`.

use serde::{Deserialize, Serialize};

use crate::render::ScreenRect;

/// Smallest scale `zoom` accepts by default.
pub const DEFAULT_MIN_SCALE: f64 = 0.1;

/// Largest scale `zoom` accepts by default.
pub const DEFAULT_MAX_SCALE: f64 = 10.0;

/// Pan/zoom state of the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal scroll offset in screen pixels
    pub x: f64,

    /// Vertical scroll offset in screen pixels
    pub y: f64,

    /// Screen width in pixels
    pub width: f64,

    /// Screen height in pixels
    pub height: f64,

    /// World-to-screen scale factor (> 0)
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// World point under the screen point `(sx, sy)`.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((self.x + sx) / self.scale, (self.y + sy) / self.scale)
    }

    /// Screen rectangle covering a world-space rectangle.
    pub fn world_to_screen(&self, world_x: f64, world_y: f64, width: f64, height: f64) -> ScreenRect {
        ScreenRect {
            x: world_x * self.scale - self.x,
            y: world_y * self.scale - self.y,
            width: width * self.scale,
            height: height * self.scale,
        }
    }

    /// Whether any part of `rect` lies on screen.
    pub fn intersects(&self, rect: &ScreenRect) -> bool {
        rect.x < self.width
            && rect.y < self.height
            && rect.x + rect.width > 0.0
            && rect.y + rect.height > 0.0
    }

    /// Largest scroll offsets that keep a `raster_width x raster_height`
    /// raster covering the screen at `scale`. Never negative.
    pub fn max_offset(&self, raster_width: u32, raster_height: u32, scale: f64) -> (f64, f64) {
        (
            (f64::from(raster_width) * scale - self.width).max(0.0),
            (f64::from(raster_height) * scale - self.height).max(0.0),
        )
    }

    /// Offset after panning by `(dx, dy)` screen pixels, clamped to the raster.
    pub fn panned(&self, dx: f64, dy: f64, raster_width: u32, raster_height: u32) -> (f64, f64) {
        let (max_x, max_y) = self.max_offset(raster_width, raster_height, self.scale);
        (
            clamp_offset(self.x + dx, max_x),
            clamp_offset(self.y + dy, max_y),
        )
    }

    /// Offset that keeps the world point under screen point `(cx, cy)` fixed
    /// when switching to `new_scale`, clamped to the raster.
    pub fn zoomed(
        &self,
        new_scale: f64,
        cx: f64,
        cy: f64,
        raster_width: u32,
        raster_height: u32,
    ) -> (f64, f64) {
        let ratio = new_scale / self.scale;
        let x = (self.x + cx) * ratio - cx;
        let y = (self.y + cy) * ratio - cy;
        let (max_x, max_y) = self.max_offset(raster_width, raster_height, new_scale);
        (clamp_offset(x, max_x), clamp_offset(y, max_y))
    }

    /// Scale and offset that show the whole raster centred on screen.
    ///
    /// Returns `None` for a raster or screen without area.
    pub fn fitted(&self, raster_width: u32, raster_height: u32) -> Option<(f64, f64, f64)> {
        if raster_width == 0 || raster_height == 0 || self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let rw = f64::from(raster_width);
        let rh = f64::from(raster_height);
        let scale = (self.width / rw).min(self.height / rh);
        let x = (rw * scale - self.width) / 2.0;
        let y = (rh * scale - self.height) / 2.0;
        Some((x, y, scale))
    }
}

fn clamp_offset(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

// =============================================================================
// Tests
// =============================================================================
