//! Test utilities for integration tests.
//!
//! Mock rasters and surfaces that record what the engine asks of them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};

use tileview::{
    EngineConfig, FrameFlag, ImageRaster, RasterSource, ScreenRect, Smoothing, Surface,
    TileEngine, TileImage, TileMaterializationError,
};

// =============================================================================
// Rasters
// =============================================================================

/// A raster whose pixel at `(x, y)` encodes its own coordinates.
pub fn gradient_raster(width: u32, height: u32) -> ImageRaster {
    ImageRaster::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x / 256) ^ (y / 256)) as u8, 255])
    }))
}

/// A raster of one colour.
pub fn solid_raster(width: u32, height: u32, color: [u8; 4]) -> ImageRaster {
    ImageRaster::new(RgbaImage::from_pixel(width, height, Rgba(color)))
}

/// A raster that counts region copies and can be switched to fail.
#[derive(Clone)]
pub struct CountingRaster {
    width: u32,
    height: u32,
    copies: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl CountingRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            copies: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl RasterSource for CountingRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn copy_region(
        &self,
        _x: u32,
        _y: u32,
        _width: u32,
        _height: u32,
        dst: &mut [u8],
    ) -> Result<(), TileMaterializationError> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TileMaterializationError::SourceUnavailable(
                "drawing context lost".to_string(),
            ));
        }
        dst.fill(0x7F);
        Ok(())
    }
}

// =============================================================================
// Surfaces
// =============================================================================

/// One recorded `draw_tile` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub width: u32,
    pub height: u32,
    pub dest: ScreenRect,
    pub smoothing: Smoothing,
}

/// A surface that records draw calls instead of compositing pixels.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub clears: usize,
    pub draws: Vec<DrawCall>,
    pub overlays: usize,
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.clears += 1;
        self.draws.clear();
    }

    fn draw_tile(&mut self, tile: TileImage<'_>, dest: ScreenRect, smoothing: Smoothing) {
        self.draws.push(DrawCall {
            width: tile.width,
            height: tile.height,
            dest,
            smoothing,
        });
    }

    fn draw_overlay(&mut self, _overlay: &tileview::DebugOverlay) {
        self.overlays += 1;
    }
}

// =============================================================================
// Engine Helpers
// =============================================================================

/// An engine with an 800x600 viewport.
pub fn create_engine(config: EngineConfig) -> TileEngine<FrameFlag> {
    let mut engine = TileEngine::new(config, FrameFlag::new()).expect("valid config");
    engine.resize(800.0, 600.0);
    engine
}

/// Run requested frames until the engine goes idle. Returns the number of passes.
pub fn run_until_idle(engine: &mut TileEngine<FrameFlag>, surface: &mut impl Surface) -> usize {
    let mut now = Instant::now();
    let mut passes = 0;
    while engine.frames_mut().take() {
        assert!(engine.render_frame(now, surface), "requested frame did not render");
        now += Duration::from_millis(16);
        passes += 1;
        assert!(passes < 1_000, "engine never went idle");
    }
    passes
}

pub fn assert_close(a: f64, b: f64) {
    let tolerance = 1e-6 * a.abs().max(b.abs()).max(1.0);
    assert!((a - b).abs() <= tolerance, "{a} != {b}");
}
