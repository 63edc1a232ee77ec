//! The tile engine.
//!
//! [`TileEngine`] ties the subsystems together behind the public operations.
//! Callers mutate the viewport or install a raster; those calls only record
//! the new target state and ask the [`FrameScheduler`] for a frame. All tile
//! work happens inside [`TileEngine::render_frame`], which the host invokes
//! when its frame primitive fires.
//!
//! # Render Pass
//!
//! ```text
//! render_frame(now, surface)
//!     │
//!     ├─► quality step ───────────────► converging? schedule follow-up
//!     ├─► visible_cells(viewport)
//!     ├─► touch tiles that left the range
//!     ├─► clear surface
//!     ├─► for each visible cell
//!     │       ├─ create tile record if absent
//!     │       ├─ not loaded? ── load (skip drawing this pass)
//!     │       └─ loaded + on screen? ── draw_tile
//!     ├─► memory governor
//!     └─► debug overlay (optional)
//! ```
//!
//! Tiles loaded during a pass are drawn by a follow-up pass that the engine
//! schedules itself. Failed tiles are retried on later passes while visible.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{ConfigError, ImageLoadError};
use crate::raster::RasterSource;
use crate::render::{
    DebugOverlay, FrameRequester, FrameScheduler, RenderState, ScreenRect, Surface, TileImage,
};
use crate::tile::{
    grid_size, origin_cell, visible_cells, CellRange, LoadOutcome, MemoryGovernor, MemoryStats,
    TileStore,
};
use crate::view::{QualityController, Viewport};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Counters for one render pass.
#[derive(Debug, Default)]
struct PassStats {
    loaded: usize,
    failed: usize,
    drawn: usize,
}

// =============================================================================
// TileEngine
// =============================================================================

/// Tile-based virtual surface over a large raster.
///
/// `F` is the host's frame primitive. The engine is single-threaded: every
/// operation, including the render pass, runs on the caller's thread.
pub struct TileEngine<F: FrameRequester> {
    config: EngineConfig,
    raster: Option<Arc<dyn RasterSource>>,
    store: TileStore,
    governor: MemoryGovernor,
    quality: QualityController,
    scheduler: FrameScheduler<F>,
    viewport: Viewport,

    /// Cell range of the previous pass
    visible: CellRange,

    /// Completed render passes
    frame: u64,

    last_overlay: Option<DebugOverlay>,
    destroyed: bool,
}

impl<F: FrameRequester> TileEngine<F> {
    /// Create an engine with no raster and a zero-sized viewport.
    ///
    /// Call [`resize`](Self::resize) with the output size before expecting
    /// anything on screen.
    pub fn new(config: EngineConfig, frames: F) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = TileStore::new(config.tile_size, config.retry_backoff_frames);
        let governor = MemoryGovernor::new(config.max_memory);
        let quality = QualityController::new(
            config.min_quality,
            config.max_quality,
            config.quality_smoothing,
            config.quality_epsilon,
            config.adaptive_quality,
        );

        Ok(Self {
            config,
            raster: None,
            store,
            governor,
            quality,
            scheduler: FrameScheduler::new(frames),
            viewport: Viewport::default(),
            visible: CellRange::EMPTY,
            frame: 0,
            last_overlay: None,
            destroyed: false,
        })
    }

    // =========================================================================
    // Raster
    // =========================================================================

    /// Install a new raster.
    ///
    /// Clears every tile, resets quality to neutral and schedules a render.
    /// A raster without pixels is rejected and leaves the engine empty and idle.
    pub fn load_image(&mut self, raster: Arc<dyn RasterSource>) -> Result<(), ImageLoadError> {
        if self.destroyed {
            return Err(ImageLoadError::Destroyed);
        }

        let (width, height) = (raster.width(), raster.height());
        if width == 0 || height == 0 {
            self.unload_raster();
            return Err(ImageLoadError::EmptyRaster { width, height });
        }

        self.store.clear();
        self.visible = CellRange::EMPTY;
        self.quality.reset();
        self.raster = Some(raster);

        let (cols, rows) = grid_size(width, height, self.config.tile_size);
        info!(
            width = width,
            height = height,
            cols = cols,
            rows = rows,
            tile_size = self.config.tile_size,
            "Loaded raster"
        );

        self.schedule_render();
        Ok(())
    }

    /// Install the result of a caller-side decode step.
    ///
    /// On error no raster is installed and the previous tiles are dropped;
    /// the error is returned unchanged.
    pub fn load_decoded(
        &mut self,
        decoded: Result<Arc<dyn RasterSource>, ImageLoadError>,
    ) -> Result<(), ImageLoadError> {
        match decoded {
            Ok(raster) => self.load_image(raster),
            Err(err) => {
                if !self.destroyed {
                    warn!(error = %err, "Image load failed; engine left empty");
                    self.unload_raster();
                }
                Err(err)
            }
        }
    }

    /// Drop the raster and all tiles, and cancel any pending frame.
    fn unload_raster(&mut self) {
        self.raster = None;
        self.store.clear();
        self.visible = CellRange::EMPTY;
        self.last_overlay = None;
        self.scheduler.cancel();
    }

    /// Release everything. Later operations and frame callbacks are ignored.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let released = self.store.memory_usage();
        self.unload_raster();
        self.destroyed = true;
        info!(released_bytes = released, frames = self.frame, "Engine destroyed");
    }

    // =========================================================================
    // Viewport Operations
    // =========================================================================

    /// Set the scroll offset and scale.
    ///
    /// No-op when nothing changes. Otherwise retargets quality and schedules
    /// a render. Scales that are not positive and finite are ignored.
    pub fn set_viewport(&mut self, x: f64, y: f64, scale: f64) {
        if self.destroyed {
            return;
        }
        if !(scale > 0.0) || !scale.is_finite() || !x.is_finite() || !y.is_finite() {
            debug!(x = x, y = y, scale = scale, "Ignoring invalid viewport");
            return;
        }
        if self.viewport.x == x && self.viewport.y == y && self.viewport.scale == scale {
            return;
        }

        self.viewport.x = x;
        self.viewport.y = y;
        self.viewport.scale = scale;
        self.quality.retarget(scale);
        self.schedule_render();
    }

    /// Resize the output, in screen pixels.
    pub fn resize(&mut self, width: f64, height: f64) {
        if self.destroyed {
            return;
        }
        let width = width.max(0.0);
        let height = height.max(0.0);
        if self.viewport.width == width && self.viewport.height == height {
            return;
        }

        self.viewport.width = width;
        self.viewport.height = height;
        self.schedule_render();
    }

    /// Scroll by `(dx, dy)` screen pixels, clamped so the raster keeps
    /// covering the screen. No-op without a raster.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let Some((width, height)) = self.raster_size() else {
            return;
        };
        let (x, y) = self.viewport.panned(dx, dy, width, height);
        self.set_viewport(x, y, self.viewport.scale);
    }

    /// Zoom to `scale`, keeping the world point under `center` fixed.
    ///
    /// `scale` is clamped to the configured range and `center` defaults to
    /// the middle of the screen. No-op without a raster.
    pub fn zoom(&mut self, scale: f64, center: Option<(f64, f64)>) {
        let Some((width, height)) = self.raster_size() else {
            return;
        };
        if scale.is_nan() {
            return;
        }
        let scale = scale.clamp(self.config.min_scale, self.config.max_scale);
        let (cx, cy) = center.unwrap_or((self.viewport.width / 2.0, self.viewport.height / 2.0));
        let (x, y) = self.viewport.zoomed(scale, cx, cy, width, height);
        self.set_viewport(x, y, scale);
    }

    /// Show the whole raster centred on screen.
    pub fn fit(&mut self) {
        let Some((width, height)) = self.raster_size() else {
            return;
        };
        if let Some((x, y, scale)) = self.viewport.fitted(width, height) {
            self.set_viewport(x, y, scale);
        }
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    fn schedule_render(&mut self) {
        if !self.destroyed {
            self.scheduler.schedule();
        }
    }

    /// Frame callback.
    ///
    /// Runs one render pass into `surface` if a frame was scheduled, and
    /// returns whether a pass ran. `now` stamps tile usage.
    pub fn render_frame(&mut self, now: Instant, surface: &mut impl Surface) -> bool {
        if self.destroyed || !self.scheduler.begin() {
            return false;
        }
        let started = Instant::now();

        // (a) quality
        self.quality.step();
        if self.quality.in_transition() {
            self.scheduler.schedule();
        }

        let Some(raster) = self.raster.clone() else {
            surface.clear();
            self.scheduler.finish();
            return true;
        };
        let (raster_width, raster_height) = (raster.width(), raster.height());
        let tile_size = self.config.tile_size;
        let (cols, rows) = grid_size(raster_width, raster_height, tile_size);

        // (b) visible cells
        let visible = visible_cells(&self.viewport, tile_size, self.config.buffer_tiles, cols, rows);

        // (c) tiles leaving the range become eviction candidates from now
        let previous = self.visible;
        for key in previous.keys().filter(|key| !visible.contains(*key)) {
            self.store.touch(key, now);
        }

        // (d) create, load, draw
        surface.clear();
        let smoothing = self.quality.smoothing();
        let quality = self.quality.current();
        let pixel_ratio = self.config.device_pixel_ratio;
        let mut stats = PassStats::default();

        for key in visible.keys() {
            let loaded = self
                .store
                .get_or_create(key, raster_width, raster_height, now)
                .is_loaded();

            if !loaded {
                match self.store.load(key, raster.as_ref(), now, self.frame, quality) {
                    Ok(LoadOutcome::Loaded(_)) => stats.loaded += 1,
                    Ok(LoadOutcome::BackingOff) => {
                        trace!(col = key.col, row = key.row, "Tile load backing off");
                    }
                    Ok(LoadOutcome::AlreadyLoaded) => {}
                    Err(err) => {
                        stats.failed += 1;
                        let attempts = self.store.get(key).map_or(0, |t| t.failed_attempts());
                        warn!(
                            col = key.col,
                            row = key.row,
                            attempts = attempts,
                            error = %err,
                            "Tile materialization failed"
                        );
                    }
                }
                continue;
            }

            let Some(tile) = self.store.get(key) else {
                continue;
            };
            let Some(pixels) = tile.buffer() else {
                continue;
            };
            let rect = self.viewport.world_to_screen(
                f64::from(tile.world_x),
                f64::from(tile.world_y),
                f64::from(tile.width),
                f64::from(tile.height),
            );
            if !self.viewport.intersects(&rect) {
                continue;
            }

            surface.draw_tile(
                TileImage {
                    pixels,
                    width: tile.width,
                    height: tile.height,
                },
                rect.scaled(pixel_ratio),
                smoothing,
            );
            stats.drawn += 1;
        }

        if stats.loaded > 0 {
            self.scheduler.schedule();
        }

        // (e) memory governor
        let origin = origin_cell(&self.viewport, tile_size);
        let report = self.governor.enforce(
            &mut self.store,
            &visible,
            origin,
            self.config.record_retention_distance(),
        );

        self.visible = visible;
        self.frame += 1;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if self.config.debug_overlay {
            let overlay = self.build_overlay(&visible, cols, rows, stats.drawn, elapsed_ms);
            surface.draw_overlay(&overlay);
            self.last_overlay = Some(overlay);
        }

        debug!(
            frame = self.frame,
            visible = visible.len(),
            loaded = stats.loaded,
            failed = stats.failed,
            drawn = stats.drawn,
            evicted = report.evicted.len(),
            memory = self.store.memory_usage(),
            quality = quality,
            elapsed_ms = elapsed_ms,
            "Render pass"
        );

        self.scheduler.finish();
        true
    }

    fn build_overlay(
        &self,
        visible: &CellRange,
        cols: u32,
        rows: u32,
        drawn_tiles: usize,
        last_render_ms: f64,
    ) -> DebugOverlay {
        let pixel_ratio = self.config.device_pixel_ratio;
        let outlines: Vec<ScreenRect> = visible
            .keys()
            .filter_map(|key| self.store.get(key))
            .map(|tile| {
                self.viewport
                    .world_to_screen(
                        f64::from(tile.world_x),
                        f64::from(tile.world_y),
                        f64::from(tile.width),
                        f64::from(tile.height),
                    )
                    .scaled(pixel_ratio)
            })
            .collect();

        DebugOverlay {
            visible_tiles: visible.len(),
            total_tiles: cols as usize * rows as usize,
            drawn_tiles,
            memory_mb: self.store.memory_usage() as f64 / BYTES_PER_MIB,
            last_render_ms,
            quality: self.quality.current(),
            scale: self.viewport.scale,
            outlines,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Tile memory against the budget. Read-only.
    pub fn memory_stats(&self) -> MemoryStats {
        self.governor.stats(&self.store)
    }

    pub fn render_state(&self) -> RenderState {
        self.scheduler.state()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current render quality.
    pub fn quality(&self) -> f64 {
        self.quality.current()
    }

    /// Quality the engine is converging toward.
    pub fn target_quality(&self) -> f64 {
        self.quality.target()
    }

    /// Tile records, loaded or not.
    pub fn tile_count(&self) -> usize {
        self.store.len()
    }

    pub fn loaded_tile_count(&self) -> usize {
        self.store.loaded_count()
    }

    /// Overlay of the last pass, when the debug overlay is enabled.
    pub fn last_overlay(&self) -> Option<&DebugOverlay> {
        self.last_overlay.as_ref()
    }

    /// Cell range of the last render pass.
    pub fn visible_range(&self) -> CellRange {
        self.visible
    }

    pub fn raster_size(&self) -> Option<(u32, u32)> {
        self.raster.as_ref().map(|r| (r.width(), r.height()))
    }

    pub fn tiles(&self) -> &TileStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Completed render passes.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn frames(&self) -> &F {
        self.scheduler.frames()
    }

    pub fn frames_mut(&mut self) -> &mut F {
        self.scheduler.frames_mut()
    }
}

impl<F: FrameRequester + std::fmt::Debug> std::fmt::Debug for TileEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileEngine")
            .field("raster_size", &self.raster_size())
            .field("viewport", &self.viewport)
            .field("tiles", &self.store.len())
            .field("memory", &self.store.memory_usage())
            .field("state", &self.scheduler.state())
            .field("frames", self.scheduler.frames())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
