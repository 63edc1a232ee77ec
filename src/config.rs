//! Configuration for the tile engine and the `tileview` binary.
//!
//! - [`EngineConfig`]: library configuration, with defaults for every field and
//!   serde support so hosts can embed it in their own settings files
//! - [`Cli`]: command-line arguments of the `tileview` binary via clap, each
//!   also settable from a `TILEVIEW_` environment variable
//!
//! # Environment Variables
//!
//! - `TILEVIEW_WIDTH` / `TILEVIEW_HEIGHT` - Viewport size in screen pixels (default: 1280x800)
//! - `TILEVIEW_TILE_SIZE` - Tile edge in pixels (default: 512)
//! - `TILEVIEW_BUFFER_TILES` - Tile margin preloaded around the viewport (default: 1)
//! - `TILEVIEW_MAX_MEMORY_MB` - Tile memory budget in MiB (default: 256)
//! - `TILEVIEW_PIXEL_RATIO` - Device pixel ratio (default: 1.0)
//! - `TILEVIEW_FRAME_MS` - Frame interval in milliseconds (default: 16)
//! - `TILEVIEW_RETRY_BACKOFF` - Frames to back off per failed tile load (default: 0)

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tile::DEFAULT_MAX_MEMORY;
use crate::view::{
    DEFAULT_MAX_QUALITY, DEFAULT_MAX_SCALE, DEFAULT_MIN_QUALITY, DEFAULT_MIN_SCALE,
    DEFAULT_QUALITY_EPSILON, DEFAULT_QUALITY_SMOOTHING,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default tile margin around the viewport.
pub const DEFAULT_BUFFER_TILES: u32 = 1;

/// Default viewport width for the binary.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height for the binary.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

/// Default frame interval for the binary (~60 Hz).
pub const DEFAULT_FRAME_MS: u64 = 16;

/// Multiple of `buffer_tiles` beyond which unloaded tile records are dropped.
pub const RECORD_RETENTION_FACTOR: u64 = 3;

// =============================================================================
// Engine Configuration
// =============================================================================

/// Tuning of a [`TileEngine`](crate::TileEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tile edge in pixels.
    pub tile_size: u32,

    /// Extra tiles materialized around the visible region on every side.
    pub buffer_tiles: u32,

    /// Memory budget for materialized tiles, in bytes.
    pub max_memory: usize,

    /// Derive the quality target from the scale.
    pub adaptive_quality: bool,

    pub min_quality: f64,
    pub max_quality: f64,

    /// Fraction of the quality gap closed per frame.
    pub quality_smoothing: f64,

    /// Quality gap below which the current quality snaps to the target.
    pub quality_epsilon: f64,

    pub min_scale: f64,
    pub max_scale: f64,

    /// Device pixels per screen pixel.
    pub device_pixel_ratio: f64,

    /// Report a [`DebugOverlay`](crate::render::DebugOverlay) every pass.
    pub debug_overlay: bool,

    /// Render passes a failed tile waits per consecutive failure before its
    /// next load attempt. 0 retries on every pass in which it is visible.
    pub retry_backoff_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            buffer_tiles: DEFAULT_BUFFER_TILES,
            max_memory: DEFAULT_MAX_MEMORY,
            adaptive_quality: true,
            min_quality: DEFAULT_MIN_QUALITY,
            max_quality: DEFAULT_MAX_QUALITY,
            quality_smoothing: DEFAULT_QUALITY_SMOOTHING,
            quality_epsilon: DEFAULT_QUALITY_EPSILON,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            device_pixel_ratio: 1.0,
            debug_overlay: false,
            retry_backoff_frames: 0,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.max_memory == 0 {
            return Err(ConfigError::ZeroMemoryBudget);
        }
        if !(self.min_quality > 0.0 && self.min_quality <= self.max_quality)
            || !self.max_quality.is_finite()
        {
            return Err(ConfigError::InvalidQualityRange {
                min: self.min_quality,
                max: self.max_quality,
            });
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) || !self.max_scale.is_finite()
        {
            return Err(ConfigError::InvalidScaleRange {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !(self.quality_smoothing > 0.0 && self.quality_smoothing <= 1.0) {
            return Err(ConfigError::InvalidSmoothing(self.quality_smoothing));
        }
        if !(self.quality_epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.quality_epsilon));
        }
        if !(self.device_pixel_ratio > 0.0) || !self.device_pixel_ratio.is_finite() {
            return Err(ConfigError::InvalidPixelRatio(self.device_pixel_ratio));
        }
        Ok(())
    }

    /// Grid distance beyond which an evicted tile loses its record.
    pub fn record_retention_distance(&self) -> u64 {
        RECORD_RETENTION_FACTOR * u64::from(self.buffer_tiles)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// tileview - Pan and zoom through a large image one tile at a time.
///
/// Loads an image, fits it to the viewport, then plays back a scripted
/// session of zoom and pan steps, rendering frames into an in-memory surface.
#[derive(Parser, Debug, Clone)]
#[command(name = "tileview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Image file to display.
    #[arg(env = "TILEVIEW_INPUT")]
    pub input: PathBuf,

    // =========================================================================
    // Viewport
    // =========================================================================
    /// Viewport width in screen pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH, env = "TILEVIEW_WIDTH")]
    pub width: u32,

    /// Viewport height in screen pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT, env = "TILEVIEW_HEIGHT")]
    pub height: u32,

    /// Device pixel ratio of the output surface.
    #[arg(long, default_value_t = 1.0, env = "TILEVIEW_PIXEL_RATIO")]
    pub pixel_ratio: f64,

    // =========================================================================
    // Tiles and Memory
    // =========================================================================
    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILEVIEW_TILE_SIZE")]
    pub tile_size: u32,

    /// Tiles preloaded around the visible region.
    #[arg(long, default_value_t = DEFAULT_BUFFER_TILES, env = "TILEVIEW_BUFFER_TILES")]
    pub buffer_tiles: u32,

    /// Tile memory budget in MiB.
    #[arg(long, default_value_t = DEFAULT_MAX_MEMORY / (1024 * 1024), env = "TILEVIEW_MAX_MEMORY_MB")]
    pub max_memory_mb: usize,

    /// Render passes to back off per consecutive failed tile load (0 = retry every pass).
    #[arg(long, default_value_t = 0, env = "TILEVIEW_RETRY_BACKOFF")]
    pub retry_backoff: u32,

    /// Disable scale-driven quality adaptation.
    #[arg(long, default_value_t = false)]
    pub fixed_quality: bool,

    // =========================================================================
    // Session Script
    // =========================================================================
    /// Zoom steps to play after fitting (absolute scales, comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub zoom: Vec<f64>,

    /// Pan steps to play after zooming ("dx:dy" pairs, comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub pan: Vec<String>,

    /// Frame interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_FRAME_MS, env = "TILEVIEW_FRAME_MS")]
    pub frame_ms: u64,

    // =========================================================================
    // Output
    // =========================================================================
    /// Write the final frame to this PNG file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the final debug overlay as JSON.
    #[arg(long, default_value_t = false)]
    pub stats_json: bool,

    /// Draw tile outlines into the output frame.
    #[arg(long, default_value_t = false)]
    pub debug_overlay: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        if self.frame_ms == 0 {
            return Err("frame_ms must be greater than 0".to_string());
        }
        if let Some(bad) = self.zoom.iter().find(|s| !(**s > 0.0) || !s.is_finite()) {
            return Err(format!("zoom steps must be positive, got {}", bad));
        }
        self.pan_steps()?;
        self.engine_config()
            .validate()
            .map_err(|e| format!("Invalid engine configuration: {}", e))
    }

    /// Parse the `--pan` steps into `(dx, dy)` pairs.
    pub fn pan_steps(&self) -> Result<Vec<(f64, f64)>, String> {
        self.pan
            .iter()
            .map(|step| {
                let (dx, dy) = step
                    .split_once(':')
                    .ok_or_else(|| format!("pan step '{}' must look like dx:dy", step))?;
                let dx = dx
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("pan step '{}': {}", step, e))?;
                let dy = dy
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("pan step '{}': {}", step, e))?;
                Ok((dx, dy))
            })
            .collect()
    }

    /// Engine configuration described by these arguments.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tile_size: self.tile_size,
            buffer_tiles: self.buffer_tiles,
            max_memory: self.max_memory_mb.saturating_mul(1024 * 1024),
            adaptive_quality: !self.fixed_quality,
            device_pixel_ratio: self.pixel_ratio,
            debug_overlay: self.debug_overlay || self.stats_json,
            retry_backoff_frames: self.retry_backoff,
            ..EngineConfig::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
