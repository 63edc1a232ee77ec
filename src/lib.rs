//! # tileview
//!
//! A tile-based virtual surface for viewing very large rasters.
//!
//! The raster is cut into a grid of fixed-size tiles that are materialized
//! lazily as they come into view, drawn under the current pan/zoom transform,
//! and evicted oldest-first when a memory budget is exceeded. All work is
//! funnelled through a single coalescing render pass per frame.
//!
//! ## Features
//!
//! - **Lazy tiles**: Only the visible cells plus a configurable margin are materialized
//! - **Memory budget**: Off-screen tiles are evicted oldest-first down to 80% of the budget
//! - **Adaptive quality**: Resampling quality eases toward a scale-derived target
//! - **Frame coalescing**: Any number of changes between frames render once
//!
//! ## Architecture
//!
//! - [`raster`] - Raster source trait and an `image`-backed implementation
//! - [`tile`] - Tile grid math, tile store and memory governor
//! - [`view`] - Viewport math and the quality controller
//! - [`render`] - Frame scheduling and output surfaces
//! - [`engine`] - The [`TileEngine`] tying everything together
//! - [`config`] - Engine configuration and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use tileview::{EngineConfig, FrameFlag, ImageRaster, PixelSurface, TileEngine};
//!
//! let raster = ImageRaster::open("slide.png").unwrap();
//! let mut engine = TileEngine::new(EngineConfig::default(), FrameFlag::new()).unwrap();
//! let mut surface = PixelSurface::new(1280, 800);
//!
//! engine.resize(1280.0, 800.0);
//! engine.load_image(Arc::new(raster)).unwrap();
//! engine.fit();
//!
//! // Host frame loop
//! while engine.frames_mut().take() {
//!     engine.render_frame(Instant::now(), &mut surface);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod raster;
pub mod render;
pub mod tile;
pub mod view;

// Re-export commonly used types
pub use config::{Cli, EngineConfig};
pub use engine::TileEngine;
pub use error::{ConfigError, ImageLoadError, TileMaterializationError};
pub use raster::{ImageRaster, RasterSource, BYTES_PER_PIXEL};
pub use render::{
    DebugOverlay, FrameFlag, FrameRequester, FrameScheduler, PixelSurface, RenderState,
    ScreenRect, Surface, TileImage,
};
pub use tile::{CellRange, MemoryGovernor, MemoryStats, TileKey, TileStore};
pub use view::{QualityController, Smoothing, Viewport};
