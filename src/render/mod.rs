//! Render scheduling and output surfaces.
//!
//! - [`FrameScheduler`]: coalesces render requests, at most one pass in flight
//! - [`FrameRequester`]: the host's frame primitive
//! - [`Surface`]: the host's drawable target
//! - [`PixelSurface`]: in-memory RGBA framebuffer implementing [`Surface`]

mod scheduler;
mod surface;

pub use scheduler::{FrameFlag, FrameRequester, FrameScheduler, RenderState};
pub use surface::{DebugOverlay, PixelSurface, ScreenRect, Surface, TileImage};
