//! Viewport state and render quality.
//!
//! - [`Viewport`]: scroll offset, screen size and scale, plus the pan, zoom and
//!   fit offset math
//! - [`QualityController`]: eases render quality toward a scale-derived target
//! - [`Smoothing`]: resampling level derived from quality for each draw

mod quality;
mod viewport;

pub use quality::{
    QualityController, Smoothing, DEFAULT_MAX_QUALITY, DEFAULT_MIN_QUALITY,
    DEFAULT_QUALITY_EPSILON, DEFAULT_QUALITY_SMOOTHING, SMOOTHING_DISABLED_BELOW,
    SMOOTHING_HIGH_ABOVE,
};
pub use viewport::{Viewport, DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE};
