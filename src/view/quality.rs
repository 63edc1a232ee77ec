//! Adaptive render quality.
//!
//! The target quality follows the current scale in three steps. The current
//! quality eases toward it by a fixed fraction of the remaining gap on every
//! render pass, so sharpness does not snap during a zoom gesture. While the
//! gap is open the controller reports a transition in progress and the
//! engine keeps scheduling frames on its own.

use serde::Serialize;

/// Lower quality bound by default.
pub const DEFAULT_MIN_QUALITY: f64 = 0.5;

/// Upper quality bound by default.
pub const DEFAULT_MAX_QUALITY: f64 = 2.0;

/// Fraction of the remaining gap closed per render pass.
pub const DEFAULT_QUALITY_SMOOTHING: f64 = 0.1;

/// Gap below which current quality snaps to the target.
pub const DEFAULT_QUALITY_EPSILON: f64 = 0.01;

/// Below this quality, tiles are drawn without smoothing.
pub const SMOOTHING_DISABLED_BELOW: f64 = 0.75;

/// Above this quality, tiles are drawn with the highest smoothing level.
pub const SMOOTHING_HIGH_ABOVE: f64 = 1.5;

/// Resampling applied when a tile is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Nearest-neighbour
    Disabled,
    Medium,
    High,
}

impl Smoothing {
    pub fn for_quality(quality: f64) -> Self {
        if quality < SMOOTHING_DISABLED_BELOW {
            Smoothing::Disabled
        } else if quality > SMOOTHING_HIGH_ABOVE {
            Smoothing::High
        } else {
            Smoothing::Medium
        }
    }
}

/// Exponential smoother of render quality toward a scale-derived target.
#[derive(Debug, Clone)]
pub struct QualityController {
    current: f64,
    target: f64,
    min: f64,
    max: f64,
    smoothing: f64,
    epsilon: f64,
    adaptive: bool,
}

impl QualityController {
    pub fn new(min: f64, max: f64, smoothing: f64, epsilon: f64, adaptive: bool) -> Self {
        let neutral = 1.0_f64.clamp(min, max);
        Self {
            current: neutral,
            target: neutral,
            min,
            max,
            smoothing,
            epsilon,
            adaptive,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether current quality has not yet reached the target.
    pub fn in_transition(&self) -> bool {
        self.current != self.target
    }

    /// Return both current and target quality to neutral.
    pub fn reset(&mut self) {
        let neutral = 1.0_f64.clamp(self.min, self.max);
        self.current = neutral;
        self.target = neutral;
    }

    /// Retarget from the viewport scale. Ignored unless adaptive.
    pub fn retarget(&mut self, scale: f64) {
        if !self.adaptive {
            return;
        }
        let target: f64 = if scale < 0.5 {
            0.5
        } else if scale > 2.0 {
            2.0
        } else {
            1.0
        };
        self.target = target.clamp(self.min, self.max);
    }

    /// Advance one smoothing step. Snaps to the target once the gap is
    /// below epsilon.
    pub fn step(&mut self) {
        let delta = self.target - self.current;
        if delta.abs() < self.epsilon {
            self.current = self.target;
            return;
        }
        self.current = (self.current + delta * self.smoothing).clamp(self.min, self.max);
    }

    /// Smoothing level for the current quality.
    pub fn smoothing(&self) -> Smoothing {
        Smoothing::for_quality(self.current)
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_QUALITY,
            DEFAULT_MAX_QUALITY,
            DEFAULT_QUALITY_SMOOTHING,
            DEFAULT_QUALITY_EPSILON,
            true,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
