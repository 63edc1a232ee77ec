//! Frame scheduling.
//!
//! Any number of state changes between two frames collapse into a single
//! render pass, and at most one pass is ever queued or running. The host's
//! frame primitive (vsync callback, timer, event loop tick) is reached
//! through [`FrameRequester`]; when it fires, the host calls
//! `TileEngine::render_frame`.

use tracing::trace;

// =============================================================================
// FrameRequester Trait
// =============================================================================

/// Host primitive that invokes the engine's frame callback once per request.
pub trait FrameRequester {
    /// Ask for one frame callback.
    fn request_frame(&mut self);

    /// Withdraw an outstanding request, if the host supports it.
    fn cancel_frame(&mut self) {}
}

/// A requester for hosts that poll: records that a frame is wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFlag {
    pending: bool,
    requested: u64,
    cancelled: u64,
}

impl FrameFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a callback has been requested and not yet taken.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request. Returns whether one existed.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total requests received.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Total cancellations received.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameRequester for FrameFlag {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requested += 1;
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
        self.cancelled += 1;
    }
}

// =============================================================================
// Render State
// =============================================================================

/// Public view of the scheduler: `Idle -> Scheduled -> Rendering -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No frame requested
    Idle,

    /// One frame requested and not yet started
    Scheduled,

    /// A render pass is running
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scheduled,
    /// `rerender` records a request made while the pass was running.
    Rendering { rerender: bool },
}

/// Coalescing frame scheduler around a [`FrameRequester`].
#[derive(Debug)]
pub struct FrameScheduler<F> {
    frames: F,
    phase: Phase,
}

impl<F: FrameRequester> FrameScheduler<F> {
    pub fn new(frames: F) -> Self {
        Self {
            frames,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> RenderState {
        match self.phase {
            Phase::Idle => RenderState::Idle,
            Phase::Scheduled => RenderState::Scheduled,
            Phase::Rendering { .. } => RenderState::Rendering,
        }
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    /// Request a render pass.
    ///
    /// Returns `true` only when a new frame was requested from the host.
    /// While a pass is running the request is deferred until it finishes.
    pub fn schedule(&mut self) -> bool {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Scheduled;
                self.frames.request_frame();
                trace!("Frame requested");
                true
            }
            Phase::Scheduled => false,
            Phase::Rendering { .. } => {
                self.phase = Phase::Rendering { rerender: true };
                false
            }
        }
    }

    /// Enter a render pass. Returns `false` for a callback nobody asked for.
    pub fn begin(&mut self) -> bool {
        if self.phase != Phase::Scheduled {
            return false;
        }
        self.phase = Phase::Rendering { rerender: false };
        true
    }

    /// Leave the render pass, requesting the next frame if one was asked for
    /// during the pass.
    pub fn finish(&mut self) {
        let rerender = matches!(self.phase, Phase::Rendering { rerender: true });
        self.phase = Phase::Idle;
        if rerender {
            self.schedule();
        }
    }

    /// Drop any pending frame and return to idle.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Scheduled {
            self.frames.cancel_frame();
        }
        self.phase = Phase::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================
