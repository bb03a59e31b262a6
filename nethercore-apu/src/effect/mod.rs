//! Long-lived effect state
//!
//! Effect commands are rebuilt every frame; whatever they need to remember
//! between frames lives here, owned by the effect context and borrowed by
//! the command for one frame.

mod limiter;

pub use limiter::{LimiterParameter, LimiterState, LimiterStatistics};

/// Lifecycle of an effect as seen by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageState {
    /// State must be (re)initialized from the parameters
    #[default]
    Invalid,
    /// Parameters changed; keep the running state
    New,
    Enabled,
    Disabled,
}

/// Single-pole IIR follower: `mean += alpha * (value - mean)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExponentialMovingAverage {
    mean: f32,
}

impl ExponentialMovingAverage {
    pub fn new(mean: f32) -> Self {
        Self { mean }
    }

    #[inline]
    pub fn read(&self) -> f32 {
        self.mean
    }

    /// Move toward `value` by `alpha` and return the new mean
    #[inline]
    pub fn update(&mut self, value: f32, alpha: f32) -> f32 {
        self.mean += alpha * (value - self.mean);
        self.mean
    }
}
