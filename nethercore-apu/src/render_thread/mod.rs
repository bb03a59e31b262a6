//! Real-time frame thread
//!
//! Runs the command list executor once per frame period on a dedicated
//! thread. Everything else in the emulated system talks to it through
//! staged updates; the thread applies them between frames, so voice and
//! effect state are only ever touched by the render thread.
//!
//! # Architecture
//!
//! ```text
//! Emulator Thread                 Render Thread                  Host Audio
//!     │                                │                             │
//! [Parameter change]                   │                             │
//!     │                                │                             │
//! [send_update]─────(channel)─────►[Drain updates]                   │
//!     │                            [Build + process CommandList]     │
//!     │                            [DeviceSink]────────(ring)─────►[Consume]
//!     │                            [Sleep to deadline]               │
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let (sink, consumer) = RingBufferSink::with_capacity(4800, 2);
//! let handle = RenderThread::spawn(renderer, sink, config.frame_period())?;
//!
//! // From any thread, stage a change for the next frame
//! if !handle.send_update(update).is_queued() {
//!     // retry next frame
//! }
//! ```

mod handle;
mod metrics;
mod thread;

pub use handle::{RenderThreadHandle, SendOutcome};
pub use metrics::RenderMetrics;
pub use thread::{FrameRenderer, RenderThread, UPDATE_QUEUE_DEPTH};

/// Errors starting the render thread
#[derive(Debug, thiserror::Error)]
pub enum RenderThreadError {
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
}
