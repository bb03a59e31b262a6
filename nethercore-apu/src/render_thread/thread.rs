//! Render thread implementation
//!
//! Ticks at a fixed frame period, applying staged updates before each frame.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::RenderThreadError;
use super::handle::RenderThreadHandle;
use super::metrics::RenderMetrics;
use crate::command_list::FrameReport;
use crate::config::ApuConfig;
use crate::sink::OutputSink;

/// Updates that can be staged ahead of the render thread
pub const UPDATE_QUEUE_DEPTH: usize = 8;

/// Produces one frame at a time for the render thread
///
/// Implementors own the long-lived voice and effect state, build a
/// command list from it each frame and process it into `sink`.
pub trait FrameRenderer: Send + 'static {
    /// Staged change from another thread (new voice parameters, ...)
    type Update: Send + 'static;

    /// Apply a staged change; called between frames only
    fn apply_update(&mut self, update: Self::Update);

    /// Render one frame
    fn render_frame(&mut self, sink: &mut dyn OutputSink) -> FrameReport;
}

/// Render thread state
pub struct RenderThread<R: FrameRenderer, S> {
    rx: mpsc::Receiver<R::Update>,
    renderer: R,
    sink: S,
    frame_period: Duration,
    metrics: RenderMetrics,
}

impl<R, S> RenderThread<R, S>
where
    R: FrameRenderer,
    S: OutputSink + Send + 'static,
{
    /// Spawn the render thread, logging metrics once per second
    pub fn spawn(
        renderer: R,
        sink: S,
        frame_period: Duration,
    ) -> Result<RenderThreadHandle<R::Update>, RenderThreadError> {
        Self::spawn_with_interval(renderer, sink, frame_period, Duration::from_secs(1))
    }

    /// Spawn the render thread with the frame period and metrics interval
    /// from `config`
    pub fn spawn_with_config(
        renderer: R,
        sink: S,
        config: &ApuConfig,
    ) -> Result<RenderThreadHandle<R::Update>, RenderThreadError> {
        Self::spawn_with_interval(
            renderer,
            sink,
            config.frame_period(),
            config.metrics_log_interval(),
        )
    }

    fn spawn_with_interval(
        renderer: R,
        sink: S,
        frame_period: Duration,
        metrics_interval: Duration,
    ) -> Result<RenderThreadHandle<R::Update>, RenderThreadError> {
        let (tx, rx) = mpsc::sync_channel::<R::Update>(UPDATE_QUEUE_DEPTH);

        let handle = thread::Builder::new()
            .name("apu-render".into())
            .spawn(move || {
                let mut render = Self {
                    rx,
                    renderer,
                    sink,
                    frame_period,
                    metrics: RenderMetrics::new(metrics_interval),
                };
                render.run();
            })?;

        Ok(RenderThreadHandle {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    fn run(&mut self) {
        debug!(
            period_us = self.frame_period.as_micros() as u64,
            "Render thread started"
        );

        let mut deadline = Instant::now() + self.frame_period;

        'frames: loop {
            // 1. Apply everything staged since the last frame
            loop {
                match self.rx.try_recv() {
                    Ok(update) => {
                        self.renderer.apply_update(update);
                        self.metrics.record_update();
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        debug!("Render thread exiting (channel disconnected)");
                        break 'frames;
                    }
                }
            }

            // 2. Render
            let report = self.renderer.render_frame(&mut self.sink);
            self.metrics.record_frame(&report);
            self.metrics.maybe_log();

            // 3. Wait for the next tick. A late frame is never skipped; the
            //    schedule restarts from now instead of bursting to catch up.
            let now = Instant::now();
            if now > deadline {
                self.metrics.record_late_frame();
                warn!(
                    late_us = (now - deadline).as_micros() as u64,
                    frame_us = report.elapsed.as_micros() as u64,
                    "Render frame missed its deadline"
                );
                deadline = now + self.frame_period;
            } else {
                thread::sleep(deadline - now);
                deadline += self.frame_period;
            }
        }

        debug!("Render thread finished");
    }
}
