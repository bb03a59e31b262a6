//! Render thread health monitoring

use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tracing::debug;

use crate::command::CommandType;
use crate::command_list::FrameReport;

/// Frame timing statistics, logged once per interval
#[derive(Debug, Clone)]
pub struct RenderMetrics {
    /// Frames rendered this interval
    pub frames_rendered: u64,
    /// Updates applied this interval
    pub updates_applied: u64,
    /// Frames that finished after their deadline this interval
    pub late_frames: u64,
    /// Commands over their estimate this interval
    pub command_overruns: u64,
    /// Smoothed frame processing time (microseconds)
    pub avg_frame_time_us: f64,
    /// Longest frame this interval
    pub max_frame_time: Duration,
    /// Longest run of each command kind this interval
    pub worst_by_type: HashMap<CommandType, Duration>,
    log_interval: Duration,
    last_log_time: Instant,
}

impl RenderMetrics {
    pub fn new(log_interval: Duration) -> Self {
        Self {
            frames_rendered: 0,
            updates_applied: 0,
            late_frames: 0,
            command_overruns: 0,
            avg_frame_time_us: 0.0,
            max_frame_time: Duration::ZERO,
            worst_by_type: HashMap::new(),
            log_interval,
            last_log_time: Instant::now(),
        }
    }

    /// Fold one frame's report into the interval
    pub fn record_frame(&mut self, report: &FrameReport) {
        self.frames_rendered += 1;
        self.command_overruns += report.overruns as u64;
        self.max_frame_time = self.max_frame_time.max(report.elapsed);

        let elapsed_us = report.elapsed.as_secs_f64() * 1_000_000.0;
        self.avg_frame_time_us = 0.1 * elapsed_us + 0.9 * self.avg_frame_time_us;

        for timing in &report.timings {
            let worst = self
                .worst_by_type
                .entry(timing.command_type)
                .or_insert(Duration::ZERO);
            *worst = (*worst).max(timing.elapsed);
        }
    }

    pub fn record_update(&mut self) {
        self.updates_applied += 1;
    }

    pub fn record_late_frame(&mut self) {
        self.late_frames += 1;
    }

    /// Worst duration seen for `command_type` this interval
    pub fn worst_duration(&self, command_type: CommandType) -> Option<Duration> {
        self.worst_by_type.get(&command_type).copied()
    }

    /// Log and reset if the interval has elapsed; returns whether it logged
    pub fn maybe_log(&mut self) -> bool {
        if self.last_log_time.elapsed() < self.log_interval {
            return false;
        }

        let slowest = self
            .worst_by_type
            .iter()
            .max_by_key(|(_, duration)| **duration)
            .map(|(command_type, duration)| (*command_type, *duration));

        debug!(
            "APU METRICS [tid={:?}]: frames={}, updates={}, late={}, overruns={}, \
             avg_frame={:.2}μs, max_frame={}μs, slowest={:?}",
            std::thread::current().id(),
            self.frames_rendered,
            self.updates_applied,
            self.late_frames,
            self.command_overruns,
            self.avg_frame_time_us,
            self.max_frame_time.as_micros(),
            slowest
        );

        // Per-interval counters; the smoothed average carries over
        self.frames_rendered = 0;
        self.updates_applied = 0;
        self.late_frames = 0;
        self.command_overruns = 0;
        self.max_frame_time = Duration::ZERO;
        self.worst_by_type.clear();
        self.last_log_time = Instant::now();
        true
    }
}
