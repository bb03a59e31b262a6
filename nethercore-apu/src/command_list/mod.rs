//! Per-frame command executor
//!
//! A [`CommandList`] owns the frame's buffer pool and an ordered list of
//! commands. [`CommandList::process`] runs the enabled commands strictly in
//! order on the calling thread, times each against its estimate and returns
//! a [`FrameReport`]. An overrun is logged and execution continues.

use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::command::{Command, CommandType, NodeId};
use crate::config::ApuConfig;
use crate::memory::GuestMemory;
use crate::sink::OutputSink;

mod pool;


pub use pool::BufferPool;

/// What a command sees while it runs
pub struct FrameContext<'f> {
    /// Samples per channel this frame
    pub sample_count: usize,
    /// Output sample rate
    pub sample_rate: u32,
    pub buffers: &'f mut BufferPool,
    pub memory: &'f dyn GuestMemory,
    /// Sink bound for this `process` call
    pub sink: &'f mut dyn OutputSink,
}

/// Measured duration of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTiming {
    pub command_type: CommandType,
    pub node_id: NodeId,
    pub elapsed: Duration,
}

/// Outcome of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Wall-clock time for the whole list
    pub elapsed: Duration,
    /// Enabled commands executed
    pub commands_run: usize,
    /// Commands that exceeded a non-zero estimate
    pub overruns: usize,
    /// Per-command durations (empty when metering is off)
    pub timings: Vec<CommandTiming>,
}

/// One frame's commands and the buffer pool they run against
pub struct CommandList<'a> {
    sample_count: usize,
    sample_rate: u32,
    buffers: BufferPool,
    commands: Vec<Box<dyn Command + 'a>>,
    memory: &'a dyn GuestMemory,
    metering: bool,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl<'a> CommandList<'a> {
    /// Empty list with a fresh pool sized from `config`
    pub fn new(config: &ApuConfig, memory: &'a dyn GuestMemory) -> Self {
        let pool = BufferPool::new(
            config.buffer_count() as usize,
            config.renderer.sample_count as usize,
        );
        let mut list = Self::with_pool(pool, config.renderer.sample_rate, memory);
        list.metering = config.diagnostics.metering;
        list
    }

    /// Empty list reusing `buffers` from a previous frame
    ///
    /// The pool is not cleared; the list normally starts with a clear
    /// command.
    pub fn with_pool(buffers: BufferPool, sample_rate: u32, memory: &'a dyn GuestMemory) -> Self {
        Self {
            sample_count: buffers.sample_count(),
            sample_rate,
            buffers,
            commands: Vec::new(),
            memory,
            metering: true,
            start_time: None,
            end_time: None,
        }
    }

    /// Append a command
    pub fn push(&mut self, command: impl Command + 'a) {
        self.commands.push(Box::new(command));
    }

    /// Append an already boxed command
    pub fn push_boxed(&mut self, command: Box<dyn Command + 'a>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferPool {
        &mut self.buffers
    }

    /// Enable or disable per-command timing
    pub fn set_metering(&mut self, metering: bool) {
        self.metering = metering;
    }

    /// When the last `process` call started
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// When the last `process` call finished
    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    /// Give the pool back for the next frame
    pub fn into_buffer_pool(self) -> BufferPool {
        self.buffers
    }

    /// Run every enabled command in order
    pub fn process(&mut self, sink: &mut dyn OutputSink) -> FrameReport {
        let start = Instant::now();
        self.start_time = Some(start);

        let mut report = FrameReport::default();
        if self.metering {
            report.timings.reserve(self.commands.len());
        }

        let mut context = FrameContext {
            sample_count: self.sample_count,
            sample_rate: self.sample_rate,
            buffers: &mut self.buffers,
            memory: self.memory,
            sink,
        };

        for command in self.commands.iter_mut() {
            if !command.enabled() {
                trace!(
                    command_type = ?command.command_type(),
                    node_id = command.node_id(),
                    "Skipping disabled command"
                );
                continue;
            }

            let command_start = Instant::now();
            command.process(&mut context);
            report.commands_run += 1;

            if !self.metering {
                continue;
            }

            let elapsed = command_start.elapsed();
            let estimate = command.estimated_processing_time();
            if !estimate.is_zero() && elapsed > estimate {
                report.overruns += 1;
                warn!(
                    command_type = ?command.command_type(),
                    node_id = command.node_id(),
                    elapsed_us = elapsed.as_micros() as u64,
                    estimate_us = estimate.as_micros() as u64,
                    "Command exceeded its estimated processing time"
                );
            }

            report.timings.push(CommandTiming {
                command_type: command.command_type(),
                node_id: command.node_id(),
                elapsed,
            });
        }

        let end = Instant::now();
        self.end_time = Some(end);
        report.elapsed = end - start;
        report
    }
}
