//! Mix bus commands: clear, copy, mix and volume (flat and ramped)
//!
//! The per-sample loops go through the raw arena accessor, so an input and
//! output naming the same buffer is fine (it becomes an in-place update).

use super::{Command, CommandHeader, CommandType};
use crate::command_list::FrameContext;

macro_rules! impl_command {
    ($ty:ty, $command_type:expr) => {
        impl Command for $ty {
            fn header(&self) -> &CommandHeader {
                &self.header
            }

            fn command_type(&self) -> CommandType {
                $command_type
            }

            fn process(&mut self, context: &mut FrameContext<'_>) {
                self.run(context)
            }
        }
    };
}

/// Zero every buffer in the pool
#[derive(Debug, Clone)]
pub struct ClearMixBufferCommand {
    pub header: CommandHeader,
}

impl ClearMixBufferCommand {
    pub fn new(header: CommandHeader) -> Self {
        Self { header }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        context.buffers.clear_all();
    }
}

impl_command!(ClearMixBufferCommand, CommandType::ClearMixBuffer);

/// Copy one buffer over another
#[derive(Debug, Clone)]
pub struct CopyMixBufferCommand {
    pub header: CommandHeader,
    pub input: usize,
    pub output: usize,
}

impl CopyMixBufferCommand {
    pub fn new(header: CommandHeader, input: usize, output: usize) -> Self {
        Self {
            header,
            input,
            output,
        }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        context.buffers.copy(self.output, self.input);
    }
}

impl_command!(CopyMixBufferCommand, CommandType::CopyMixBuffer);

/// `output += input * volume`
#[derive(Debug, Clone)]
pub struct MixCommand {
    pub header: CommandHeader,
    pub input: usize,
    pub output: usize,
    pub volume: f32,
}

impl MixCommand {
    pub fn new(header: CommandHeader, input: usize, output: usize, volume: f32) -> Self {
        Self {
            header,
            input,
            output,
            volume,
        }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        let count = context.sample_count;
        let input = context.buffers.channel_offset(self.input);
        let output = context.buffers.channel_offset(self.output);
        let arena = context.buffers.arena_mut();

        for i in 0..count {
            arena[output + i] += arena[input + i] * self.volume;
        }
    }
}

impl_command!(MixCommand, CommandType::Mix);

/// `output += input * volume`, volume ramping linearly across the frame
///
/// The last mixed sample is stored for the depop stage when a slot is given.
#[derive(Debug)]
pub struct MixRampCommand<'a> {
    pub header: CommandHeader,
    pub input: usize,
    pub output: usize,
    pub volume0: f32,
    pub volume1: f32,
    pub last_sample: Option<&'a mut f32>,
}

impl<'a> MixRampCommand<'a> {
    pub fn new(
        header: CommandHeader,
        input: usize,
        output: usize,
        volume0: f32,
        volume1: f32,
        last_sample: Option<&'a mut f32>,
    ) -> Self {
        Self {
            header,
            input,
            output,
            volume0,
            volume1,
            last_sample,
        }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        let count = context.sample_count;
        let input = context.buffers.channel_offset(self.input);
        let output = context.buffers.channel_offset(self.output);
        let arena = context.buffers.arena_mut();

        let ramp = ramp_step(self.volume0, self.volume1, count);
        let mut volume = self.volume0;
        let mut last = 0.0;
        for i in 0..count {
            last = arena[input + i] * volume;
            arena[output + i] += last;
            volume += ramp;
        }

        if let Some(slot) = self.last_sample.as_deref_mut() {
            *slot = last;
        }
    }
}

impl_command!(MixRampCommand<'_>, CommandType::MixRamp);

/// `output = input * volume`
#[derive(Debug, Clone)]
pub struct VolumeCommand {
    pub header: CommandHeader,
    pub input: usize,
    pub output: usize,
    pub volume: f32,
}

impl VolumeCommand {
    pub fn new(header: CommandHeader, input: usize, output: usize, volume: f32) -> Self {
        Self {
            header,
            input,
            output,
            volume,
        }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        let count = context.sample_count;
        let input = context.buffers.channel_offset(self.input);
        let output = context.buffers.channel_offset(self.output);
        let arena = context.buffers.arena_mut();

        for i in 0..count {
            arena[output + i] = arena[input + i] * self.volume;
        }
    }
}

impl_command!(VolumeCommand, CommandType::Volume);

/// `output = input * volume`, volume ramping linearly across the frame
#[derive(Debug, Clone)]
pub struct VolumeRampCommand {
    pub header: CommandHeader,
    pub input: usize,
    pub output: usize,
    pub volume0: f32,
    pub volume1: f32,
}

impl VolumeRampCommand {
    pub fn new(
        header: CommandHeader,
        input: usize,
        output: usize,
        volume0: f32,
        volume1: f32,
    ) -> Self {
        Self {
            header,
            input,
            output,
            volume0,
            volume1,
        }
    }

    fn run(&mut self, context: &mut FrameContext<'_>) {
        let count = context.sample_count;
        let input = context.buffers.channel_offset(self.input);
        let output = context.buffers.channel_offset(self.output);
        let arena = context.buffers.arena_mut();

        let ramp = ramp_step(self.volume0, self.volume1, count);
        let mut volume = self.volume0;
        for i in 0..count {
            arena[output + i] = arena[input + i] * volume;
            volume += ramp;
        }
    }
}

impl_command!(VolumeRampCommand, CommandType::VolumeRamp);

#[inline]
fn ramp_step(volume0: f32, volume1: f32, count: usize) -> f32 {
    if count == 0 {
        0.0
    } else {
        (volume1 - volume0) / count as f32
    }
}
