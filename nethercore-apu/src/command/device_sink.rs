//! Final hand-off of mixed channels to the output sink

use smallvec::SmallVec;

use super::{Command, CommandHeader, CommandType};
use crate::VOICE_CHANNEL_COUNT_MAX;
use crate::command_list::FrameContext;

/// Send the listed pool buffers to the sink, one per output channel
#[derive(Debug, Clone)]
pub struct DeviceSinkCommand {
    header: CommandHeader,
    inputs: SmallVec<[usize; VOICE_CHANNEL_COUNT_MAX]>,
}

impl DeviceSinkCommand {
    pub fn new(header: CommandHeader, inputs: &[usize]) -> Self {
        Self {
            header,
            inputs: inputs.iter().copied().collect(),
        }
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }
}

impl Command for DeviceSinkCommand {
    fn header(&self) -> &CommandHeader {
        &self.header
    }

    fn command_type(&self) -> CommandType {
        CommandType::DeviceSink
    }

    fn process(&mut self, context: &mut FrameContext<'_>) {
        let buffers = &*context.buffers;
        let sample_count = context.sample_count;

        let channels: SmallVec<[&[f32]; VOICE_CHANNEL_COUNT_MAX]> = self
            .inputs
            .iter()
            .map(|&index| {
                let buffer = buffers.buffer(index);
                &buffer[..sample_count.min(buffer.len())]
            })
            .collect();

        context.sink.append_frame(&channels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_list::BufferPool;
    use crate::memory::GuestRam;
    use crate::sink::OutputSink;

    #[derive(Default)]
    struct CaptureSink {
        frames: Vec<Vec<Vec<f32>>>,
    }

    impl OutputSink for CaptureSink {
        fn channel_count(&self) -> usize {
            2
        }

        fn append_frame(&mut self, channels: &[&[f32]]) {
            self.frames.push(channels.iter().map(|c| c.to_vec()).collect());
        }
    }

    #[test]
    fn test_sink_receives_listed_buffers_in_order() {
        let mut pool = BufferPool::new(4, 3);
        pool.buffer_mut(1).copy_from_slice(&[1.0, 2.0, 3.0]);
        pool.buffer_mut(3).copy_from_slice(&[4.0, 5.0, 6.0]);

        let ram = GuestRam::new(0, 0);
        let mut sink = CaptureSink::default();
        let mut command = DeviceSinkCommand::new(CommandHeader::new(9), &[3, 1]);
        let mut context = FrameContext {
            sample_count: 3,
            sample_rate: 48000,
            buffers: &mut pool,
            memory: &ram,
            sink: &mut sink,
        };
        command.process(&mut context);

        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0], vec![vec![4.0, 5.0, 6.0], vec![1.0, 2.0, 3.0]]);
    }
}
