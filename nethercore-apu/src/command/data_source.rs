//! Voice data source commands (PCM16, PCM float and ADPCM, versions 1 and 2)

use tracing::debug;

use super::{Command, CommandHeader, CommandType};
use crate::command_list::FrameContext;
use crate::voice::{
    SampleFormat, SourceReport, SrcQuality, VOICE_WAVE_BUFFER_COUNT, VoiceParameters,
    VoiceUpdateState, WaveBuffer, WaveBufferInformation, process_wave_buffers,
};

/// Data source command revision
///
/// Version 1 always resamples at default quality; version 2 honours the
/// voice's quality setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceVersion {
    Version1,
    Version2,
}

/// Decode one channel of a voice into a pool buffer
pub struct DataSourceCommand<'a> {
    header: CommandHeader,
    version: DataSourceVersion,
    output_buffer_index: usize,
    info: WaveBufferInformation,
    wave_buffers: [WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
    state: &'a mut VoiceUpdateState,
    last_report: SourceReport,
}

impl<'a> DataSourceCommand<'a> {
    /// Build from the voice's current parameters
    ///
    /// `channel_index` selects the channel of an interleaved source;
    /// `output_buffer_index` is the pool buffer written.
    pub fn new(
        header: CommandHeader,
        version: DataSourceVersion,
        voice: &VoiceParameters,
        state: &'a mut VoiceUpdateState,
        output_buffer_index: usize,
        channel_index: u32,
    ) -> Self {
        let src_quality = match version {
            DataSourceVersion::Version1 => SrcQuality::Default,
            DataSourceVersion::Version2 => voice.src_quality,
        };

        Self {
            header,
            version,
            output_buffer_index,
            info: WaveBufferInformation {
                source_sample_rate: voice.sample_rate,
                pitch: voice.pitch,
                sample_format: voice.sample_format,
                decoding_behaviour: voice.decoding_behaviour,
                src_quality,
                channel_index,
                channel_count: voice.channel_count,
                extra_parameter: voice.extra_parameter,
                extra_parameter_size: voice.extra_parameter_size,
            },
            wave_buffers: voice.wave_buffers,
            state,
            last_report: SourceReport::default(),
        }
    }

    pub fn output_buffer_index(&self) -> usize {
        self.output_buffer_index
    }

    pub fn info(&self) -> &WaveBufferInformation {
        &self.info
    }

    /// Outcome of the most recent decode
    pub fn last_report(&self) -> SourceReport {
        self.last_report
    }
}

impl Command for DataSourceCommand<'_> {
    fn header(&self) -> &CommandHeader {
        &self.header
    }

    fn command_type(&self) -> CommandType {
        use DataSourceVersion::*;
        match (self.info.sample_format, self.version) {
            (SampleFormat::PcmInt16, Version1) => CommandType::PcmInt16DataSourceVersion1,
            (SampleFormat::PcmInt16, Version2) => CommandType::PcmInt16DataSourceVersion2,
            (SampleFormat::PcmFloat, Version1) => CommandType::PcmFloatDataSourceVersion1,
            (SampleFormat::PcmFloat, Version2) => CommandType::PcmFloatDataSourceVersion2,
            (SampleFormat::Adpcm, Version1) => CommandType::AdpcmDataSourceVersion1,
            (SampleFormat::Adpcm, Version2) => CommandType::AdpcmDataSourceVersion2,
            _ => CommandType::Invalid,
        }
    }

    fn process(&mut self, context: &mut FrameContext<'_>) {
        let output = context.buffers.buffer_mut(self.output_buffer_index);
        if output.is_empty() {
            return;
        }

        self.last_report = process_wave_buffers(
            context.memory,
            output,
            &self.info,
            &self.wave_buffers,
            self.state,
            context.sample_rate,
            context.sample_count,
        );
        if self.last_report.starved {
            debug!(
                node_id = self.header.node_id,
                written = self.last_report.samples_written,
                wanted = context.sample_count,
                "Voice starved"
            );
        }
    }
}
