//! Limiter effect command (versions 1 and 2)

use super::{Command, CommandHeader, CommandType};
use crate::VOICE_CHANNEL_COUNT_MAX;
use crate::command_list::FrameContext;
use crate::effect::{LimiterParameter, LimiterState, LimiterStatistics};

/// Limiter command revision; version 2 maintains the statistics block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterVersion {
    Version1,
    Version2,
}

/// Run the lookahead limiter over each configured channel
pub struct LimiterCommand<'a> {
    header: CommandHeader,
    version: LimiterVersion,
    parameter: LimiterParameter,
    /// Whether the effect itself is on; off means passthrough
    effect_enabled: bool,
    input: [usize; VOICE_CHANNEL_COUNT_MAX],
    output: [usize; VOICE_CHANNEL_COUNT_MAX],
    state: &'a mut LimiterState,
    statistics: Option<&'a mut LimiterStatistics>,
}

impl<'a> LimiterCommand<'a> {
    /// Build from the effect's parameters
    ///
    /// Channel buffer indices are `buffer_offset + parameter.input[i]` (and
    /// likewise for outputs). `statistics` is ignored by version 1.
    pub fn new(
        header: CommandHeader,
        version: LimiterVersion,
        buffer_offset: usize,
        parameter: LimiterParameter,
        effect_enabled: bool,
        state: &'a mut LimiterState,
        statistics: Option<&'a mut LimiterStatistics>,
    ) -> Self {
        let input = parameter.input.map(|index| buffer_offset + index as usize);
        let output = parameter.output.map(|index| buffer_offset + index as usize);
        let statistics = match version {
            LimiterVersion::Version1 => None,
            LimiterVersion::Version2 => statistics,
        };

        Self {
            header,
            version,
            parameter,
            effect_enabled,
            input,
            output,
            state,
            statistics,
        }
    }

    fn limit(&mut self, context: &mut FrameContext<'_>) {
        self.state.prepare(&self.parameter);

        if self.parameter.statistics_reset_required
            && let Some(statistics) = self.statistics.as_deref_mut()
        {
            statistics.reset();
        }

        let statistics_enabled = self.parameter.statistics_enabled;
        let mut statistics = self
            .statistics
            .as_deref_mut()
            .filter(|_| statistics_enabled);

        let count = context.sample_count;
        for channel in 0..self.parameter.active_channel_count() {
            let input = context.buffers.channel_offset(self.input[channel]);
            let output = context.buffers.channel_offset(self.output[channel]);
            let arena = context.buffers.arena_mut();

            for i in 0..count {
                arena[output + i] = self.state.process_sample(
                    &self.parameter,
                    channel,
                    arena[input + i],
                    statistics.as_deref_mut(),
                );
            }
        }
    }

    fn passthrough(&self, context: &mut FrameContext<'_>) {
        for channel in 0..self.parameter.active_channel_count() {
            if self.input[channel] != self.output[channel] {
                context.buffers.copy(self.output[channel], self.input[channel]);
            }
        }
    }
}

impl Command for LimiterCommand<'_> {
    fn header(&self) -> &CommandHeader {
        &self.header
    }

    fn command_type(&self) -> CommandType {
        match self.version {
            LimiterVersion::Version1 => CommandType::LimiterVersion1,
            LimiterVersion::Version2 => CommandType::LimiterVersion2,
        }
    }

    fn process(&mut self, context: &mut FrameContext<'_>) {
        if self.effect_enabled {
            self.limit(context);
        } else {
            self.passthrough(context);
        }
    }
}
