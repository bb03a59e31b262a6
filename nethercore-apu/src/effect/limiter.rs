//! Lookahead limiter
//!
//! Each channel runs a peak detector and a smoothed gain follower. The
//! signal itself goes through a short delay line so gain reduction lands
//! before the peak that caused it.

use super::{ExponentialMovingAverage, UsageState};
use crate::VOICE_CHANNEL_COUNT_MAX;

/// Limiter parameters, immutable for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterParameter {
    /// Input buffer per channel, relative to the effect's buffer offset
    pub input: [u8; VOICE_CHANNEL_COUNT_MAX],
    /// Output buffer per channel, relative to the effect's buffer offset
    pub output: [u8; VOICE_CHANNEL_COUNT_MAX],
    /// Channels the state was sized for
    pub channel_count_max: u16,
    /// Channels processed this frame (at most `channel_count_max`)
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Ring length per channel used for the delay
    pub delay_buffer_sample_count_min: u32,
    /// Ring allocation per channel
    pub delay_buffer_sample_count_max: u32,
    pub attack_coefficient: f32,
    pub release_coefficient: f32,
    /// Detector level above which gain is reduced (normalized)
    pub threshold: f32,
    pub input_gain: f32,
    pub output_gain: f32,
    pub status: UsageState,
    pub statistics_enabled: bool,
    pub statistics_reset_required: bool,
}

impl Default for LimiterParameter {
    fn default() -> Self {
        Self {
            input: [0; VOICE_CHANNEL_COUNT_MAX],
            output: [0; VOICE_CHANNEL_COUNT_MAX],
            channel_count_max: 0,
            channel_count: 0,
            sample_rate: 48000,
            delay_buffer_sample_count_min: 0,
            delay_buffer_sample_count_max: 0,
            attack_coefficient: 1.0,
            release_coefficient: 1.0,
            threshold: 1.0,
            input_gain: 1.0,
            output_gain: 1.0,
            status: UsageState::Invalid,
            statistics_enabled: false,
            statistics_reset_required: false,
        }
    }
}

impl LimiterParameter {
    /// Channels actually processed
    pub fn active_channel_count(&self) -> usize {
        (self.channel_count.min(self.channel_count_max) as usize).min(VOICE_CHANNEL_COUNT_MAX)
    }
}

/// Running per-channel statistics, visible to the guest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterStatistics {
    /// Largest normalized input magnitude seen
    pub input_max: [f32; VOICE_CHANNEL_COUNT_MAX],
    /// Smallest smoothed gain applied
    pub compression_gain_min: [f32; VOICE_CHANNEL_COUNT_MAX],
}

impl Default for LimiterStatistics {
    fn default() -> Self {
        Self {
            input_max: [0.0; VOICE_CHANNEL_COUNT_MAX],
            compression_gain_min: [1.0; VOICE_CHANNEL_COUNT_MAX],
        }
    }
}

impl LimiterStatistics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Envelope followers and delay lines of one limiter instance
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterState {
    pub detector_average: Vec<ExponentialMovingAverage>,
    pub compression_gain_average: Vec<ExponentialMovingAverage>,
    /// `channel_count_max` rings of `delay_buffer_sample_count_max` samples
    pub delayed_sample_buffer: Vec<f32>,
    /// Write position per channel, always `< delay_buffer_sample_count_min`
    pub delayed_sample_buffer_position: Vec<usize>,
    delay_stride: usize,
}

impl LimiterState {
    /// Fresh state sized for `parameter`: silent detectors, unity gain
    pub fn new(parameter: &LimiterParameter) -> Self {
        let channels = parameter.channel_count_max as usize;
        let stride = parameter.delay_buffer_sample_count_max as usize;
        Self {
            detector_average: vec![ExponentialMovingAverage::new(0.0); channels],
            compression_gain_average: vec![ExponentialMovingAverage::new(1.0); channels],
            delayed_sample_buffer: vec![0.0; channels * stride],
            delayed_sample_buffer_position: vec![0; channels],
            delay_stride: stride,
        }
    }

    /// Apply changed parameters without disturbing the running envelopes
    ///
    /// A change of channel count or delay allocation resizes the state:
    /// surviving channels keep their envelopes and the head of their delay
    /// line, new channels start silent at unity gain.
    pub fn update_parameter(&mut self, parameter: &LimiterParameter) {
        let channels = parameter.channel_count_max as usize;
        let stride = parameter.delay_buffer_sample_count_max as usize;

        if stride != self.delay_stride || channels != self.detector_average.len() {
            let mut delayed = vec![0.0; channels * stride];
            let kept = stride.min(self.delay_stride);
            for channel in 0..channels.min(self.detector_average.len()) {
                let from = channel * self.delay_stride;
                delayed[channel * stride..channel * stride + kept]
                    .copy_from_slice(&self.delayed_sample_buffer[from..from + kept]);
            }
            self.delayed_sample_buffer = delayed;
            self.delay_stride = stride;

            self.detector_average
                .resize(channels, ExponentialMovingAverage::new(0.0));
            self.compression_gain_average
                .resize(channels, ExponentialMovingAverage::new(1.0));
            self.delayed_sample_buffer_position.resize(channels, 0);
        }

        let delay_length = (parameter.delay_buffer_sample_count_min as usize).min(stride);
        for position in &mut self.delayed_sample_buffer_position {
            if *position >= delay_length {
                *position = 0;
            }
        }
    }

    /// Bring the state in line with the parameter's usage state
    pub fn prepare(&mut self, parameter: &LimiterParameter) {
        match parameter.status {
            UsageState::Invalid => *self = Self::new(parameter),
            UsageState::New => self.update_parameter(parameter),
            UsageState::Enabled | UsageState::Disabled => {}
        }
    }

    /// Run one 16-bit scale sample through `channel`
    ///
    /// Returns the delayed, gain-reduced sample in 16-bit scale. Channels
    /// outside the allocated state pass silence.
    #[inline]
    pub fn process_sample(
        &mut self,
        parameter: &LimiterParameter,
        channel: usize,
        sample: f32,
        statistics: Option<&mut LimiterStatistics>,
    ) -> f32 {
        let delay_length = (parameter.delay_buffer_sample_count_min as usize).min(self.delay_stride);
        if channel >= self.detector_average.len() || delay_length == 0 {
            return 0.0;
        }

        let input = sample / i16::MAX as f32 * parameter.input_gain;
        let magnitude = input.abs();

        let detector = &mut self.detector_average[channel];
        let coefficient = if magnitude > detector.read() {
            parameter.attack_coefficient
        } else {
            parameter.release_coefficient
        };
        let detector_value = detector.update(magnitude, coefficient);

        let attenuation = if detector_value > parameter.threshold {
            parameter.threshold / detector_value
        } else {
            1.0
        };

        let gain = &mut self.compression_gain_average[channel];
        let coefficient = if gain.read() > attenuation {
            parameter.attack_coefficient
        } else {
            parameter.release_coefficient
        };
        let compression_gain = gain.update(attenuation, coefficient);

        let position = &mut self.delayed_sample_buffer_position[channel];
        let delayed = &mut self.delayed_sample_buffer[channel * self.delay_stride + *position];
        let output = *delayed * compression_gain * parameter.output_gain * i16::MAX as f32;
        *delayed = input;
        *position = (*position + 1) % delay_length;

        if let Some(statistics) = statistics
            && channel < VOICE_CHANNEL_COUNT_MAX
        {
            statistics.input_max[channel] = statistics.input_max[channel].max(magnitude);
            statistics.compression_gain_min[channel] =
                statistics.compression_gain_min[channel].min(compression_gain);
        }

        output
    }
}
