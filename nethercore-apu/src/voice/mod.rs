//! Voice playback state
//!
//! A voice is one playback stream fed by a queue of up to four wave buffers.
//! The per-frame parameters ([`VoiceParameters`], [`WaveBuffer`]) are rebuilt
//! by the command list builder every frame; the decode cursor
//! ([`VoiceUpdateState`]) lives as long as the voice and is mutated in place
//! by the data source commands.

use nether_decode::AdpcmLoopContext;
use serde::{Deserialize, Serialize};
use tracing::trace;

mod data_source;
mod resampler;

#[cfg(test)]
mod tests;

pub use data_source::{
    SCRATCH_BUFFER_SIZE, SourceReport, WaveBufferInformation, process_wave_buffers,
};
pub use resampler::{FRACTION_BITS, FRACTION_MASK, FRACTION_ONE, ratio_to_fixed, resample};

/// Wave buffers queued per voice
pub const VOICE_WAVE_BUFFER_COUNT: usize = 4;

/// Longest resampler history (high quality)
pub const PITCH_MAX_LENGTH: usize = 8;

/// Decoding behaviour flags
pub mod decoding_behaviour {
    /// Reset the played sample count every time a wave buffer loops
    pub const PLAYED_SAMPLE_COUNT_RESET_WHEN_LOOPING: u16 = 1 << 0;
    /// Copy decoded samples through without pitch or rate conversion
    pub const SKIP_PITCH_AND_SAMPLE_RATE_CONVERSION: u16 = 1 << 1;
}

/// Resampler quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SrcQuality {
    /// 4-tap cubic interpolation
    #[default]
    Default,
    /// 8-tap windowed sinc
    High,
    /// Linear interpolation
    Low,
}

impl SrcQuality {
    /// History samples the resampler needs ahead of the decoded data
    pub fn pitch_lookahead_length(self) -> usize {
        match self {
            SrcQuality::High => 8,
            SrcQuality::Default | SrcQuality::Low => 4,
        }
    }
}

/// Source sample encoding
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Invalid = 0,
    PcmInt8 = 1,
    PcmInt16 = 2,
    PcmInt24 = 3,
    PcmInt32 = 4,
    PcmFloat = 5,
    Adpcm = 6,
}

/// One queued region of encoded source samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveBuffer {
    /// Guest address of the encoded samples
    pub buffer: u64,
    /// Size of the region in bytes
    pub buffer_size: u64,
    /// Guest address of the format side context (ADPCM loop context), 0 = none
    pub context: u64,
    /// Size of the side context in bytes
    pub context_size: u64,
    /// First playable sample
    pub start_sample_offset: u32,
    /// One past the last playable sample
    pub end_sample_offset: u32,
    /// Whether the buffer loops
    pub looping: bool,
    /// Playback ends after this buffer (resets the played sample count)
    pub is_end_of_stream: bool,
    /// First sample of the loop region (0 = loop the whole range)
    pub loop_start_sample_offset: u32,
    /// One past the last sample of the loop region
    pub loop_end_sample_offset: u32,
    /// Extra passes through the loop region (-1 = forever)
    pub loop_count: i32,
}

impl WaveBuffer {
    /// Sample range to decode given how many times the voice has looped
    ///
    /// The first pass plays `start..end`; later passes play the loop region
    /// when one is set.
    pub fn sample_range(&self, voice_loop_count: i32) -> (usize, usize) {
        let has_loop_region = self.loop_start_sample_offset != 0
            && self.loop_end_sample_offset != 0
            && self.loop_start_sample_offset <= self.loop_end_sample_offset;

        if voice_loop_count > 0 && has_loop_region {
            (
                self.loop_start_sample_offset as usize,
                self.loop_end_sample_offset as usize,
            )
        } else {
            (
                self.start_sample_offset as usize,
                self.end_sample_offset as usize,
            )
        }
    }
}

/// Per-frame voice snapshot consumed by data source commands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceParameters {
    /// Source sample rate
    pub sample_rate: u32,
    /// Pitch multiplier (1.0 = unchanged)
    pub pitch: f32,
    /// Source encoding
    pub sample_format: SampleFormat,
    /// Interleaved channels in the source
    pub channel_count: u32,
    /// See [`decoding_behaviour`]
    pub decoding_behaviour: u16,
    /// Resampler quality (version 2 data sources only)
    pub src_quality: SrcQuality,
    /// Format extra parameter (ADPCM coefficient table) address
    pub extra_parameter: u64,
    /// Format extra parameter size in bytes
    pub extra_parameter_size: u64,
    /// The voice's wave buffer queue
    pub wave_buffers: [WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
}

/// Persistent decode cursor of one voice
///
/// Owned by the voice context and borrowed exclusively by the rendering
/// thread for the duration of a data source command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceUpdateState {
    /// Resampler phase (Q15 fixed-point)
    pub fraction: u32,
    /// Active wave buffer slot (0-3)
    pub wave_buffer_index: u32,
    /// Samples consumed from the active wave buffer's current range
    pub offset: u32,
    /// Samples played since the stream (re)started
    pub played_sample_count: u64,
    /// Wave buffers completed since the voice started
    pub wave_buffer_consumed: u32,
    /// Loop passes completed on the active wave buffer
    pub loop_count: i32,
    /// ADPCM predictor state
    pub loop_context: AdpcmLoopContext,
    /// Resampler history carried across frames
    pub pitch_history: [i16; PITCH_MAX_LENGTH],
    /// Readiness of each wave buffer slot (set by the voice owner)
    pub is_wave_buffer_valid: [bool; VOICE_WAVE_BUFFER_COUNT],
}

impl VoiceUpdateState {
    /// Fresh cursor at the start of slot 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire the active wave buffer and move to the next slot
    ///
    /// Wrapping from the last slot back to slot 0, or finishing an
    /// end-of-stream buffer, resets the played sample count.
    pub fn mark_end_of_buffer(&mut self, wave_buffer: &WaveBuffer) {
        let index = self.wave_buffer_index as usize % VOICE_WAVE_BUFFER_COUNT;
        self.is_wave_buffer_valid[index] = false;
        self.loop_count = 0;
        self.wave_buffer_consumed = self.wave_buffer_consumed.wrapping_add(1);

        self.wave_buffer_index = index as u32 + 1;
        if self.wave_buffer_index as usize >= VOICE_WAVE_BUFFER_COUNT {
            self.wave_buffer_index = 0;
            self.played_sample_count = 0;
        }

        if wave_buffer.is_end_of_stream {
            self.played_sample_count = 0;
        }

        trace!(
            "Wave buffer {} consumed, next slot {}",
            index, self.wave_buffer_index
        );
    }
}
