//! Wave buffer walker
//!
//! Decodes just enough samples from a voice's wave buffer queue to fill one
//! channel of one frame, resampling them to the output rate. Handles
//! looping, end-of-buffer advance and starvation, and persists the decode
//! cursor into the voice's [`VoiceUpdateState`].

use std::cell::RefCell;

use nether_decode::{
    ADPCM_COEFFICIENT_COUNT, AdpcmLoopContext, DecodeError, PcmSample, convert_to_float,
    decode_adpcm, decode_pcm_float, decode_pcm16, pcm_buffer_offset, pcm_buffer_size,
};
use tracing::{debug, error, trace};

use super::resampler::{FRACTION_BITS, ratio_to_fixed, resample};
use super::{
    SampleFormat, SrcQuality, VOICE_WAVE_BUFFER_COUNT, VoiceUpdateState, WaveBuffer,
    decoding_behaviour,
};
use crate::memory::GuestMemory;

/// Per-thread decode scratch size in samples
pub const SCRATCH_BUFFER_SIZE: usize = 0x3F00;

thread_local! {
    static DECODE_SCRATCH: RefCell<Box<[i16]>> =
        RefCell::new(vec![0; SCRATCH_BUFFER_SIZE].into_boxed_slice());
}

/// Everything the walker needs to know about the source stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveBufferInformation {
    pub source_sample_rate: u32,
    pub pitch: f32,
    pub sample_format: SampleFormat,
    /// See [`decoding_behaviour`]
    pub decoding_behaviour: u16,
    pub src_quality: SrcQuality,
    /// Channel of the interleaved source to extract
    pub channel_index: u32,
    pub channel_count: u32,
    /// ADPCM coefficient table address
    pub extra_parameter: u64,
    pub extra_parameter_size: u64,
}

/// Outcome of one [`process_wave_buffers`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceReport {
    /// Output samples written from the start of the output slice
    pub samples_written: usize,
    /// The queue ran dry before the frame was filled
    pub starved: bool,
}

/// Fill `output[..sample_count]` from the voice's wave buffers
///
/// Samples are written as floats in 16-bit scale. When the queue starves,
/// the unwritten tail of `output` is left untouched. A ratio that cannot be
/// represented, or a frame that would overflow the decode scratch, is
/// skipped without touching `output` or `state`.
pub fn process_wave_buffers(
    memory: &dyn GuestMemory,
    output: &mut [f32],
    info: &WaveBufferInformation,
    wave_buffers: &[WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
    state: &mut VoiceUpdateState,
    target_sample_rate: u32,
    sample_count: usize,
) -> SourceReport {
    DECODE_SCRATCH.with(|scratch| {
        let mut scratch = scratch.borrow_mut();
        walk_wave_buffers(
            memory,
            &mut scratch,
            output,
            info,
            wave_buffers,
            state,
            target_sample_rate,
            sample_count,
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn walk_wave_buffers(
    memory: &dyn GuestMemory,
    scratch: &mut [i16],
    output: &mut [f32],
    info: &WaveBufferInformation,
    wave_buffers: &[WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
    state: &mut VoiceUpdateState,
    target_sample_rate: u32,
    sample_count: usize,
) -> SourceReport {
    let sample_count = sample_count.min(output.len());
    let skip_src =
        info.decoding_behaviour & decoding_behaviour::SKIP_PITCH_AND_SAMPLE_RATE_CONVERSION != 0;
    let quality = info.src_quality;
    let history = quality.pitch_lookahead_length();

    let ratio_f = info.source_sample_rate as f32 / target_sample_rate as f32 * info.pitch;
    let Some(ratio) = ratio_to_fixed(ratio_f) else {
        debug!(ratio = ratio_f, "Unrepresentable playback ratio, voice skipped");
        return SourceReport::default();
    };

    let mut fraction = state.fraction;
    let total_needed = (fraction as u64 + ratio as u64 * sample_count as u64) >> FRACTION_BITS;
    if total_needed + history as u64 > scratch.len() as u64 {
        debug!(
            total_needed,
            scratch = scratch.len(),
            "Frame needs more source samples than the decode scratch holds, voice skipped"
        );
        return SourceReport::default();
    }

    let capacity = scratch.len() - history;
    let max_per_iteration = if skip_src || ratio == 0 {
        sample_count.min(capacity)
    } else {
        let fixed_capacity = ((capacity as u64) << FRACTION_BITS).saturating_sub(fraction as u64);
        ((fixed_capacity / ratio as u64) as usize).min(sample_count)
    };
    if max_per_iteration == 0 {
        return SourceReport::default();
    }

    let mut written = 0;
    let mut starved = false;

    while written < sample_count && !starved {
        let chunk = (sample_count - written).min(max_per_iteration);
        let out = &mut output[written..written + chunk];

        if skip_src {
            let decoded = decode_into(
                memory,
                &mut scratch[..chunk],
                info,
                wave_buffers,
                state,
                &mut starved,
            );
            convert_to_float(&mut out[..decoded], &scratch[..decoded]);
            written += decoded;
            continue;
        }

        scratch[..history].copy_from_slice(&state.pitch_history[..history]);
        let decode_target =
            ((fraction as u64 + ratio as u64 * chunk as u64) >> FRACTION_BITS) as usize;
        let decoded = decode_into(
            memory,
            &mut scratch[history..history + decode_target],
            info,
            wave_buffers,
            state,
            &mut starved,
        );

        // Only outputs whose base tap was actually decoded are produced
        let produced = if starved {
            covered_outputs(fraction, ratio, decoded, chunk)
        } else {
            chunk
        };

        let input = &scratch[..history + decoded];
        let end = resample(&mut out[..produced], input, ratio, fraction, quality);
        fraction = end.saturating_sub((decoded as u64) << FRACTION_BITS) as u32;
        state.pitch_history[..history].copy_from_slice(&scratch[decoded..decoded + history]);
        written += produced;
    }

    state.fraction = fraction;

    if starved {
        trace!(written, sample_count, "Voice starved");
    }

    SourceReport {
        samples_written: written,
        starved,
    }
}

/// Outputs `j < chunk` whose position `fraction + j * ratio` stays below `decoded`
fn covered_outputs(fraction: u32, ratio: u32, decoded: usize, chunk: usize) -> usize {
    let limit = (decoded as u64) << FRACTION_BITS;
    let fraction = fraction as u64;
    if fraction >= limit {
        return 0;
    }
    if ratio == 0 {
        return chunk;
    }
    let ratio = ratio as u64;
    let covered = (limit - fraction).div_ceil(ratio);
    (covered.min(chunk as u64)) as usize
}

/// Decode into all of `out`, walking the wave buffer queue
///
/// Returns the samples decoded; sets `starved` if the queue ran dry first.
fn decode_into(
    memory: &dyn GuestMemory,
    out: &mut [i16],
    info: &WaveBufferInformation,
    wave_buffers: &[WaveBuffer; VOICE_WAVE_BUFFER_COUNT],
    state: &mut VoiceUpdateState,
    starved: &mut bool,
) -> usize {
    let target = out.len();
    let mut decoded = 0;

    while decoded < target {
        let index = state.wave_buffer_index as usize % VOICE_WAVE_BUFFER_COUNT;
        if !state.is_wave_buffer_valid[index] {
            *starved = true;
            break;
        }
        let wave_buffer = &wave_buffers[index];

        if state.offset == 0 && info.sample_format == SampleFormat::Adpcm && wave_buffer.context != 0
        {
            state.loop_context = memory.read::<AdpcmLoopContext>(wave_buffer.context);
        }

        let (start, end) = wave_buffer.sample_range(state.loop_count);
        let range_len = end.saturating_sub(start);
        let request = target - decoded;

        let count = match decode_wave_buffer(
            memory,
            &mut out[decoded..],
            info,
            wave_buffer,
            start,
            end,
            state.offset as usize,
            request,
            &mut state.loop_context,
        ) {
            Ok(count) => count.min(request),
            Err(err) => {
                error!(%err, slot = index, "Decoding failed, skipping wave buffer");
                state.offset = 0;
                state.mark_end_of_buffer(wave_buffer);
                continue;
            }
        };

        decoded += count;
        state.offset += count as u32;
        state.played_sample_count += count as u64;

        if state.offset as usize >= range_len || count == 0 {
            state.offset = 0;

            if wave_buffer.looping {
                state.loop_count += 1;

                if wave_buffer.loop_count >= 0
                    && (count == 0 || state.loop_count > wave_buffer.loop_count)
                {
                    state.mark_end_of_buffer(wave_buffer);
                }

                if count == 0 {
                    *starved = true;
                    break;
                }

                if info.decoding_behaviour
                    & decoding_behaviour::PLAYED_SAMPLE_COUNT_RESET_WHEN_LOOPING
                    != 0
                {
                    state.played_sample_count = 0;
                }
            } else {
                state.mark_end_of_buffer(wave_buffer);
            }
        }
    }

    decoded
}

#[allow(clippy::too_many_arguments)]
fn decode_wave_buffer(
    memory: &dyn GuestMemory,
    out: &mut [i16],
    info: &WaveBufferInformation,
    wave_buffer: &WaveBuffer,
    start: usize,
    end: usize,
    offset: usize,
    count: usize,
    context: &mut AdpcmLoopContext,
) -> Result<usize, DecodeError> {
    let channel_index = info.channel_index as usize;
    let channel_count = info.channel_count as usize;

    match info.sample_format {
        SampleFormat::Adpcm => {
            let input = if wave_buffer.buffer != 0 && wave_buffer.buffer_size != 0 {
                memory.get_bytes(wave_buffer.buffer, wave_buffer.buffer_size as usize)
            } else {
                &[]
            };
            let (coefficients, available) = read_coefficients(memory, info);
            decode_adpcm(
                out,
                input,
                start,
                end,
                offset,
                count,
                &coefficients[..available],
                context,
            )
        }
        SampleFormat::PcmInt16 => {
            let input =
                pcm_source::<i16>(memory, wave_buffer, start, end, offset, count, channel_count);
            decode_pcm16(&mut out[..count], input, start, end, channel_index, channel_count)
        }
        SampleFormat::PcmFloat => {
            let input =
                pcm_source::<f32>(memory, wave_buffer, start, end, offset, count, channel_count);
            decode_pcm_float(&mut out[..count], input, start, end, channel_index, channel_count)
        }
        format => {
            error!(?format, "Unsupported sample format");
            Ok(0)
        }
    }
}

/// Bytes of the interleaved frames still to decode, clipped to the buffer
fn pcm_source<'m, T: PcmSample>(
    memory: &'m dyn GuestMemory,
    wave_buffer: &WaveBuffer,
    start: usize,
    end: usize,
    offset: usize,
    count: usize,
    channel_count: usize,
) -> &'m [u8] {
    if wave_buffer.buffer == 0 || wave_buffer.buffer_size == 0 {
        return &[];
    }

    let byte_offset = pcm_buffer_offset::<T>(start, offset, channel_count) as u64;
    if byte_offset >= wave_buffer.buffer_size {
        return &[];
    }

    let size = pcm_buffer_size::<T>(start, end, offset, count) * channel_count;
    let size = size.min((wave_buffer.buffer_size - byte_offset) as usize);
    memory.get_bytes(wave_buffer.buffer + byte_offset, size)
}

/// ADPCM coefficient table and the number of entries actually present
fn read_coefficients(
    memory: &dyn GuestMemory,
    info: &WaveBufferInformation,
) -> ([i16; ADPCM_COEFFICIENT_COUNT], usize) {
    let mut coefficients = [0i16; ADPCM_COEFFICIENT_COUNT];
    if info.extra_parameter == 0 {
        return (coefficients, 0);
    }

    let size = (info.extra_parameter_size as usize).min(ADPCM_COEFFICIENT_COUNT * 2);
    let bytes = memory.get_bytes(info.extra_parameter, size);
    let mut available = 0;
    for (coefficient, pair) in coefficients.iter_mut().zip(bytes.chunks_exact(2)) {
        *coefficient = i16::from_le_bytes([pair[0], pair[1]]);
        available += 1;
    }
    (coefficients, available)
}
