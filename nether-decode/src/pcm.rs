//! Interleaved PCM decoders
//!
//! PCM sources are stateless: decoding is channel de-interleaving plus a
//! conversion to the 16-bit intermediate format.

use crate::DecodeError;

/// A PCM storage type that can be widened or narrowed to an `i16` sample
pub trait PcmSample: Copy {
    /// Size of one stored sample in bytes
    const SIZE: usize;

    /// Read one little-endian sample from `bytes[..Self::SIZE]`
    fn read_i16(bytes: &[u8]) -> i16;
}

impl PcmSample for i16 {
    const SIZE: usize = 2;

    #[inline]
    fn read_i16(bytes: &[u8]) -> i16 {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl PcmSample for f32 {
    const SIZE: usize = 4;

    #[inline]
    fn read_i16(bytes: &[u8]) -> i16 {
        let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        (value * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

/// Byte offset of the first frame to decode, relative to the buffer start
#[inline]
pub fn pcm_buffer_offset<T: PcmSample>(
    start_sample_offset: usize,
    offset: usize,
    channel_count: usize,
) -> usize {
    (start_sample_offset + offset) * channel_count * T::SIZE
}

/// Bytes of one channel still needed to decode `count` samples
///
/// Multiply by the channel count to get the interleaved byte size.
#[inline]
pub fn pcm_buffer_size<T: PcmSample>(
    start_sample_offset: usize,
    end_sample_offset: usize,
    offset: usize,
    count: usize,
) -> usize {
    let remaining = end_sample_offset
        .saturating_sub(start_sample_offset)
        .saturating_sub(offset);
    remaining.min(count) * T::SIZE
}

/// Decode interleaved PCM16 frames into one channel of `output`
///
/// `input` must already be positioned at the first frame to decode (see
/// [`pcm_buffer_offset`]). Returns the number of samples written, which is
/// `0` for an empty input or an empty sample range.
pub fn decode_pcm16(
    output: &mut [i16],
    input: &[u8],
    start_sample_offset: usize,
    end_sample_offset: usize,
    channel_index: usize,
    channel_count: usize,
) -> Result<usize, DecodeError> {
    decode_interleaved::<i16>(
        output,
        input,
        start_sample_offset,
        end_sample_offset,
        channel_index,
        channel_count,
    )
}

/// Decode interleaved PCM float frames into one channel of `output`
///
/// Samples are scaled by 32767 and saturated to the 16-bit range.
pub fn decode_pcm_float(
    output: &mut [i16],
    input: &[u8],
    start_sample_offset: usize,
    end_sample_offset: usize,
    channel_index: usize,
    channel_count: usize,
) -> Result<usize, DecodeError> {
    decode_interleaved::<f32>(
        output,
        input,
        start_sample_offset,
        end_sample_offset,
        channel_index,
        channel_count,
    )
}

fn decode_interleaved<T: PcmSample>(
    output: &mut [i16],
    input: &[u8],
    start_sample_offset: usize,
    end_sample_offset: usize,
    channel_index: usize,
    channel_count: usize,
) -> Result<usize, DecodeError> {
    if channel_count == 0 || channel_index >= channel_count {
        return Err(DecodeError::InvalidChannel {
            index: channel_index,
            count: channel_count,
        });
    }

    if input.is_empty() || end_sample_offset <= start_sample_offset {
        return Ok(0);
    }

    let frame_size = channel_count * T::SIZE;
    let decoded = (input.len() / frame_size).min(output.len());

    for (i, sample) in output.iter_mut().take(decoded).enumerate() {
        let at = i * frame_size + channel_index * T::SIZE;
        *sample = T::read_i16(&input[at..at + T::SIZE]);
    }

    Ok(decoded)
}
