//! DSP-ADPCM decoder
//!
//! Each 8-byte frame carries a predictor/scale header followed by 14 signed
//! 4-bit residuals. Prediction uses two history samples weighted by one of
//! eight Q11 coefficient pairs selected by the header.

use bytemuck::{Pod, Zeroable};

use crate::{
    ADPCM_NIBBLES_PER_FRAME, ADPCM_SAMPLES_PER_FRAME, DecodeError, saturate_i16,
};

/// Predictor state carried between decode calls (6 bytes, POD)
///
/// Captured from the wave buffer's context address at the start of every
/// wave buffer (and at every loop restart), then threaded sample-by-sample.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct AdpcmLoopContext {
    /// Last frame header (coefficient index in bits 4-7, scale in bits 0-3)
    pub pred_scale: u16,
    /// Most recent decoded sample
    pub history0: i16,
    /// Sample before `history0`
    pub history1: i16,
}

/// Number of nibbles occupied by the first `sample_count` samples of a stream
///
/// Every started frame contributes its two header nibbles.
#[inline]
pub fn nibbles_from_sample_count(sample_count: usize) -> usize {
    let frames = sample_count / ADPCM_SAMPLES_PER_FRAME;
    let extra = sample_count % ADPCM_SAMPLES_PER_FRAME;

    let mut nibbles = frames * ADPCM_NIBBLES_PER_FRAME;
    if extra != 0 {
        nibbles += extra + 2;
    }
    nibbles
}

#[inline]
fn coefficient_pair(coefficients: &[i16], index: usize) -> Result<(i64, i64), DecodeError> {
    match (coefficients.get(index * 2), coefficients.get(index * 2 + 1)) {
        (Some(&c0), Some(&c1)) => Ok((c0 as i64, c1 as i64)),
        _ => Err(DecodeError::InvalidCoefficientIndex(index)),
    }
}

/// Decode up to `count` ADPCM samples starting `offset` samples into the range
///
/// # Arguments
/// * `output` - Destination for decoded samples
/// * `input` - The whole wave buffer (frame 0 at byte 0)
/// * `start_sample_offset` / `end_sample_offset` - Playable range in samples
/// * `offset` - Samples of the range already consumed
/// * `count` - Samples requested
/// * `coefficients` - 16 entries (8 Q11 predictor pairs)
/// * `context` - Predictor history, updated in place
///
/// # Returns
/// Number of samples written: `min(count, remaining range, output.len())`
///
/// # Errors
/// `TruncatedData` if `input` ends inside the range, `InvalidCoefficientIndex`
/// if a header selects a pair outside `coefficients`.
pub fn decode_adpcm(
    output: &mut [i16],
    input: &[u8],
    start_sample_offset: usize,
    end_sample_offset: usize,
    offset: usize,
    count: usize,
    coefficients: &[i16],
    context: &mut AdpcmLoopContext,
) -> Result<usize, DecodeError> {
    if input.is_empty() || end_sample_offset < start_sample_offset {
        return Ok(0);
    }

    let remaining = (end_sample_offset - start_sample_offset).saturating_sub(offset);
    let decoded = count.min(remaining).min(output.len());
    if decoded == 0 {
        return Ok(0);
    }

    let mut pred_scale = context.pred_scale as u8;
    let mut history0 = context.history0;
    let mut history1 = context.history1;

    let mut nibbles = nibbles_from_sample_count(start_sample_offset + offset);
    let mut byte_index = nibbles / 2;

    // Resuming mid-frame: the header was consumed by an earlier call
    let (mut coefficient0, mut coefficient1) = if nibbles % ADPCM_NIBBLES_PER_FRAME != 0 {
        coefficient_pair(coefficients, (pred_scale >> 4) as usize)?
    } else {
        (0, 0)
    };

    for sample_out in output.iter_mut().take(decoded) {
        if nibbles % ADPCM_NIBBLES_PER_FRAME == 0 {
            pred_scale = *input.get(byte_index).ok_or(DecodeError::TruncatedData)?;
            (coefficient0, coefficient1) =
                coefficient_pair(coefficients, (pred_scale >> 4) as usize)?;
            byte_index += 1;
            nibbles += 2;
        }

        let value = *input.get(byte_index).ok_or(DecodeError::TruncatedData)?;
        let residual = if nibbles & 1 == 0 {
            ((value as i8) >> 4) as i64
        } else {
            byte_index += 1;
            (((value << 4) as i8) >> 4) as i64
        };
        nibbles += 1;

        let scale = (pred_scale & 0xF) as u32;
        let scaled = residual * ((1i64 << scale) << 11);
        let prediction = coefficient0 * history0 as i64 + coefficient1 * history1 as i64;
        let sample = saturate_i16(((scaled + prediction + 0x400) >> 11) as i32);

        history1 = history0;
        history0 = sample;
        *sample_out = sample;
    }

    context.pred_scale = pred_scale as u16;
    context.history0 = history0;
    context.history1 = history1;

    Ok(decoded)
}
