//! Nether-Decode: sample decoders for the Nethercore audio processor
//!
//! This is a **pure codec** crate. It converts encoded wave-buffer bytes into
//! signed 16-bit intermediate samples for a requested sample range. Locating
//! the bytes in guest memory, looping and resampling are the caller's job
//! (`nethercore-apu`'s data source helper).
//!
//! # Formats
//!
//! | Format | Storage | State |
//! |--------|---------|-------|
//! | PCM16 | interleaved `i16` LE | none |
//! | PCM float | interleaved `f32` LE, scaled by 32767 | none |
//! | DSP-ADPCM | 8-byte frames, 14 samples each | [`AdpcmLoopContext`] |
//!
//! # ADPCM frame format
//!
//! ```text
//! Frame (8 bytes, repeats):
//!   0x00: predictor/scale (coefficient index in high nibble, scale in low nibble)
//!   0x01..0x08: 14 signed 4-bit residuals, high nibble first
//! ```
//!
//! Decoders return `Ok(decoded)` with the number of samples written, or a
//! [`DecodeError`] which callers treat the same as an exhausted buffer.
//!
//! # Usage
//!
//! ```
//! use nether_decode::decode_pcm16;
//!
//! let bytes: Vec<u8> = [1i16, -2, 3].iter().flat_map(|s| s.to_le_bytes()).collect();
//! let mut out = [0i16; 3];
//! let decoded = decode_pcm16(&mut out, &bytes, 0, 3, 0, 1).unwrap();
//! assert_eq!(decoded, 3);
//! assert_eq!(out, [1, -2, 3]);
//! ```

mod adpcm;
mod convert;
mod pcm;

pub use adpcm::{AdpcmLoopContext, decode_adpcm, nibbles_from_sample_count};
pub use convert::{convert_to_float, convert_to_float_scalar};
pub use pcm::{PcmSample, decode_pcm_float, decode_pcm16, pcm_buffer_offset, pcm_buffer_size};

// =============================================================================
// Constants
// =============================================================================

/// Samples per ADPCM frame
pub const ADPCM_SAMPLES_PER_FRAME: usize = 14;

/// Nibbles per ADPCM frame (header byte counts as two)
pub const ADPCM_NIBBLES_PER_FRAME: usize = ADPCM_SAMPLES_PER_FRAME + 2;

/// Bytes per ADPCM frame
pub const ADPCM_BYTES_PER_FRAME: usize = 8;

/// Coefficient table length (8 predictor pairs)
pub const ADPCM_COEFFICIENT_COUNT: usize = 16;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur while decoding a wave buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Channel index is outside the channel count
    #[error("channel {index} out of range for {count} channel(s)")]
    InvalidChannel { index: usize, count: usize },
    /// ADPCM header selected a coefficient pair outside the table
    #[error("ADPCM coefficient index {0} out of range")]
    InvalidCoefficientIndex(usize),
    /// Source ended before the requested range was decoded
    #[error("truncated wave buffer data")]
    TruncatedData,
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Saturate value to 16-bit signed range
#[inline]
pub(crate) fn saturate_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
