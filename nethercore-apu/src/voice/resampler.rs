//! Fixed-point sample rate converter
//!
//! Positions advance in Q15 steps: output sample `j` reads the input around
//! `(fraction + j * ratio) >> 15` and interpolates with the low 15 bits as
//! phase. The input slice starts with the quality tier's history samples,
//! followed by freshly decoded data.

use std::sync::OnceLock;

use super::SrcQuality;

/// Fractional bits of a resampler position
pub const FRACTION_BITS: u32 = 15;

/// 1.0 in Q15
pub const FRACTION_ONE: u32 = 1 << FRACTION_BITS;

/// Mask of the phase bits
pub const FRACTION_MASK: u32 = FRACTION_ONE - 1;

const SINC_TAPS: usize = 8;
const SINC_PHASE_BITS: u32 = 7;
const SINC_PHASES: usize = 1 << SINC_PHASE_BITS;
const LANCZOS_A: f64 = 4.0;

/// Convert a playback ratio to Q15, or `None` if it cannot be represented
pub fn ratio_to_fixed(ratio: f32) -> Option<u32> {
    if !ratio.is_finite() || ratio < 0.0 {
        return None;
    }
    let fixed = (ratio as f64 * FRACTION_ONE as f64).floor();
    if fixed > u32::MAX as f64 {
        return None;
    }
    Some(fixed as u32)
}

/// Resample `input` into every sample of `output`
///
/// `input` holds `quality.pitch_lookahead_length()` history samples followed
/// by decoded samples, and must cover the last tap read:
/// `((fraction + (output.len() - 1) * ratio) >> 15) + history <= input.len()`.
///
/// Returns the Q15 position one step past the last output sample.
pub fn resample(
    output: &mut [f32],
    input: &[i16],
    ratio: u32,
    fraction: u32,
    quality: SrcQuality,
) -> u64 {
    let history = quality.pitch_lookahead_length();

    // Unity ratio on a sample boundary lands every output on a tap
    if ratio == FRACTION_ONE && fraction == 0 {
        let center = history / 2 - 1;
        for (out, &sample) in output.iter_mut().zip(&input[center..]) {
            *out = sample as f32;
        }
        return (output.len() as u64) << FRACTION_BITS;
    }

    let mut position = fraction as u64;
    for out in output.iter_mut() {
        let index = (position >> FRACTION_BITS) as usize;
        let phase = (position & FRACTION_MASK as u64) as u32;
        *out = interpolate(&input[index..index + history], phase, quality);
        position += ratio as u64;
    }
    position
}

/// Interpolate between the two centre taps of `taps`
#[inline]
pub(crate) fn interpolate(taps: &[i16], phase: u32, quality: SrcQuality) -> f32 {
    match quality {
        SrcQuality::Low => linear(taps, phase),
        SrcQuality::Default => cubic(taps, phase),
        SrcQuality::High => windowed_sinc(taps, phase),
    }
}

#[inline]
fn linear(taps: &[i16], phase: u32) -> f32 {
    let a = taps[1] as f32;
    let b = taps[2] as f32;
    let t = phase as f32 / FRACTION_ONE as f32;
    a + (b - a) * t
}

/// Catmull-Rom spline through four taps
#[inline]
fn cubic(taps: &[i16], phase: u32) -> f32 {
    let p0 = taps[0] as f32;
    let p1 = taps[1] as f32;
    let p2 = taps[2] as f32;
    let p3 = taps[3] as f32;
    let t = phase as f32 / FRACTION_ONE as f32;

    p1 + 0.5
        * t
        * (p2 - p0 + t * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + t * (3.0 * (p1 - p2) + p3 - p0)))
}

#[inline]
fn windowed_sinc(taps: &[i16], phase: u32) -> f32 {
    let row = &sinc_table()[(phase >> (FRACTION_BITS - SINC_PHASE_BITS)) as usize];
    taps.iter()
        .zip(row)
        .map(|(&tap, &coefficient)| tap as f32 * coefficient)
        .sum()
}

/// Lanczos (a = 4) coefficients, one normalized row per phase
fn sinc_table() -> &'static [[f32; SINC_TAPS]; SINC_PHASES] {
    static TABLE: OnceLock<[[f32; SINC_TAPS]; SINC_PHASES]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0f32; SINC_TAPS]; SINC_PHASES];

        // Phase 0 sits exactly on tap 3
        table[0][SINC_TAPS / 2 - 1] = 1.0;

        for (phase, row) in table.iter_mut().enumerate().skip(1) {
            let offset = phase as f64 / SINC_PHASES as f64;
            let mut weights = [0.0f64; SINC_TAPS];
            for (tap, weight) in weights.iter_mut().enumerate() {
                let x = tap as f64 - (SINC_TAPS / 2 - 1) as f64 - offset;
                *weight = sinc(x) * sinc(x / LANCZOS_A);
            }
            let sum: f64 = weights.iter().sum();
            for (out, weight) in row.iter_mut().zip(weights) {
                *out = (weight / sum) as f32;
            }
        }
        table
    })
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}
