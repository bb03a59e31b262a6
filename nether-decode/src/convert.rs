//! Intermediate sample block conversion
//!
//! One contract: convert an `i16` block to `f32`, value for value. The SIMD
//! path is selected once at runtime and must stay bit-exact with the scalar
//! reference.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConvertPath {
    Scalar,
    #[cfg(target_arch = "x86_64")]
    Sse41,
}

static CONVERT_PATH: OnceLock<ConvertPath> = OnceLock::new();

fn convert_path() -> ConvertPath {
    *CONVERT_PATH.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("sse4.1") {
                return ConvertPath::Sse41;
            }
        }
        ConvertPath::Scalar
    })
}

/// Widen `input` into `output` (`min(len)` samples)
pub fn convert_to_float(output: &mut [f32], input: &[i16]) {
    match convert_path() {
        ConvertPath::Scalar => convert_to_float_scalar(output, input),
        #[cfg(target_arch = "x86_64")]
        // SAFETY: the path is only selected when SSE4.1 was detected
        ConvertPath::Sse41 => unsafe { convert_to_float_sse41(output, input) },
    }
}

/// Scalar reference conversion
pub fn convert_to_float_scalar(output: &mut [f32], input: &[i16]) {
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = sample as f32;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn convert_to_float_sse41(output: &mut [f32], input: &[i16]) {
    use std::arch::x86_64::{
        __m128i, _mm_cvtepi16_epi32, _mm_cvtepi32_ps, _mm_loadl_epi64, _mm_storeu_ps,
    };

    let len = output.len().min(input.len());
    let blocks = len / 4;

    for block in 0..blocks {
        let at = block * 4;
        // SAFETY: `at + 4 <= len` for both slices; loads/stores are unaligned
        unsafe {
            let packed = _mm_loadl_epi64(input.as_ptr().add(at) as *const __m128i);
            let widened = _mm_cvtepi16_epi32(packed);
            _mm_storeu_ps(output.as_mut_ptr().add(at), _mm_cvtepi32_ps(widened));
        }
    }

    convert_to_float_scalar(&mut output[blocks * 4..len], &input[blocks * 4..len]);
}
