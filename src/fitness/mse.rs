//! mean squared error over R,G,B of two equally sized pixel buffers.
//! alpha is ignored: rendered candidates are always opaque.
//!
//! all paths accumulate the integer square sum exactly in u64, so they agree
//! bit-for-bit before the final division by the pixel count.

use crate::dna::FITNESS_SENTINEL;
use crate::pixel::PixelFormat;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[inline(always)]
fn sq_err_argb(c: u32, r: u32) -> u32 {
    let dr = ((c >> 16) & 0xFF) as i32 - ((r >> 16) & 0xFF) as i32;
    let dg = ((c >> 8) & 0xFF) as i32 - ((r >> 8) & 0xFF) as i32;
    let db = (c & 0xFF) as i32 - (r & 0xFF) as i32;
    (dr * dr + dg * dg + db * db) as u32
}

#[inline]
fn to_mse(sum: u64, n: usize) -> f64 {
    sum as f64 / n as f64
}

#[inline]
fn valid_pair(candidate: &[u32], reference: &[u32]) -> bool {
    !candidate.is_empty() && candidate.len() == reference.len()
}

//─────────────────────────────────────────────────────────────────────────────
// square sums (building blocks, also used row-by-row for padded buffers)
//─────────────────────────────────────────────────────────────────────────────

/// Σ(dR²+dG²+dB²), any channel layout
pub fn sq_err_sum_with(candidate: &[u32], reference: &[u32], fmt: &PixelFormat) -> u64 {
    debug_assert_eq!(candidate.len(), reference.len());
    candidate
        .iter()
        .zip(reference)
        .map(|(&c, &r)| {
            let c = fmt.decompose(c);
            let r = fmt.decompose(r);
            let dr = c[0] as i32 - r[0] as i32;
            let dg = c[1] as i32 - r[1] as i32;
            let db = c[2] as i32 - r[2] as i32;
            (dr * dr + dg * dg + db * db) as u64
        })
        .sum()
}

/// ARGB8888 scalar reference loop
pub fn sq_err_sum_scalar(candidate: &[u32], reference: &[u32]) -> u64 {
    debug_assert_eq!(candidate.len(), reference.len());
    candidate
        .iter()
        .zip(reference)
        .map(|(&c, &r)| sq_err_argb(c, r) as u64)
        .sum()
}

/// portable 8-pixel blocks with a scalar tail. written so the optimiser can
/// keep each block in vector registers on any target.
pub fn sq_err_sum_lanes8(candidate: &[u32], reference: &[u32]) -> u64 {
    debug_assert_eq!(candidate.len(), reference.len());
    let mut c_blocks = candidate.chunks_exact(8);
    let mut r_blocks = reference.chunks_exact(8);
    let mut total = 0u64;

    for (c8, r8) in (&mut c_blocks).zip(&mut r_blocks) {
        let mut lane = [0u32; 8];
        for k in 0..8 {
            lane[k] = sq_err_argb(c8[k], r8[k]);
        }
        // max 8 * 195075 fits a u32
        total += lane.iter().sum::<u32>() as u64;
    }

    total + sq_err_sum_scalar(c_blocks.remainder(), r_blocks.remainder())
}

/// AVX2 kernel: 8 pixels per step, squares in 32-bit lanes, widened to
/// four u64 accumulators so large canvases cannot overflow.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sq_err_sum_avx2(candidate: &[u32], reference: &[u32]) -> u64 {
    debug_assert_eq!(candidate.len(), reference.len());
    let n = candidate.len();
    let blocks = n / 8;

    let mask_r = _mm256_set1_epi32(0x00FF_0000);
    let mask_g = _mm256_set1_epi32(0x0000_FF00);
    let mask_b = _mm256_set1_epi32(0x0000_00FF);
    let mut acc = _mm256_setzero_si256();

    for i in 0..blocks {
        let offset = i * 8;
        let c = _mm256_loadu_si256(candidate.as_ptr().add(offset) as *const __m256i);
        let r = _mm256_loadu_si256(reference.as_ptr().add(offset) as *const __m256i);

        let dr = _mm256_sub_epi32(
            _mm256_srli_epi32(_mm256_and_si256(c, mask_r), 16),
            _mm256_srli_epi32(_mm256_and_si256(r, mask_r), 16),
        );
        let dg = _mm256_sub_epi32(
            _mm256_srli_epi32(_mm256_and_si256(c, mask_g), 8),
            _mm256_srli_epi32(_mm256_and_si256(r, mask_g), 8),
        );
        let db = _mm256_sub_epi32(_mm256_and_si256(c, mask_b), _mm256_and_si256(r, mask_b));

        let sq = _mm256_add_epi32(
            _mm256_mullo_epi32(dr, dr),
            _mm256_add_epi32(_mm256_mullo_epi32(dg, dg), _mm256_mullo_epi32(db, db)),
        );

        // 8 x i32 -> 2 x (4 x i64); squares are non-negative so sign extension is harmless
        let lo = _mm256_cvtepi32_epi64(_mm256_castsi256_si128(sq));
        let hi = _mm256_cvtepi32_epi64(_mm256_extracti128_si256(sq, 1));
        acc = _mm256_add_epi64(acc, _mm256_add_epi64(lo, hi));
    }

    let mut lanes = [0u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc);
    let simd_sum: u64 = lanes.iter().sum();

    let tail = blocks * 8;
    simd_sum + sq_err_sum_scalar(&candidate[tail..], &reference[tail..])
}

/// fastest available ARGB8888 square sum on this CPU
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn sq_err_sum_simd(candidate: &[u32], reference: &[u32]) -> u64 {
    if is_x86_feature_detected!("avx2") {
        // safety: avx2 support checked at runtime just above
        unsafe { sq_err_sum_avx2(candidate, reference) }
    } else {
        sq_err_sum_lanes8(candidate, reference)
    }
}

/// fallback for non-x86_64 platforms
#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn sq_err_sum_simd(candidate: &[u32], reference: &[u32]) -> u64 {
    sq_err_sum_lanes8(candidate, reference)
}

//─────────────────────────────────────────────────────────────────────────────
// MSE entry points. empty or mismatched input gives FITNESS_SENTINEL.
//─────────────────────────────────────────────────────────────────────────────

pub fn mse_scalar(candidate: &[u32], reference: &[u32]) -> f64 {
    if !valid_pair(candidate, reference) {
        return FITNESS_SENTINEL;
    }
    to_mse(sq_err_sum_scalar(candidate, reference), candidate.len())
}

pub fn mse_with_format(candidate: &[u32], reference: &[u32], fmt: &PixelFormat) -> f64 {
    if !valid_pair(candidate, reference) || !fmt.is_valid() {
        return FITNESS_SENTINEL;
    }
    to_mse(sq_err_sum_with(candidate, reference, fmt), candidate.len())
}

pub fn mse_lanes8(candidate: &[u32], reference: &[u32]) -> f64 {
    if !valid_pair(candidate, reference) {
        return FITNESS_SENTINEL;
    }
    to_mse(sq_err_sum_lanes8(candidate, reference), candidate.len())
}

#[cfg(target_arch = "x86_64")]
pub fn mse_avx2(candidate: &[u32], reference: &[u32]) -> Option<f64> {
    if !is_x86_feature_detected!("avx2") {
        return None;
    }
    if !valid_pair(candidate, reference) {
        return Some(FITNESS_SENTINEL);
    }
    // safety: avx2 support checked above
    let sum = unsafe { sq_err_sum_avx2(candidate, reference) };
    Some(to_mse(sum, candidate.len()))
}

/// dispatching MSE used by the engine
#[inline(always)]
pub fn mse(candidate: &[u32], reference: &[u32]) -> f64 {
    profiling::scope!("mse");
    if !valid_pair(candidate, reference) {
        return FITNESS_SENTINEL;
    }
    to_mse(sq_err_sum_simd(candidate, reference), candidate.len())
}
