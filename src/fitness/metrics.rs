//─────────────────────────────────────────────────────────────────────────────
// human-readable metrics (RMSE, PSNR) derived from the engine's MSE
//─────────────────────────────────────────────────────────────────────────────

use crate::dna::FITNESS_SENTINEL;

/// the engine's MSE sums squared error over 3 channels per pixel
pub const FITNESS_CHANNELS_F64: f64 = 3.0;

/// PSNR (peak signal-to-noise ratio) in decibels from a per-channel MSE.
/// - `peak`: 255.0 for 8-bit images
/// higher PSNR = better quality. typical ranges:
///   - 30 dB = acceptable
///   - 35 dB = good
///   - 40+ dB = very good
#[inline]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    let mse = mse.max(1e-12);
    10.0 * ((peak * peak) / mse).log10()
}

/// reporting view of one fitness value. only for logs and the host;
/// selection always works on the raw fitness.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// engine fitness: Σ(dR²+dG²+dB²) / N
    pub mse: f64,
    /// root of the per-channel MSE, in 0..255 units
    pub rmse: f64,
    pub psnr: f64,
}

impl MetricsSnapshot {
    /// `None` for the sentinel or a non-finite value (nothing scored yet)
    pub fn from_mse(mse: f64) -> Option<Self> {
        if !mse.is_finite() || mse >= FITNESS_SENTINEL {
            return None;
        }
        let per_channel = (mse / FITNESS_CHANNELS_F64).max(0.0);
        Some(Self {
            mse,
            rmse: per_channel.sqrt(),
            psnr: psnr_from_mse(per_channel, 255.0),
        })
    }
}
