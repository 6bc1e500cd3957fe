// Fitness module organization
// mse: the pixel error kernels, metrics: reporting conversions

pub mod metrics;
pub mod mse;

pub use metrics::MetricsSnapshot;
pub use mse::{mse, mse_lanes8, mse_scalar, mse_with_format};

use std::sync::Arc;

use crate::dna::{Canvas, Chromosome, FITNESS_SENTINEL};
use crate::pixel::PixelFormat;
use crate::render::CpuRenderer;

/// scores a chromosome, lower is better. called concurrently from every
/// evaluation worker, each with its own scratch buffer.
///
/// implementations must not keep references to the chromosome or the
/// scratch after returning. a score of [`FITNESS_SENTINEL`] marks a
/// chromosome that could not be evaluated.
pub trait FitnessFunc: Send + Sync {
    /// pixels of scratch each worker allocates once at start-up
    fn scratch_len(&self) -> usize {
        0
    }

    fn fitness(&self, chromosome: &Chromosome, scratch: &mut [u32]) -> f64;
}

// plain closures work as metrics that need no render target
impl<F> FitnessFunc for F
where
    F: Fn(&Chromosome) -> f64 + Send + Sync,
{
    fn fitness(&self, chromosome: &Chromosome, _scratch: &mut [u32]) -> f64 {
        self(chromosome)
    }
}

/// the default metric: render into the worker scratch, then MSE against a
/// fixed reference image with the same canvas, stride and pixel format.
pub struct ImageFitness {
    reference: Arc<[u32]>,
    format: PixelFormat,
    canvas: Canvas,
    stride_bytes: usize,
}

impl ImageFitness {
    /// tightly packed reference (stride = width * 4)
    pub fn new(reference: impl Into<Arc<[u32]>>, format: PixelFormat, canvas: Canvas) -> Self {
        Self::with_stride(reference, format, canvas, canvas.stride_bytes())
    }

    pub fn with_stride(
        reference: impl Into<Arc<[u32]>>,
        format: PixelFormat,
        canvas: Canvas,
        stride_bytes: usize,
    ) -> Self {
        Self { reference: reference.into(), format, canvas, stride_bytes }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    fn row_len(&self) -> usize {
        self.stride_bytes / 4
    }

    fn buffer_len(&self) -> usize {
        self.row_len().saturating_mul(self.canvas.height as usize)
    }

    fn is_usable(&self) -> bool {
        !self.canvas.is_empty()
            && self.format.is_valid()
            && self.row_len() >= self.canvas.width as usize
            && self.reference.len() >= self.buffer_len()
    }

    /// MSE of an already rendered buffer laid out like the reference
    pub fn compare(&self, rendered: &[u32]) -> f64 {
        profiling::scope!("ImageFitness::compare");
        let len = self.buffer_len();
        if !self.is_usable() || rendered.len() < len {
            return FITNESS_SENTINEL;
        }
        let width = self.canvas.width as usize;
        let row_len = self.row_len();

        // contiguous fast path, no padding between rows
        if row_len == width {
            let (c, r) = (&rendered[..len], &self.reference[..len]);
            return if self.format.is_argb8888() {
                mse(c, r)
            } else {
                mse_with_format(c, r, &self.format)
            };
        }

        let mut sum = 0u64;
        for (c_row, r_row) in rendered[..len].chunks_exact(row_len).zip(self.reference[..len].chunks_exact(row_len)) {
            let (c, r) = (&c_row[..width], &r_row[..width]);
            sum += if self.format.is_argb8888() {
                mse::sq_err_sum_simd(c, r)
            } else {
                mse::sq_err_sum_with(c, r, &self.format)
            };
        }
        sum as f64 / self.canvas.pixel_count() as f64
    }
}

impl FitnessFunc for ImageFitness {
    fn scratch_len(&self) -> usize {
        self.buffer_len()
    }

    fn fitness(&self, chromosome: &Chromosome, scratch: &mut [u32]) -> f64 {
        profiling::scope!("ImageFitness::fitness");
        if !self.is_usable() || scratch.len() < self.buffer_len() {
            return FITNESS_SENTINEL;
        }
        CpuRenderer::render(
            chromosome,
            scratch,
            self.stride_bytes,
            &self.format,
            self.canvas.width,
            self.canvas.height,
        );
        self.compare(scratch)
    }
}
