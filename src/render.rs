use crate::dna::{Canvas, Chromosome, Gene, Shape};
use crate::pixel::PixelFormat;

/// scanline rasteriser for circle/triangle chromosomes.
/// stateless: every call clears the target and repaints all genes in order.
pub struct CpuRenderer;

impl CpuRenderer {
    /// paint `chromosome` into `out`, a `height`-row buffer whose rows are
    /// `stride_bytes` apart. the buffer is cleared to all-zero words first,
    /// then each gene is alpha-blended over what is already there.
    ///
    /// does nothing if the buffer cannot hold `height` rows of `width` pixels
    /// at that stride.
    pub fn render(
        chromosome: &Chromosome,
        out: &mut [u32],
        stride_bytes: usize,
        fmt: &PixelFormat,
        width: u32,
        height: u32,
    ) {
        profiling::scope!("CpuRenderer::render");
        let row_len = stride_bytes / 4;
        let rows = height as usize;
        if width == 0 || rows == 0 || row_len < width as usize {
            return;
        }
        let Some(needed) = row_len.checked_mul(rows) else {
            return;
        };
        if out.len() < needed {
            return;
        }

        let mut target = Target { px: &mut out[..needed], row_len, width: width as i32, height: height as i32, fmt };
        target.px.fill(0);

        for gene in &chromosome.shapes {
            target.draw(gene);
        }
    }

    /// tightly packed render into a fresh buffer (host output, tests)
    pub fn render_to_vec(chromosome: &Chromosome, canvas: Canvas, fmt: &PixelFormat) -> Vec<u32> {
        let mut out = vec![0u32; canvas.pixel_count()];
        Self::render(chromosome, &mut out, canvas.stride_bytes(), fmt, canvas.width, canvas.height);
        out
    }
}

struct Target<'a> {
    px: &'a mut [u32],
    row_len: usize,
    width: i32,
    height: i32,
    fmt: &'a PixelFormat,
}

impl Target<'_> {
    fn draw(&mut self, gene: &Gene) {
        match gene.shape {
            Shape::Circle { cx, cy, radius } => self.circle(cx, cy, radius, gene.rgba),
            Shape::Triangle { x1, y1, x2, y2, x3, y3 } => {
                self.triangle((x1, y1), (x2, y2), (x3, y3), gene.rgba)
            }
        }
    }

    // one row span, x range already inside the canvas
    #[inline]
    fn span(&mut self, y: i32, x_from: i32, x_to: i32, rgba: [u8; 4]) {
        if x_from > x_to {
            return;
        }
        let row = y as usize * self.row_len;
        let fmt = *self.fmt;
        for px in &mut self.px[row + x_from as usize..=row + x_to as usize] {
            *px = blend(*px, rgba, &fmt);
        }
    }

    fn circle(&mut self, cx: i32, cy: i32, r: i32, rgba: [u8; 4]) {
        profiling::scope!("draw_circle");
        if r <= 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, r as i64);
        let r2 = r * r;
        let y_lo = (cy - r).max(0);
        let y_hi = (cy + r).min(self.height as i64 - 1);

        for y in y_lo..=y_hi {
            let dy = y - cy;
            let dx_max = ((r2 - dy * dy) as f64).sqrt() as i64;
            let x_from = (cx - dx_max).max(0);
            let x_to = (cx + dx_max).min(self.width as i64 - 1);
            if x_from <= x_to {
                self.span(y as i32, x_from as i32, x_to as i32, rgba);
            }
        }
    }

    fn triangle(&mut self, a: (i32, i32), b: (i32, i32), c: (i32, i32), rgba: [u8; 4]) {
        profiling::scope!("draw_triangle");
        let mut v = [a, b, c];
        // stable on equal y, so ties keep gene order
        v.sort_by_key(|p| p.1);
        let [(x1, y1), (x2, y2), (x3, y3)] = v;

        let y_lo = y1.max(0);
        let y_hi = y3.min(self.height - 1);
        for y in y_lo..=y_hi {
            let (mut xa, mut xb) = if y < y2 {
                (edge_x(y, x1, y1, x2, y2), edge_x(y, x1, y1, x3, y3))
            } else {
                (edge_x(y, x2, y2, x3, y3), edge_x(y, x1, y1, x3, y3))
            };
            if xa > xb {
                std::mem::swap(&mut xa, &mut xb);
            }
            let x_from = (xa as i32).clamp(0, self.width - 1);
            let x_to = (xb as i32).clamp(0, self.width - 1);
            self.span(y, x_from, x_to, rgba);
        }
    }
}

/// x where edge (xa,ya)->(xb,yb) crosses row y. a horizontal edge yields xa.
#[inline]
fn edge_x(y: i32, xa: i32, ya: i32, xb: i32, yb: i32) -> f32 {
    if ya == yb {
        return xa as f32;
    }
    xa as f32 + (xb - xa) as f32 * ((y - ya) as f32 / (yb - ya) as f32)
}

/// straight-alpha "over", result forced opaque
#[inline(always)]
pub fn blend(dst: u32, src: [u8; 4], fmt: &PixelFormat) -> u32 {
    let d = fmt.decompose(dst);
    let a = src[3] as f32 / 255.0;
    let mix = |s: u8, d: u8| (s as f32 * a + d as f32 * (1.0 - a)).round() as u8;
    fmt.compose([mix(src[0], d[0]), mix(src[1], d[1]), mix(src[2], d[2]), 255])
}
