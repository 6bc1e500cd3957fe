use serde::{Deserialize, Serialize};

/// fitness of a chromosome that has not been evaluated yet, and the value
/// reported for anything that could not be evaluated. lower is better, so
/// this always loses against a real score.
pub const FITNESS_SENTINEL: f64 = 1.0e30;

/// drawing canvas in pixels. both sides must be non-zero for the engine to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// bytes per row of a tightly packed 32-bit buffer
    #[inline]
    pub fn stride_bytes(&self) -> usize {
        self.width as usize * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// geometry of one gene. coordinates are integer canvas pixels and are
/// allowed to leave the canvas (the rasteriser clips).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Circle {
        cx: i32,
        cy: i32,
        radius: i32,
    },
    Triangle {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        x3: i32,
        y3: i32,
    },
}

impl Shape {
    pub fn is_circle(&self) -> bool {
        matches!(self, Shape::Circle { .. })
    }

    pub fn is_triangle(&self) -> bool {
        matches!(self, Shape::Triangle { .. })
    }
}

/// one colored primitive. color is straight (un-premultiplied) RGBA, 0..255.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub shape: Shape,
    pub rgba: [u8; 4],
}

impl Gene {
    #[inline]
    pub fn alpha(&self) -> u8 {
        self.rgba[3]
    }
}

// zeroed gene, same thing a fresh allocation holds before random init
impl Default for Gene {
    fn default() -> Self {
        Self {
            shape: Shape::Circle { cx: 0, cy: 0, radius: 0 },
            rgba: [0; 4],
        }
    }
}

/// ordered list of genes plus its last computed fitness.
/// gene order is paint order: later genes are composited on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chromosome {
    pub shapes: Vec<Gene>,
    pub fitness: f64,
}

impl Chromosome {
    /// `n` zeroed genes, unevaluated
    pub fn zeroed(n: usize) -> Self {
        Self::from_genes(vec![Gene::default(); n])
    }

    pub fn from_genes(shapes: Vec<Gene>) -> Self {
        Self { shapes, fitness: FITNESS_SENTINEL }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness < FITNESS_SENTINEL
    }

    /// overwrite this genome with `src`'s genes, leaving fitness alone.
    /// returns false (and copies nothing) if the gene counts differ.
    pub fn copy_genes_from(&mut self, src: &Chromosome) -> bool {
        if self.shapes.len() != src.shapes.len() {
            return false;
        }
        self.shapes.copy_from_slice(&src.shapes);
        true
    }

    /// genes and fitness. reuses this allocation when the lengths already match.
    pub fn assign_from(&mut self, src: &Chromosome) {
        if !self.copy_genes_from(src) {
            self.shapes.clear();
            self.shapes.extend_from_slice(&src.shapes);
        }
        self.fitness = src.fitness;
    }
}

impl Default for Chromosome {
    fn default() -> Self {
        Self::from_genes(Vec::new())
    }
}
