use crate::dna::{Chromosome, Gene};
use crate::error::EngineError;

/// source and sink of chromosome storage. every chromosome the engine
/// allocates is handed back through `release` exactly once, either when it
/// leaves the population or at shutdown.
pub trait ChromosomeAllocator: Send + Sync {
    /// `n_shapes` zeroed genes, unevaluated
    fn allocate(&self, n_shapes: usize) -> Result<Chromosome, EngineError>;

    fn release(&self, chromosome: Chromosome) {
        drop(chromosome);
    }
}

/// plain heap storage; allocation failure surfaces as `ResourceExhausted`
/// instead of aborting the process
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl ChromosomeAllocator for HeapAllocator {
    fn allocate(&self, n_shapes: usize) -> Result<Chromosome, EngineError> {
        let mut shapes: Vec<Gene> = Vec::new();
        shapes
            .try_reserve_exact(n_shapes)
            .map_err(|_| EngineError::ResourceExhausted { what: "chromosome genes", requested: n_shapes })?;
        shapes.resize(n_shapes, Gene::default());
        Ok(Chromosome::from_genes(shapes))
    }
}

/// a `u32` scratch buffer of `len` zero pixels, same failure mapping
pub(crate) fn try_scratch(len: usize) -> Result<Vec<u32>, EngineError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| EngineError::ResourceExhausted { what: "worker scratch buffer", requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}
