use crate::dna::Chromosome;
use crate::island::IslandRange;

/// read-only hooks into the generation loop. all calls happen on the
/// controller thread while no worker is running, so the population slice is
/// stable for the duration of the call.
pub trait GenerationObserver: Send {
    /// after the initial population has been evaluated (generation 0)
    fn after_initial(&mut self, _pop: &[Chromosome], _islands: &[IslandRange]) {}

    fn before_migration(&mut self, _generation: u64, _pop: &[Chromosome], _islands: &[IslandRange]) {}

    fn after_migration(&mut self, _generation: u64, _pop: &[Chromosome], _islands: &[IslandRange]) {}

    /// after the new generation has been evaluated and the best updated
    fn after_generation(&mut self, _generation: u64, _pop: &[Chromosome], _islands: &[IslandRange]) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}
