use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::dna::Chromosome;

/// the best chromosome seen so far, shared with the host.
/// the controller writes it under the mutex; readers lock, copy, unlock.
/// a reader never observes a half-written genome.
#[derive(Debug)]
pub struct BestSnapshot {
    best: Mutex<Chromosome>,
    updates: AtomicU64,
}

impl BestSnapshot {
    /// `n_shapes` zeroed genes, unevaluated
    pub fn new(n_shapes: usize) -> Self {
        Self::from_chromosome(Chromosome::zeroed(n_shapes))
    }

    pub fn from_chromosome(chromosome: Chromosome) -> Self {
        Self { best: Mutex::new(chromosome), updates: AtomicU64::new(0) }
    }

    // a panic while holding the lock cannot leave a torn genome behind:
    // assign_from only copies plain data
    fn lock(&self) -> MutexGuard<'_, Chromosome> {
        self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// overwrite unconditionally with genes and fitness of `src`
    pub fn publish(&self, src: &Chromosome) {
        profiling::scope!("BestSnapshot::publish");
        self.lock().assign_from(src);
        self.updates.fetch_add(1, Ordering::Release);
    }

    /// consistent copy of the stored chromosome
    pub fn get(&self) -> Chromosome {
        self.lock().clone()
    }

    pub fn fitness(&self) -> f64 {
        self.lock().fitness
    }

    /// run `f` on the stored chromosome while holding the lock. keep it short,
    /// the controller blocks on the same lock.
    pub fn with<R>(&self, f: impl FnOnce(&Chromosome) -> R) -> R {
        f(&self.lock())
    }

    /// number of publishes so far, lets a poller skip unchanged snapshots
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}
