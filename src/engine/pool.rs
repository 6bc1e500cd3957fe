//─────────────────────────────────────────────────────────────────────────────
// barrier-synchronised evaluation pool
//
// one worker per island, one lane per worker. a generation is
//   controller: move island chunks into the lanes
//   start rendezvous
//   workers:    score every chromosome in their own lane
//   done rendezvous
//   controller: move the lanes back into the population
// the controller never touches a lane between the two rendezvous and a
// worker never touches one outside them.
//─────────────────────────────────────────────────────────────────────────────

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::dna::{Chromosome, FITNESS_SENTINEL};
use crate::engine::alloc::try_scratch;
use crate::error::EngineError;
use crate::fitness::FitnessFunc;
use crate::island::IslandRange;

struct Shared {
    barrier: Barrier,
    lanes: Vec<Mutex<Vec<Chromosome>>>,
    // private to the pool; the host's stop flag is only read by the controller
    active: AtomicBool,
    faults: AtomicU64,
}

fn lock(lane: &Mutex<Vec<Chromosome>>) -> MutexGuard<'_, Vec<Chromosome>> {
    lane.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct EvalPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl EvalPool {
    /// spawn `count` workers, each with its own scratch buffer. either every
    /// worker is parked at the start rendezvous on return, or none is running.
    pub(crate) fn start(count: usize, fitness: Arc<dyn FitnessFunc>) -> Result<Self, EngineError> {
        profiling::scope!("EvalPool::start");
        let shared = Arc::new(Shared {
            barrier: Barrier::new(count + 1),
            lanes: (0..count).map(|_| Mutex::new(Vec::new())).collect(),
            active: AtomicBool::new(true),
            faults: AtomicU64::new(0),
        });
        let scratch_len = fitness.scratch_len();

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), EngineError>>();
        let mut gates = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        let mut failure = None;

        for index in 0..count {
            let (go_tx, go_rx) = mpsc::channel::<bool>();
            let shared = Arc::clone(&shared);
            let fitness = Arc::clone(&fitness);
            let ready = ready_tx.clone();

            let spawned = thread::Builder::new().name(format!("eval-{index}")).spawn(move || {
                profiling::register_thread!();
                let scratch = match try_scratch(scratch_len) {
                    Ok(buf) => {
                        let _ = ready.send(Ok(()));
                        buf
                    }
                    Err(e) => {
                        let _ = ready.send(Err(e));
                        return;
                    }
                };
                drop(ready);
                // a closed gate means start-up was abandoned
                if go_rx.recv() != Ok(true) {
                    return;
                }
                worker_loop(index, &shared, &*fitness, scratch);
            });

            match spawned {
                Ok(handle) => {
                    handles.push(handle);
                    gates.push(go_tx);
                }
                Err(source) => {
                    failure = Some(EngineError::WorkerSpawn { index, source });
                    break;
                }
            }
        }
        drop(ready_tx);

        for _ in 0..handles.len() {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    failure.get_or_insert(EngineError::EngineThread(
                        "evaluation worker exited during start-up".to_owned(),
                    ));
                    break;
                }
            }
        }

        if let Some(err) = failure {
            drop(gates);
            for handle in handles {
                let _ = handle.join();
            }
            return Err(err);
        }

        for gate in &gates {
            let _ = gate.send(true);
        }
        Ok(Self { shared, workers: handles, stopped: false })
    }

    pub(crate) fn lanes(&self) -> usize {
        self.shared.lanes.len()
    }

    /// score every chromosome of `pop` in parallel, one island per worker.
    /// `islands` must tile `pop` in order, one range per lane.
    /// returns how many evaluations panicked during this pass.
    pub(crate) fn evaluate(&self, pop: &mut Vec<Chromosome>, islands: &[IslandRange]) -> u64 {
        profiling::scope!("EvalPool::evaluate");
        debug_assert_eq!(islands.len(), self.lanes());
        debug_assert_eq!(islands.last().map(|r| r.end + 1), Some(pop.len()));

        let faults_before = self.shared.faults.load(Ordering::Relaxed);
        let mut rest = std::mem::take(pop);
        for (lane, island) in self.shared.lanes.iter().zip(islands).rev() {
            *lock(lane) = rest.split_off(island.start);
        }

        self.shared.barrier.wait(); // start
        self.shared.barrier.wait(); // done

        for lane in &self.shared.lanes {
            rest.append(&mut lock(lane));
        }
        *pop = rest;
        self.shared.faults.load(Ordering::Relaxed) - faults_before
    }

    /// release the workers and join them. idempotent; also runs on drop, so
    /// an unwinding controller does not leave workers parked forever.
    fn finish(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.shared.active.store(false, Ordering::Relaxed);
        self.shared.barrier.wait();
        self.shared.barrier.wait();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    pub(crate) fn shutdown(mut self) {
        self.finish();
    }
}

impl Drop for EvalPool {
    fn drop(&mut self) {
        self.finish();
    }
}

fn worker_loop(index: usize, shared: &Shared, fitness: &dyn FitnessFunc, mut scratch: Vec<u32>) {
    loop {
        shared.barrier.wait();
        if !shared.active.load(Ordering::Relaxed) {
            // matches the controller's second shutdown rendezvous
            shared.barrier.wait();
            break;
        }
        {
            profiling::scope!("eval_lane");
            let mut lane = lock(&shared.lanes[index]);
            for chromosome in lane.iter_mut() {
                chromosome.fitness = score(fitness, chromosome, &mut scratch, &shared.faults);
            }
        }
        shared.barrier.wait();
    }
}

/// one guarded evaluation. a panic or NaN becomes the sentinel so the
/// rendezvous protocol is never broken by a bad callback.
fn score(fitness: &dyn FitnessFunc, chromosome: &Chromosome, scratch: &mut [u32], faults: &AtomicU64) -> f64 {
    match panic::catch_unwind(AssertUnwindSafe(|| fitness.fitness(chromosome, scratch))) {
        Ok(v) if v.is_nan() => FITNESS_SENTINEL,
        Ok(v) => v,
        Err(_) => {
            faults.fetch_add(1, Ordering::Relaxed);
            FITNESS_SENTINEL
        }
    }
}
