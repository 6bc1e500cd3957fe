// Engine module organization
// the controller lives here, each submodule handles one collaborator

pub mod alloc;
pub mod log;
pub mod observer;
pub(crate) mod pool;
pub mod snapshot;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::dna::{Chromosome, FITNESS_SENTINEL};
use crate::error::EngineError;
use crate::fitness::{FitnessFunc, MetricsSnapshot};
use crate::island::{partition, IslandRange};
use crate::mutate::{crossover, find_best, migrate, mutate_gene, random_init, tournament};
use crate::settings::EngineSettings;

pub use alloc::{ChromosomeAllocator, HeapAllocator};
pub use log::{LogLevel, LogSink, TracingSink};
pub use observer::{GenerationObserver, NoopObserver};
pub use snapshot::BestSnapshot;

/// what a finished run reports back
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSummary {
    /// generations completed after the initial evaluation
    pub generations: u64,
    pub best_fitness: f64,
    pub elapsed: Duration,
}

/// collects the engine's collaborators; everything except the settings and
/// the fitness metric has a default
pub struct EngineBuilder {
    settings: EngineSettings,
    fitness: Arc<dyn FitnessFunc>,
    allocator: Option<Arc<dyn ChromosomeAllocator>>,
    log: Option<Arc<dyn LogSink>>,
    running: Option<Arc<AtomicBool>>,
    snapshot: Option<Arc<BestSnapshot>>,
    observer: Option<Box<dyn GenerationObserver>>,
    seeds: BTreeMap<usize, Chromosome>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings, fitness: Arc<dyn FitnessFunc>) -> Self {
        Self {
            settings,
            fitness,
            allocator: None,
            log: None,
            running: None,
            snapshot: None,
            observer: None,
            seeds: BTreeMap::new(),
        }
    }

    pub fn allocator(mut self, allocator: Arc<dyn ChromosomeAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    pub fn log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    /// shared stop flag. the engine keeps going while it reads true and
    /// clears it on the way out. defaults to a fresh flag set to true.
    pub fn running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn snapshot(mut self, snapshot: Arc<BestSnapshot>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn observer(mut self, observer: Box<dyn GenerationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// start `pop[index]` from these genes instead of random ones
    pub fn seed(mut self, index: usize, chromosome: Chromosome) -> Self {
        self.seeds.insert(index, chromosome);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let log = self.log.unwrap_or_else(|| Arc::new(TracingSink));
        let fail = |err: EngineError| {
            log.log(LogLevel::Error, &err.to_string());
            err
        };

        self.settings.validate().map_err(&fail)?;
        let params = self.settings.params;
        let islands = partition(params.population_size, self.settings.island_count);
        if islands.len() != self.settings.island_count {
            return Err(fail(EngineError::invalid("population cannot be split into islands")));
        }
        for (&index, seed) in &self.seeds {
            if index >= params.population_size {
                return Err(fail(EngineError::invalid(format!(
                    "seed index {index} outside population of {}",
                    params.population_size
                ))));
            }
            if seed.len() != params.nb_shapes {
                return Err(fail(EngineError::invalid(format!(
                    "seed {index} has {} genes, expected {}",
                    seed.len(),
                    params.nb_shapes
                ))));
            }
        }

        let seed = self.settings.seed.unwrap_or_else(|| rand::rng().random());
        let snapshot = self.snapshot.unwrap_or_else(|| Arc::new(BestSnapshot::new(params.nb_shapes)));

        Ok(Engine {
            islands,
            fitness: self.fitness,
            allocator: self.allocator.unwrap_or_else(|| Arc::new(HeapAllocator)),
            running: self.running.unwrap_or_else(|| Arc::new(AtomicBool::new(true))),
            snapshot,
            observer: self.observer.unwrap_or_else(|| Box::new(NoopObserver)),
            seeds: self.seeds,
            rng: Pcg32::seed_from_u64(seed),
            rng_seed: seed,
            warned_panic: false,
            warned_sentinel: false,
            log,
            settings: self.settings,
        })
    }
}

/// the island-model GA controller. owns the population and the RNG;
/// consumed by [`Engine::run`], normally on its own thread
/// (see [`crate::engine_thread::spawn_engine`]).
pub struct Engine {
    settings: EngineSettings,
    islands: Vec<IslandRange>,
    fitness: Arc<dyn FitnessFunc>,
    allocator: Arc<dyn ChromosomeAllocator>,
    log: Arc<dyn LogSink>,
    running: Arc<AtomicBool>,
    snapshot: Arc<BestSnapshot>,
    observer: Box<dyn GenerationObserver>,
    seeds: BTreeMap<usize, Chromosome>,
    rng: Pcg32,
    rng_seed: u64,
    warned_panic: bool,
    warned_sentinel: bool,
}

impl Engine {
    pub fn builder(settings: EngineSettings, fitness: Arc<dyn FitnessFunc>) -> EngineBuilder {
        EngineBuilder::new(settings, fitness)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn islands(&self) -> &[IslandRange] {
        &self.islands
    }

    pub fn snapshot(&self) -> Arc<BestSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// seed actually used for the RNG, drawn from the OS if none was set
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    fn info(&self, msg: &str) {
        self.log.log(LogLevel::Info, msg);
    }

    fn fatal(&self, err: EngineError) -> EngineError {
        self.log.log(LogLevel::Error, &err.to_string());
        err
    }

    /// initial evaluation, then generations until `max_iterations` or until
    /// the running flag is cleared. the flag is cleared and every worker
    /// joined before this returns, on success and on error.
    pub fn run(mut self) -> Result<EngineSummary, EngineError> {
        profiling::scope!("Engine::run");
        let started = Instant::now();
        let p = self.settings.params;
        self.info(&format!(
            "starting: {} chromosomes x {} shapes, {} islands, seed {}",
            p.population_size,
            p.nb_shapes,
            self.islands.len(),
            self.rng_seed
        ));
        if p.elite_count != 1 {
            self.info(&format!("elite_count {} requested, carrying one elite per island", p.elite_count));
        }

        let pool = match pool::EvalPool::start(self.islands.len(), Arc::clone(&self.fitness)) {
            Ok(pool) => pool,
            Err(e) => {
                self.running.store(false, Ordering::Relaxed);
                return Err(self.fatal(e));
            }
        };

        let outcome = self.evolve(&pool, started);
        self.running.store(false, Ordering::Relaxed);
        pool.shutdown();

        match outcome {
            Ok(summary) => {
                self.info(&format!(
                    "finished after {} generations, best fitness {:.4}, {} ms",
                    summary.generations,
                    summary.best_fitness,
                    summary.elapsed.as_millis()
                ));
                Ok(summary)
            }
            Err(e) => Err(self.fatal(e)),
        }
    }

    fn evolve(&mut self, pool: &pool::EvalPool, started: Instant) -> Result<EngineSummary, EngineError> {
        let mut pop = self.initial_population()?;
        let outcome = self.generations(pool, &mut pop, started);
        for chromosome in pop.drain(..) {
            self.allocator.release(chromosome);
        }
        outcome
    }

    fn release_all(&self, chromosomes: Vec<Chromosome>) {
        for chromosome in chromosomes {
            self.allocator.release(chromosome);
        }
    }

    /// allocate one chromosome and check the host gave it `nb_shapes` genes
    fn allocate(&self) -> Result<Chromosome, EngineError> {
        let nb_shapes = self.settings.params.nb_shapes;
        let chromosome = self.allocator.allocate(nb_shapes)?;
        if chromosome.len() != nb_shapes {
            let got = chromosome.len();
            self.allocator.release(chromosome);
            return Err(EngineError::InvalidConfig(format!(
                "allocator returned {got} genes, expected {nb_shapes}"
            )));
        }
        Ok(chromosome)
    }

    fn initial_population(&mut self) -> Result<Vec<Chromosome>, EngineError> {
        profiling::scope!("initial_population");
        let params = self.settings.params;
        let mut pop = Vec::with_capacity(params.population_size);
        for index in 0..params.population_size {
            let mut chromosome = match self.allocate() {
                Ok(c) => c,
                Err(e) => {
                    self.release_all(pop);
                    return Err(e);
                }
            };
            match self.seeds.get(&index) {
                Some(seed) => {
                    let copied = chromosome.copy_genes_from(seed);
                    debug_assert!(copied, "seed lengths are checked by the builder");
                    chromosome.fitness = FITNESS_SENTINEL;
                }
                None => random_init(&mut chromosome, &mut self.rng, self.settings.canvas),
            }
            pop.push(chromosome);
        }
        Ok(pop)
    }

    fn generations(
        &mut self,
        pool: &pool::EvalPool,
        pop: &mut Vec<Chromosome>,
        started: Instant,
    ) -> Result<EngineSummary, EngineError> {
        self.evaluate(pool, pop);
        self.observer.after_initial(pop, &self.islands);

        let first = find_best(pop, IslandRange::whole(pop.len()));
        let mut best_fitness = pop[first].fitness;
        self.snapshot.publish(&pop[first]);

        let max_iterations = self.settings.params.max_iterations;
        let migration_interval = self.settings.migration_interval;
        let report_interval = self.settings.report_interval;
        let mut last_report = Instant::now();
        let mut generation = 0u64;

        while generation < max_iterations && self.running.load(Ordering::Relaxed) {
            generation += 1;
            profiling::scope!("generation");

            if generation % migration_interval == 0 {
                self.observer.before_migration(generation, pop, &self.islands);
                migrate(pop, &self.islands);
                self.observer.after_migration(generation, pop, &self.islands);
            }

            self.reproduce(pop)?;
            self.evaluate(pool, pop);

            if let Some(i) = improvement(pop, best_fitness) {
                best_fitness = pop[i].fitness;
                self.snapshot.publish(&pop[i]);
            }
            self.observer.after_generation(generation, pop, &self.islands);

            if report_interval > 0 && generation % report_interval == 0 {
                let psnr = MetricsSnapshot::from_mse(best_fitness).map_or(0.0, |m| m.psnr);
                self.info(&format!(
                    "generation {generation}: best fitness {best_fitness:.4} ({psnr:.2} dB), last {report_interval} generations: {} ms",
                    last_report.elapsed().as_millis()
                ));
                last_report = Instant::now();
            }
        }

        Ok(EngineSummary { generations: generation, best_fitness, elapsed: started.elapsed() })
    }

    fn evaluate(&mut self, pool: &pool::EvalPool, pop: &mut Vec<Chromosome>) {
        let faults = pool.evaluate(pop, &self.islands);
        if faults > 0 && !self.warned_panic {
            self.warned_panic = true;
            self.log.log(
                LogLevel::Warn,
                &format!("fitness callback panicked on {faults} chromosomes, scored as unevaluated"),
            );
        }
        // panicked scores are the sentinel too, only count the ones the callback returned
        if !self.warned_sentinel && pop.iter().filter(|c| c.fitness >= FITNESS_SENTINEL).count() as u64 > faults {
            self.warned_sentinel = true;
            self.log.log(LogLevel::Warn, "fitness callback returned the sentinel, check the reference image and canvas");
        }
    }

    /// build the next generation. each island keeps its best at its first
    /// slot and refills the rest with children bred from its own members.
    /// nothing in `pop` changes unless every child was allocated.
    fn reproduce(&mut self, pop: &mut Vec<Chromosome>) -> Result<(), EngineError> {
        profiling::scope!("reproduce");
        let parents: &[Chromosome] = pop;
        let elites: Vec<usize> = self.islands.iter().map(|&r| find_best(parents, r)).collect();

        let mut broods: Vec<Vec<Chromosome>> = Vec::with_capacity(self.islands.len());
        for i in 0..self.islands.len() {
            let island = self.islands[i];
            match self.breed(parents, island) {
                Ok(brood) => broods.push(brood),
                Err(e) => {
                    self.release_all(broods.into_iter().flatten().collect());
                    return Err(e);
                }
            }
        }

        let mut old: Vec<Option<Chromosome>> = std::mem::take(pop).into_iter().map(Some).collect();
        let mut next = Vec::with_capacity(old.len());
        for (&elite, brood) in elites.iter().zip(broods) {
            if let Some(chromosome) = old[elite].take() {
                next.push(chromosome);
            }
            next.extend(brood);
        }
        self.release_all(old.into_iter().flatten().collect());
        *pop = next;
        Ok(())
    }

    /// `island.len() - 1` children: two tournaments, the fitter winner is
    /// the first parent, then crossover or copy, then per-gene mutation
    fn breed(&mut self, pop: &[Chromosome], island: IslandRange) -> Result<Vec<Chromosome>, EngineError> {
        let params = self.settings.params;
        let canvas = self.settings.canvas;
        let mut brood = Vec::with_capacity(island.len() - 1);

        for _ in 1..island.len() {
            let a = tournament(pop, island, &mut self.rng);
            let b = tournament(pop, island, &mut self.rng);
            let (first, second) = if pop[b].fitness < pop[a].fitness { (b, a) } else { (a, b) };

            let mut child = match self.allocate() {
                Ok(c) => c,
                Err(e) => {
                    self.release_all(brood);
                    return Err(e);
                }
            };

            let bred = if self.rng.random::<f32>() < params.crossover_rate {
                crossover(&pop[first], &pop[second], &mut child)
            } else {
                child.copy_genes_from(&pop[first])
            };
            debug_assert!(bred, "parents and child share nb_shapes");
            for gene in child.shapes.iter_mut() {
                if self.rng.random::<f32>() < params.mutation_rate {
                    mutate_gene(gene, &mut self.rng, canvas);
                }
            }
            brood.push(child);
        }
        Ok(brood)
    }
}

/// index of the lowest fitness if it strictly beats `best`
fn improvement(pop: &[Chromosome], best: f64) -> Option<usize> {
    let i = find_best(pop, IslandRange::whole(pop.len()));
    (pop[i].fitness < best).then_some(i)
}
