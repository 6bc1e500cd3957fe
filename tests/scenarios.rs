mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_pcg::Pcg32;

use islandtrace::engine::GenerationObserver;
use islandtrace::island::IslandRange;
use islandtrace::mutate::{find_best, find_worst_index, random_gene};
use islandtrace::render::CpuRenderer;
use islandtrace::{
    spawn_engine, BestSnapshot, Canvas, Chromosome, Engine, FitnessFunc, Gene, ImageFitness, Shape,
};

use common::{flat_reference, settings, FMT};

#[test]
fn black_triangle_on_black_reference_scores_zero() {
    let canvas = Canvas::new(640, 480);
    let triangle = Chromosome::from_genes(vec![Gene {
        shape: Shape::Triangle { x1: 0, y1: 0, x2: 1280, y2: 0, x3: 0, y3: 960 },
        rgba: [0, 0, 0, 255],
    }]);

    let rendered = CpuRenderer::render_to_vec(&triangle, canvas, &FMT);
    assert!(rendered.iter().all(|&px| FMT.decompose(px)[..3] == [0, 0, 0]));

    let fitness = flat_reference(canvas, [0, 0, 0]);
    let mut scratch = vec![0u32; fitness.scratch_len()];
    assert_eq!(fitness.fitness(&triangle, &mut scratch), 0.0);
}

#[test]
fn transparent_shape_on_white_reference_is_max_error() {
    let canvas = Canvas::new(640, 480);
    let ghost = Chromosome::from_genes(vec![Gene {
        shape: Shape::Circle { cx: 320, cy: 240, radius: 50 },
        rgba: [0, 0, 0, 0],
    }]);

    let rendered = CpuRenderer::render_to_vec(&ghost, canvas, &FMT);
    assert!(rendered.iter().all(|&px| FMT.decompose(px)[..3] == [0, 0, 0]));

    let fitness = flat_reference(canvas, [255, 255, 255]);
    let mut scratch = vec![0u32; fitness.scratch_len()];
    assert_eq!(fitness.fitness(&ghost, &mut scratch), 195_075.0);
}

#[test]
fn seeded_reference_chromosome_is_found_in_initial_evaluation() {
    struct InitialBest(Arc<Mutex<Option<f64>>>);
    impl GenerationObserver for InitialBest {
        fn after_initial(&mut self, pop: &[Chromosome], _: &[IslandRange]) {
            *self.0.lock().unwrap() = Some(pop[0].fitness);
        }
    }

    let canvas = Canvas::new(640, 480);
    let mut rng = Pcg32::seed_from_u64(0);
    let c0 = Chromosome::from_genes(vec![random_gene(&mut rng, canvas)]);
    let reference = CpuRenderer::render_to_vec(&c0, canvas, &FMT);

    let mut s = settings(4, 4, 1, 1);
    s.canvas = canvas;
    s.params.crossover_rate = 0.0;
    s.params.mutation_rate = 0.0;

    let initial = Arc::new(Mutex::new(None));
    let engine = Engine::builder(s, Arc::new(ImageFitness::new(reference, FMT, canvas)))
        .seed(0, c0.clone())
        .observer(Box::new(InitialBest(Arc::clone(&initial))))
        .build()
        .unwrap();
    let snapshot = engine.snapshot();
    engine.run().unwrap();

    assert_eq!(*initial.lock().unwrap(), Some(0.0));
    assert_eq!(snapshot.fitness(), 0.0);
    assert_eq!(snapshot.get().shapes, c0.shapes);
}

#[test]
fn fixed_seed_single_island_run_is_reproducible() {
    struct Trace {
        snapshot: Arc<BestSnapshot>,
        seen: Arc<Mutex<Vec<f64>>>,
    }
    impl GenerationObserver for Trace {
        fn after_generation(&mut self, _: u64, _: &[Chromosome], _: &[IslandRange]) {
            self.seen.lock().unwrap().push(self.snapshot.fitness());
        }
    }

    let run = || {
        let mut s = settings(12, 1, 6, 100);
        s.params.mutation_rate = 1.0;
        s.params.crossover_rate = 1.0;
        let snapshot = Arc::new(BestSnapshot::new(s.params.nb_shapes));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::builder(s, common::gradient_reference(Canvas::new(64, 48)))
            .snapshot(Arc::clone(&snapshot))
            .observer(Box::new(Trace { snapshot: Arc::clone(&snapshot), seen: Arc::clone(&seen) }))
            .build()
            .unwrap();
        engine.run().unwrap();
        let trace = seen.lock().unwrap().clone();
        (trace, snapshot.get())
    };

    let (first, best_a) = run();
    let (second, best_b) = run();
    assert_eq!(first.len(), 100);
    assert_eq!(first, second);
    assert_eq!(best_a, best_b);
}

#[test]
fn migrant_reaches_next_island_at_boundary() {
    const PERFECT: [u8; 4] = [1, 2, 3, 4];
    const TERRIBLE: [u8; 4] = [9, 9, 9, 9];

    // hand-built genes score 0 and 1e6, random ones land in between
    let fitness: Arc<dyn FitnessFunc> = Arc::new(|c: &Chromosome| match c.shapes[0].rgba {
        PERFECT => 0.0,
        TERRIBLE => 1.0e6,
        rgba => 1000.0 + rgba[0] as f64,
    });

    #[derive(Default)]
    struct Boundary {
        expected: Option<Chromosome>,
        slot: usize,
        checked: Vec<u64>,
        last_island1: Vec<Chromosome>,
    }
    struct Watch(Arc<Mutex<Boundary>>);
    impl GenerationObserver for Watch {
        fn before_migration(&mut self, _: u64, pop: &[Chromosome], islands: &[IslandRange]) {
            let mut b = self.0.lock().unwrap();
            b.expected = Some(pop[find_best(pop, islands[0])].clone());
            b.slot = find_worst_index(pop, islands[1]);
        }
        fn after_migration(&mut self, generation: u64, pop: &[Chromosome], _: &[IslandRange]) {
            let mut b = self.0.lock().unwrap();
            let expected = b.expected.take().unwrap();
            assert_eq!(pop[b.slot], expected, "generation {generation}");
            b.checked.push(generation);
        }
        fn after_generation(&mut self, _: u64, pop: &[Chromosome], islands: &[IslandRange]) {
            self.0.lock().unwrap().last_island1 = pop[islands[1].indices()].to_vec();
        }
    }

    let mut s = settings(4, 2, 1, 2);
    s.migration_interval = 1;
    s.params.mutation_rate = 0.0;
    s.params.crossover_rate = 0.0;

    let gene = |rgba| Chromosome::from_genes(vec![Gene { shape: Shape::Circle { cx: 3, cy: 3, radius: 3 }, rgba }]);
    let state = Arc::new(Mutex::new(Boundary::default()));
    let engine = Engine::builder(s, fitness)
        .seed(0, gene(PERFECT))
        .seed(2, gene(TERRIBLE))
        .observer(Box::new(Watch(Arc::clone(&state))))
        .build()
        .unwrap();
    engine.run().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.checked, vec![1, 2]);
    // the migrant is island 1's elite afterwards
    assert!(state.last_island1.iter().any(|c| c.shapes[0].rgba == PERFECT && c.fitness == 0.0));
    assert!(state.last_island1.iter().all(|c| c.shapes[0].rgba != TERRIBLE));
}

#[test]
fn clearing_the_stop_flag_returns_promptly() {
    let s = settings(16, 4, 8, 1_000_000_000);
    let running = Arc::new(AtomicBool::new(true));
    let engine = Engine::builder(s, common::gradient_reference(Canvas::new(64, 48)))
        .running(Arc::clone(&running))
        .build()
        .unwrap();
    let handle = spawn_engine(engine).unwrap();

    thread::sleep(Duration::from_millis(50));
    let cleared = Instant::now();
    running.store(false, Ordering::Relaxed);
    let summary = handle.join().unwrap();

    assert!(cleared.elapsed() < Duration::from_millis(500), "took {:?}", cleared.elapsed());
    assert!(summary.generations > 0);
    assert!(summary.generations < 1_000_000_000);
}
