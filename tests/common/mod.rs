// helpers shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use islandtrace::engine::ChromosomeAllocator;
use islandtrace::{Canvas, Chromosome, EngineError, EngineSettings, ImageFitness, LogLevel, PixelFormat};

pub const FMT: PixelFormat = PixelFormat::ARGB8888;

pub fn settings(population: usize, islands: usize, shapes: usize, iterations: u64) -> EngineSettings {
    let mut s = EngineSettings::default();
    s.params.population_size = population;
    s.params.nb_shapes = shapes;
    s.params.elite_count = 1;
    s.params.max_iterations = iterations;
    s.island_count = islands;
    s.canvas = Canvas::new(64, 48);
    s.seed = Some(0xDEAD_BEEF);
    s.report_interval = 0;
    s
}

/// flat reference of one color over the settings' canvas
pub fn flat_reference(canvas: Canvas, rgb: [u8; 3]) -> Arc<ImageFitness> {
    let px = FMT.compose([rgb[0], rgb[1], rgb[2], 255]);
    Arc::new(ImageFitness::new(vec![px; canvas.pixel_count()], FMT, canvas))
}

/// a horizontal gradient, so random shapes rarely score the same
pub fn gradient_reference(canvas: Canvas) -> Arc<ImageFitness> {
    let mut px = Vec::with_capacity(canvas.pixel_count());
    for _y in 0..canvas.height {
        for x in 0..canvas.width {
            let v = (x * 255 / canvas.width.max(1)) as u8;
            px.push(FMT.compose([v, 255 - v, v / 2, 255]));
        }
    }
    Arc::new(ImageFitness::new(px, FMT, canvas))
}

/// heap allocator that counts outstanding chromosomes
#[derive(Default)]
pub struct CountingAllocator {
    pub allocated: AtomicUsize,
    pub released: AtomicUsize,
    pub live: AtomicIsize,
    pub min_live: AtomicIsize,
}

impl ChromosomeAllocator for CountingAllocator {
    fn allocate(&self, n_shapes: usize) -> Result<Chromosome, EngineError> {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Chromosome::zeroed(n_shapes))
    }

    fn release(&self, _chromosome: Chromosome) {
        self.released.fetch_add(1, Ordering::SeqCst);
        let now = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
        self.min_live.fetch_min(now, Ordering::SeqCst);
    }
}

pub type LogLines = Arc<Mutex<Vec<(LogLevel, String)>>>;

pub fn recording_sink() -> (LogLines, impl Fn(LogLevel, &str) + Send + Sync + 'static) {
    let lines: LogLines = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let lines = Arc::clone(&lines);
        move |level: LogLevel, msg: &str| lines.lock().unwrap().push((level, msg.to_owned()))
    };
    (lines, sink)
}
