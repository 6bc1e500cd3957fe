mod loader;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use islandtrace::render::CpuRenderer;
use islandtrace::{
    spawn_engine, Engine, EngineSettings, FitnessFunc, ImageFitness, MetricsSnapshot, PixelFormat,
};

/// evolve circles and triangles towards a reference image
#[derive(Parser, Debug)]
#[command(name = "islandtrace", version, about)]
struct Args {
    /// reference image (png, jpeg, bmp, gif, webp, tiff)
    image: PathBuf,

    /// settings JSON; missing fields take their defaults
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// fixed RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// generation cap, overrides the settings file
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// stop after this many seconds of wall-clock time
    #[arg(short = 't', long)]
    time_limit: Option<f64>,

    /// where to write the best rendering
    #[arg(short, long, default_value = "best.png")]
    output: PathBuf,

    /// also dump the best chromosome as JSON
    #[arg(long)]
    genome: Option<PathBuf>,

    /// milliseconds between progress lines
    #[arg(long, default_value_t = 1000)]
    progress_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => EngineSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if let Some(n) = args.iterations {
        settings.params.max_iterations = n;
    }
    let canvas = settings.canvas;

    let reference = loader::load_reference(&args.image, canvas)?;
    info!(
        "reference {} ({}x{}) scaled to {}x{}",
        args.image.display(),
        reference.source_width,
        reference.source_height,
        canvas.width,
        canvas.height
    );

    let fitness = Arc::new(ImageFitness::new(reference.pixels, PixelFormat::ARGB8888, canvas));
    let engine = Engine::builder(settings, Arc::clone(&fitness) as Arc<dyn FitnessFunc>).build()?;
    let sizes: Vec<usize> = engine.islands().iter().map(|r| r.len()).collect();
    info!(
        "{} shapes per chromosome, islands {:?}, migration every {} generations",
        engine.settings().params.nb_shapes,
        sizes,
        engine.settings().migration_interval
    );
    let handle = spawn_engine(engine)?;
    let snapshot = Arc::clone(handle.snapshot());

    let started = Instant::now();
    let deadline = args.time_limit.map(|s| started + Duration::from_secs_f64(s.max(0.0)));
    let mut last_seen = 0;
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(args.progress_ms.max(1)));
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("time limit reached, stopping");
            handle.stop();
            break;
        }
        let updates = snapshot.updates();
        if updates != last_seen {
            last_seen = updates;
            if let Some(m) = MetricsSnapshot::from_mse(snapshot.fitness()) {
                info!("best so far: mse {:.2}, rmse {:.2}, psnr {:.2} dB", m.mse, m.rmse, m.psnr);
            }
        }
    }

    let summary = handle.join()?;
    info!(
        "{} generations in {:.1}s, best fitness {:.4}",
        summary.generations,
        summary.elapsed.as_secs_f64(),
        summary.best_fitness
    );

    let (pixels, triangles) = snapshot.with(|best| {
        let pixels = CpuRenderer::render_to_vec(best, fitness.canvas(), &fitness.format());
        (pixels, best.shapes.iter().filter(|g| g.shape.is_triangle()).count())
    });
    let best = snapshot.get();
    info!("best: {} triangles, {} circles", triangles, best.len() - triangles);
    loader::save_png(&pixels, canvas, &args.output)?;
    info!("wrote {}", args.output.display());

    if let Some(path) = &args.genome {
        let json = serde_json::to_string_pretty(&best).context("failed to serialize best chromosome")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    if !best.is_evaluated() {
        warn!("best chromosome was never scored, output is a blank canvas");
    }
    Ok(())
}
