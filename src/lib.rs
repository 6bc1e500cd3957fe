//! island-model genetic algorithm that evolves alpha-blended circles and
//! triangles towards a reference image.
//!
//! the [`engine::Engine`] controller owns the population and runs selection,
//! crossover, mutation and migration on one thread while a barrier-synchronised
//! worker pool scores each island in parallel through a [`fitness::FitnessFunc`].
//! the default metric, [`fitness::ImageFitness`], renders with
//! [`render::CpuRenderer`] and compares against the reference by MSE.

pub mod dna;
pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod fitness;
pub mod island;
pub mod mutate;
pub mod pixel;
pub mod render;
pub mod settings;

pub use dna::{Canvas, Chromosome, Gene, Shape, FITNESS_SENTINEL};
pub use engine::{BestSnapshot, Engine, EngineBuilder, EngineSummary, LogLevel, LogSink};
pub use engine_thread::{spawn_engine, EngineHandle};
pub use error::EngineError;
pub use fitness::{FitnessFunc, ImageFitness, MetricsSnapshot};
pub use pixel::PixelFormat;
pub use settings::{EngineSettings, GaParams};
