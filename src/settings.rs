//! engine settings for islandtrace
//! loaded from JSON by the host, validated once before the engine starts

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dna::Canvas;
use crate::error::EngineError;

/// GA hyper-parameters. unset JSON fields fall back to the defaults below.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    pub population_size: usize, // total chromosomes across all islands
    pub nb_shapes: usize,       // genes per chromosome
    pub elite_count: usize,     // accepted for compatibility, one elite per island is carried
    pub mutation_rate: f32,     // per-gene probability, 0..1
    pub crossover_rate: f32,    // per-child probability, 0..1
    pub max_iterations: u64,    // generation cap, 0 = initial evaluation only
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            population_size: 500,
            nb_shapes: 100,
            elite_count: 2,
            mutation_rate: 0.05,
            crossover_rate: 0.70,
            max_iterations: 1_000_000,
        }
    }
}

/// everything the controller needs besides the callbacks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub params: GaParams,
    /// islands, also the number of evaluation workers
    pub island_count: usize,
    /// migrate every this many generations
    pub migration_interval: u64,
    pub canvas: Canvas,
    /// fixed RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
    /// generations between progress logs
    pub report_interval: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            params: GaParams::default(),
            island_count: 4,
            migration_interval: 5,
            canvas: Canvas::default(),
            seed: None,
            report_interval: 100,
        }
    }
}

impl EngineSettings {
    /// reject anything the engine cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        let p = &self.params;
        if self.island_count == 0 {
            return Err(EngineError::invalid("island_count must be at least 1"));
        }
        if p.population_size < self.island_count {
            return Err(EngineError::invalid(format!(
                "population_size ({}) must be at least island_count ({})",
                p.population_size, self.island_count
            )));
        }
        if p.nb_shapes == 0 {
            return Err(EngineError::invalid("nb_shapes must be at least 1"));
        }
        let smallest_island = p.population_size / self.island_count;
        if p.elite_count > smallest_island {
            return Err(EngineError::invalid(format!(
                "elite_count ({}) exceeds the smallest island ({smallest_island})",
                p.elite_count
            )));
        }
        for (name, rate) in [("mutation_rate", p.mutation_rate), ("crossover_rate", p.crossover_rate)] {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::invalid(format!("{name} must be within [0, 1], got {rate}")));
            }
        }
        if self.migration_interval == 0 {
            return Err(EngineError::invalid("migration_interval must be at least 1"));
        }
        if self.canvas.is_empty() {
            return Err(EngineError::invalid(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        // coordinates are stored as i32
        if self.canvas.width > i32::MAX as u32 || self.canvas.height > i32::MAX as u32 {
            return Err(EngineError::invalid("canvas dimensions exceed i32 range"));
        }
        Ok(())
    }

    /// save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// load settings from a JSON file. missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
