//! Generator configuration - seeding probabilities and worker count.

use serde::{Deserialize, Serialize};

/// Default chance that an interior tile takes the chunk's biome.
pub const DEFAULT_P_BIOME: f64 = 0.6;

/// Default chance that any tile becomes rock.
pub const DEFAULT_P_ROCK: f64 = 0.05;

/// Configuration shared by the terrain generator and the scheduler.
///
/// # Example
///
/// ```
/// use tilecraft_gen::GeneratorConfig;
///
/// let config = GeneratorConfig::default().with_probabilities(1.5, -0.2).with_workers(0);
/// assert_eq!(config.p_biome, 1.0);
/// assert_eq!(config.p_rock, 0.0);
/// assert_eq!(config.workers, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Probability that a non-border ocean tile is seeded with the biome.
    pub p_biome: f64,
    /// Probability that a tile is seeded with rock.
    pub p_rock: f64,
    /// Concurrent workers draining each phase or tick. At least 1.
    pub workers: usize,
    /// Fixed seed for the stochastic phases; random per chunk when `None`.
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn with_probabilities(mut self, p_biome: f64, p_rock: f64) -> Self {
        self.p_biome = clamp_probability(p_biome);
        self.p_rock = clamp_probability(p_rock);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Re-apply the clamps, e.g. after deserializing.
    pub fn normalized(self) -> Self {
        let (p_biome, p_rock, workers) = (self.p_biome, self.p_rock, self.workers);
        self.with_probabilities(p_biome, p_rock).with_workers(workers)
    }

    /// One-line description for logs and reports.
    pub fn summary(&self) -> String {
        format!(
            "p_biome={:.2} p_rock={:.2} workers={} seed={}",
            self.p_biome,
            self.p_rock,
            self.workers,
            self.seed.map_or_else(|| "random".to_string(), |s| s.to_string())
        )
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            p_biome: DEFAULT_P_BIOME,
            p_rock: DEFAULT_P_ROCK,
            workers: num_cpus::get().max(1),
            seed: None,
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
