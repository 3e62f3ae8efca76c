use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{PloError, PloResult};
use crate::stats::StoppingRule;

pub const DEFAULT_BATCH_SIZE: u64 = 100;

pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub stopping: StoppingRule,
    /// Worker threads. 0 or 1 runs on the calling thread.
    pub threads: usize,
    /// Trials a worker runs between merges into the shared tally.
    pub batch_size: u64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            stopping: StoppingRule::default(),
            threads: default_threads(),
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn single_threaded() -> Self {
        SimulationConfig::default().with_threads(1)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_stopping(mut self, stopping: StoppingRule) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.threads > 1
    }

    pub fn from_json_str(json: &str) -> PloResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PloResult<Self> {
        let json = fs::read_to_string(path)?;
        SimulationConfig::from_json_str(&json)
    }

    pub fn validate(&self) -> PloResult<()> {
        if self.batch_size == 0 {
            return Err(PloError::InvalidValue("batch_size must be positive".to_string()));
        }
        self.stopping.validate()
    }

    /// RNG for worker `index`. Seeded runs derive one stream per worker.
    pub(crate) fn rng_for(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }
}
