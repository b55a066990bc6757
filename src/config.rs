//! Evaluator configuration
//!
//! Loaded from TOML; every field has a default, so an empty file is valid:
//!
//! ```toml
//! parallel_threshold = 100
//! chunk_size = 25
//! max_workers = 8
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::thread;
use validator::Validate;

/// Policy count above which the parallel evaluator is used
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 100;

/// Policies evaluated per parallel job
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Tuning for multi-policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Evaluate in parallel when more policies than this are attached
    pub parallel_threshold: usize,

    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Upper bound on worker threads; the chunk count also bounds it
    #[validate(range(min = 1))]
    pub max_workers: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: default_workers(),
        }
    }
}

/// Available parallelism, or 1 if it cannot be determined
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl EvaluatorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EvaluatorConfig = toml::from_str(s)?;
        config.check()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject zero chunk sizes and worker counts
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }
}
