//! Scheduler configuration

use crate::error::RecipeError;
use serde::{Deserialize, Serialize};

/// Scheduler configuration
///
/// Loadable from TOML:
///
/// ```toml
/// max_cycles = 3
/// min_cycles = 1
/// parallel = true
/// parallel_threshold = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on passes over the batch
    pub max_cycles: usize,
    /// Passes that always run, changes or not
    pub min_cycles: usize,
    /// Whether per-source visits may run on the rayon pool
    pub parallel: bool,
    /// Smallest batch that is visited in parallel
    pub parallel_threshold: usize,
}

impl SchedulerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max cycles
    #[inline]
    #[must_use]
    pub fn with_max_cycles(mut self, max: usize) -> Self {
        self.max_cycles = max;
        self
    }

    /// With min cycles
    #[inline]
    #[must_use]
    pub fn with_min_cycles(mut self, min: usize) -> Self {
        self.min_cycles = min;
        self
    }

    /// With parallel visits on or off
    #[inline]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// With parallel threshold
    #[inline]
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys fall back to [`SchedulerConfig::default`].
    ///
    /// # Errors
    /// Returns [`RecipeError::Config`] if the document does not parse or the
    /// values are inconsistent
    pub fn from_toml_str(source: &str) -> Result<Self, RecipeError> {
        let config: Self =
            toml::from_str(source).map_err(|e| RecipeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are consistent
    ///
    /// # Errors
    /// Returns [`RecipeError::Config`] if `max_cycles` is zero or smaller
    /// than `min_cycles`
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.max_cycles == 0 {
            return Err(RecipeError::Config("max_cycles must be at least 1".to_string()));
        }
        if self.min_cycles > self.max_cycles {
            return Err(RecipeError::Config(format!(
                "min_cycles ({}) exceeds max_cycles ({})",
                self.min_cycles, self.max_cycles
            )));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_cycles: 3,
            min_cycles: 1,
            parallel: true,
            parallel_threshold: 64,
        }
    }
}
