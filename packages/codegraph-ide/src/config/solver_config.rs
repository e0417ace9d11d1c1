//! Solver configuration

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;

/// Upper bound accepted for `max_iterations`.
pub const MAX_ITERATIONS_LIMIT: u64 = 100_000_000;

/// IDE solver configuration
///
/// Every field has a default, so partial YAML/JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Run phase 2 (value propagation). IFDS-only clients can switch it off.
    pub compute_values: bool,

    /// Keep the zero fact alive through every flow function
    pub auto_add_zero: bool,

    /// Propagate returns out of seed procedures into all their callers (zero fact only)
    pub follow_returns_past_seeds: bool,

    /// Treat an empty seed set as an error instead of an empty result
    pub require_entry_points: bool,

    /// Check reachable call sites before the worklist starts
    pub validate_icfg: bool,

    /// Propagation step cap per phase (0 = unlimited, 0..=100000000)
    pub max_iterations: u64,

    /// Wall-clock budget for the whole run in milliseconds (0 = unlimited)
    pub time_budget_ms: u64,

    /// Record the exploded supergraph (memory heavy, debugging only)
    pub record_exploded_edges: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            compute_values: true,
            auto_add_zero: true,
            follow_returns_past_seeds: false,
            require_entry_points: false,
            validate_icfg: true,
            max_iterations: 0,
            time_budget_ms: 0,
            record_exploded_edges: false,
        }
    }
}

impl SolverConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                compute_values: false,
                max_iterations: 1_000_000,
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                follow_returns_past_seeds: true,
                record_exploded_edges: true,
                max_iterations: 0,
                ..Self::default()
            },
        }
    }

    /// Load from a YAML file and validate.
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Export to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    // Builder-style setters

    pub fn compute_values(mut self, enabled: bool) -> Self {
        self.compute_values = enabled;
        self
    }

    pub fn follow_returns_past_seeds(mut self, enabled: bool) -> Self {
        self.follow_returns_past_seeds = enabled;
        self
    }

    pub fn require_entry_points(mut self, enabled: bool) -> Self {
        self.require_entry_points = enabled;
        self
    }

    pub fn max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = limit;
        self
    }

    pub fn time_budget_ms(mut self, budget: u64) -> Self {
        self.time_budget_ms = budget;
        self
    }

    pub fn record_exploded_edges(mut self, enabled: bool) -> Self {
        self.record_exploded_edges = enabled;
        self
    }
}

impl Validatable for SolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                0,
                MAX_ITERATIONS_LIMIT,
                "Use 0 for an unlimited run.",
            ));
        }
        Ok(())
    }
}
