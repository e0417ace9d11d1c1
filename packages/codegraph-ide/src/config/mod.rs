//! Solver configuration
//!
//! Two tiers:
//! - Preset: `SolverConfig::from_preset(Preset::Fast)`
//! - YAML/JSON: `SolverConfig::from_yaml("solver.yaml")?`, partial documents fall back to
//!   the defaults field by field
//!
//! ```rust,ignore
//! use codegraph_ide::config::{Preset, SolverConfig};
//!
//! let config = SolverConfig::from_preset(Preset::Balanced).max_iterations(50_000);
//! ```

pub mod error;
pub mod preset;
pub mod solver_config;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use solver_config::{SolverConfig, MAX_ITERATIONS_LIMIT};
pub use validation::Validatable;
