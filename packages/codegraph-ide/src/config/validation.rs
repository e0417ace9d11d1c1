//! Configuration validation

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// # Example
/// ```rust,ignore
/// use codegraph_ide::config::{SolverConfig, Validatable};
///
/// let config = SolverConfig::from_yaml_str("max_iterations: 1000")?;
/// config.validate()?;
/// ```
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;
}
