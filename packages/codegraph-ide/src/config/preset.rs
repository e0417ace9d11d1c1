//! Preset configurations
//!
//! Presets provide complete solver configurations for common use cases.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Solver configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// CI: reachability only
    ///
    /// - Phase 2 (value propagation) skipped
    /// - Iteration cap of 1,000,000 propagation steps
    Fast,

    /// Development: full IDE solve with default settings
    Balanced,

    /// Audit: everything on
    ///
    /// - Phase 2 enabled
    /// - Unbalanced returns past seeds
    /// - Exploded supergraph recorded
    /// - No iteration cap
    Thorough,
}

impl Preset {
    /// Parse preset from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::str::FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::parse("fast").unwrap(), Preset::Fast);
        assert_eq!(Preset::parse("FAST").unwrap(), Preset::Fast);
        assert_eq!(Preset::parse("balanced").unwrap(), Preset::Balanced);
        assert_eq!("thorough".parse::<Preset>().unwrap(), Preset::Thorough);
        assert!(Preset::parse("custom").is_err());
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Fast.to_string(), "fast");
        assert_eq!(Preset::Balanced.to_string(), "balanced");
        assert_eq!(Preset::Thorough.to_string(), "thorough");
    }

    #[test]
    fn test_default_preset() {
        assert_eq!(Preset::default(), Preset::Balanced);
    }
}
