/*
 * Solver error types
 *
 * Two families reach the caller:
 * - configuration errors, raised while seeding and before any worklist processing
 * - non-termination, raised mid-run when an iteration or time cap is hit
 *
 * Cache-consistency problems are excluded by construction (arena ownership) and have
 * no variant here.
 */

use thiserror::Error;

use crate::config::ConfigError;

/// Solver phase, reported with resource-cap errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPhase {
    /// Phase 1: path-edge tabulation
    Tabulation,
    /// Phase 2: value propagation
    ValuePropagation,
}

impl std::fmt::Display for SolverPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tabulation => write!(f, "tabulation"),
            Self::ValuePropagation => write!(f, "value propagation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("No entry points: the problem declared no seeds")]
    NoEntryPoints,

    #[error("Seed statement {statement} does not belong to any procedure")]
    UnknownSeedStatement { statement: String },

    #[error("Dangling call site {call_site}: {reason}")]
    DanglingCallSite { call_site: String, reason: String },

    /// The partial jump-function table is discarded; nothing is returned.
    #[error("Iteration limit exceeded during {phase}: {iterations} steps (limit: {limit}). A flow or edge function may not be monotone")]
    IterationLimitExceeded {
        iterations: u64,
        limit: u64,
        phase: SolverPhase,
    },

    #[error("Time budget exceeded during {phase}: {elapsed_ms}ms (budget: {budget_ms}ms)")]
    TimeBudgetExceeded {
        elapsed_ms: u64,
        budget_ms: u64,
        phase: SolverPhase,
    },

    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl SolverError {
    pub fn dangling_call_site(call_site: impl std::fmt::Debug, reason: impl Into<String>) -> Self {
        Self::DanglingCallSite {
            call_site: format!("{:?}", call_site),
            reason: reason.into(),
        }
    }

    /// True for errors raised before the worklist started.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoEntryPoints
                | Self::UnknownSeedStatement { .. }
                | Self::DanglingCallSite { .. }
                | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
