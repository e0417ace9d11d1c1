//! Per-run state threaded through the solver
//!
//! Everything a run mutates besides its tables (zero fact, configuration, counters, clock)
//! lives here, so independent solver instances never share state.

use serde::Serialize;
use std::time::Instant;

use crate::config::SolverConfig;
use crate::errors::{SolverError, SolverPhase};
use crate::infrastructure::function_cache::CacheStatistics;

/// Solver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolverStatistics {
    /// Worklist pops in phase 1
    pub iterations: u64,
    /// Distinct path edges (jump-function entries)
    pub path_edges: usize,
    /// Times a jump-function entry was created or weakened
    pub jump_function_updates: u64,
    /// Distinct (entry, exit) summary edges
    pub summary_edges: usize,
    /// Call-site visits that applied an existing end summary
    pub summary_reuses: u64,
    pub flow_functions_constructed: u64,
    pub flow_cache_hits: u64,
    pub edge_functions_constructed: u64,
    pub edge_cache_hits: u64,
    /// Value updates in phase 2
    pub value_propagations: u64,
    pub analysis_time_ms: u64,
}

impl SolverStatistics {
    pub fn absorb_cache(&mut self, cache: CacheStatistics) {
        self.flow_functions_constructed = cache.flow_functions_constructed;
        self.flow_cache_hits = cache.flow_cache_hits;
        self.edge_functions_constructed = cache.edge_functions_constructed;
        self.edge_cache_hits = cache.edge_cache_hits;
    }
}

pub struct RunContext<D> {
    zero: D,
    pub config: SolverConfig,
    pub stats: SolverStatistics,
    started: Instant,
    steps: u64,
}

impl<D> RunContext<D> {
    pub fn new(zero: D, config: SolverConfig) -> Self {
        Self {
            zero,
            config,
            stats: SolverStatistics::default(),
            started: Instant::now(),
            steps: 0,
        }
    }

    pub fn zero(&self) -> &D {
        &self.zero
    }

    pub fn into_zero(self) -> D {
        self.zero
    }

    /// Restarts the clock; called when `solve` begins.
    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.steps = 0;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Starts counting steps for a new phase.
    pub fn begin_phase(&mut self) {
        self.steps = 0;
    }

    /// Counts one propagation step and enforces the iteration cap and time budget.
    pub fn step(&mut self, phase: SolverPhase) -> Result<(), SolverError> {
        self.steps += 1;
        let limit = self.config.max_iterations;
        if limit > 0 && self.steps > limit {
            return Err(SolverError::IterationLimitExceeded {
                iterations: self.steps,
                limit,
                phase,
            });
        }
        // the clock is only read every 256 steps
        let budget = self.config.time_budget_ms;
        if budget > 0 && self.steps % 256 == 0 {
            let elapsed_ms = self.elapsed_ms();
            if elapsed_ms > budget {
                return Err(SolverError::TimeBudgetExceeded {
                    elapsed_ms,
                    budget_ms: budget,
                    phase,
                });
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) {
        self.stats.analysis_time_ms = self.elapsed_ms();
    }
}
