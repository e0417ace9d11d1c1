//! Solver results: statement → fact → value

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::domain::lattice::JoinLattice;
use crate::infrastructure::exploded_graph::ExplodedSupergraph;
use crate::infrastructure::function_cache::TeardownReport;
use crate::infrastructure::run_context::SolverStatistics;

#[derive(Debug)]
pub struct IdeResults<N, D, L> {
    pub(crate) values: FxHashMap<N, FxHashMap<D, L>>,
    pub(crate) reachable: FxHashMap<N, FxHashSet<D>>,
    pub(crate) values_computed: bool,
    pub(crate) zero: D,
    pub(crate) statistics: SolverStatistics,
    pub(crate) exploded: Option<ExplodedSupergraph<N, D>>,
    pub(crate) end_summaries: usize,
    pub(crate) teardown: TeardownReport,
}

impl<N, D, L> IdeResults<N, D, L>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
    L: JoinLattice,
{
    /// Facts holding at `stmt` with their values; facts whose value is ⊤ are omitted.
    ///
    /// When phase 2 was skipped every reachable fact is reported with ⊥.
    pub fn results_at(&self, stmt: &N) -> FxHashMap<D, L> {
        if !self.values_computed {
            return self
                .ifds_results_at(stmt)
                .into_iter()
                .map(|d| (d, L::bottom()))
                .collect();
        }
        self.values
            .get(stmt)
            .map(|facts| {
                facts
                    .iter()
                    .filter(|(_, v)| !v.is_top())
                    .map(|(d, v)| (d.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Facts reaching `stmt` (non-`AllTop` jump function), including the zero fact.
    pub fn ifds_results_at(&self, stmt: &N) -> FxHashSet<D> {
        self.reachable.get(stmt).cloned().unwrap_or_default()
    }

    /// Value of `fact` at `stmt`; ⊤ if the pair was never reached.
    pub fn value_at(&self, stmt: &N, fact: &D) -> L {
        if !self.values_computed {
            return match self.reachable.get(stmt) {
                Some(facts) if facts.contains(fact) => L::bottom(),
                _ => L::top(),
            };
        }
        self.values
            .get(stmt)
            .and_then(|facts| facts.get(fact))
            .cloned()
            .unwrap_or_else(L::top)
    }

    /// Statements where `fact` holds.
    pub fn statements_with_fact(&self, fact: &D) -> Vec<N> {
        self.reachable
            .iter()
            .filter(|(_, facts)| facts.contains(fact))
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Every reached statement with its non-⊤ facts.
    pub fn all_results(&self) -> FxHashMap<N, FxHashMap<D, L>> {
        self.reachable
            .keys()
            .map(|n| (n.clone(), self.results_at(n)))
            .filter(|(_, facts)| !facts.is_empty())
            .collect()
    }

    pub fn has_fact(&self, stmt: &N, fact: &D) -> bool {
        self.reachable
            .get(stmt)
            .is_some_and(|facts| facts.contains(fact))
    }

    pub fn zero_value(&self) -> &D {
        &self.zero
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    /// Recorded exploded supergraph, if `record_exploded_edges` was set.
    pub fn exploded_supergraph(&self) -> Option<&ExplodedSupergraph<N, D>> {
        self.exploded.as_ref()
    }

    /// Number of summarized (start point, entry fact) pairs.
    pub fn end_summaries_count(&self) -> usize {
        self.end_summaries
    }

    pub fn teardown_report(&self) -> &TeardownReport {
        &self.teardown
    }

    pub fn values_computed(&self) -> bool {
        self.values_computed
    }

    pub fn num_statements(&self) -> usize {
        self.reachable.len()
    }
}
