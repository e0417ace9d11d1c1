/*
 * Procedure summaries (Naeem, Lhoták, Rodriguez 2010)
 *
 * EndSummary: (callee start point, entry fact) → (exit statement, exit fact) → edge function
 *   The effect of one complete traversal of a procedure under one entry fact. Call sites
 *   that enter a callee with an already summarized fact apply it at their return sites
 *   instead of re-entering the callee.
 *
 * Incoming: (callee start point, entry fact) → call site → caller facts
 *   Records which callers entered the callee with which fact, so exits can return to
 *   exactly those callers without inverting call flow functions.
 *
 * Keys carry no call-string, so reuse is context-insensitive. This is sound for the
 * tabulation because path edges themselves are context-free.
 */

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::domain::edge_function::{CustomEdgeFunction, EdgeFunction};
use crate::domain::lattice::JoinLattice;

/// Exit effect of a summarized procedure: (exit statement, exit fact, edge function).
pub type SummaryEntry<N, D, L, C> = (N, D, EdgeFunction<L, C>);

pub struct EndSummaries<N, D, L: JoinLattice, C: CustomEdgeFunction<L>> {
    table: FxHashMap<(N, D), FxHashMap<(N, D), EdgeFunction<L, C>>>,
    edges: usize,
}

impl<N, D, L, C> EndSummaries<N, D, L, C>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
    L: JoinLattice,
    C: CustomEdgeFunction<L>,
{
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
            edges: 0,
        }
    }

    /// Summary for `callee_start` entered with `entry_fact`, `None` if the pair has not
    /// reached an exit yet.
    pub fn try_get_summary(&self, callee_start: &N, entry_fact: &D) -> Option<Vec<SummaryEntry<N, D, L, C>>> {
        let key = (callee_start.clone(), entry_fact.clone());
        self.table.get(&key).map(|exits| {
            exits
                .iter()
                .map(|((exit, d), f)| (exit.clone(), d.clone(), f.clone()))
                .collect()
        })
    }

    /// Records or strengthens one exit of a summary. Re-recording joins the previous and
    /// new edge functions. Returns `true` if anything changed.
    pub fn record_summary(
        &mut self,
        callee_start: &N,
        entry_fact: &D,
        exit: &N,
        exit_fact: &D,
        function: &EdgeFunction<L, C>,
    ) -> bool {
        if function.is_all_top() {
            return false;
        }
        let exits = self
            .table
            .entry((callee_start.clone(), entry_fact.clone()))
            .or_default();
        match exits.get_mut(&(exit.clone(), exit_fact.clone())) {
            Some(existing) => {
                let joined = existing.join_with(function);
                if joined == *existing {
                    return false;
                }
                *existing = joined;
                true
            }
            None => {
                exits.insert((exit.clone(), exit_fact.clone()), function.clone());
                self.edges += 1;
                true
            }
        }
    }

    /// Number of summarized (start point, entry fact) pairs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of distinct (entry, exit) summary edges.
    pub fn edge_count(&self) -> usize {
        self.edges
    }
}

impl<N, D, L, C> Default for EndSummaries<N, D, L, C>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
    L: JoinLattice,
    C: CustomEdgeFunction<L>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct IncomingTable<N, D> {
    table: FxHashMap<(N, D), FxHashMap<N, FxHashSet<D>>>,
}

impl<N, D> IncomingTable<N, D>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
        }
    }

    /// Returns `true` if the (call site, caller fact) pair is new for this callee entry.
    pub fn add_incoming(&mut self, callee_start: &N, entry_fact: &D, call_site: &N, caller_fact: &D) -> bool {
        self.table
            .entry((callee_start.clone(), entry_fact.clone()))
            .or_default()
            .entry(call_site.clone())
            .or_default()
            .insert(caller_fact.clone())
    }

    /// Callers that entered `callee_start` with `entry_fact`: call site → caller facts.
    pub fn incoming(&self, callee_start: &N, entry_fact: &D) -> Vec<(N, Vec<D>)> {
        let key = (callee_start.clone(), entry_fact.clone());
        self.table
            .get(&key)
            .map(|sites| {
                sites
                    .iter()
                    .map(|(c, facts)| (c.clone(), facts.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<N, D> Default for IncomingTable<N, D>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge_function::NoCustom;
    use crate::domain::lattice::ConstantValue;

    type Summaries = EndSummaries<&'static str, &'static str, ConstantValue, NoCustom>;
    type Ef = EdgeFunction<ConstantValue>;

    #[test]
    fn test_missing_summary() {
        let summaries = Summaries::new();
        assert!(summaries.try_get_summary(&"f:0", &"0").is_none());
    }

    #[test]
    fn test_record_then_lookup() {
        let mut summaries = Summaries::new();
        assert!(summaries.record_summary(&"f:0", &"0", &"f:2", &"r", &Ef::Identity));
        let summary = summaries.try_get_summary(&"f:0", &"0").unwrap();
        assert_eq!(summary, vec![("f:2", "r", Ef::Identity)]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries.edge_count(), 1);
    }

    #[test]
    fn test_rerecord_joins() {
        let mut summaries = Summaries::new();
        let one = Ef::constant(ConstantValue::Constant(1));
        let two = Ef::constant(ConstantValue::Constant(2));
        assert!(summaries.record_summary(&"f:0", &"0", &"f:2", &"r", &one));
        assert!(!summaries.record_summary(&"f:0", &"0", &"f:2", &"r", &one));
        assert!(summaries.record_summary(&"f:0", &"0", &"f:2", &"r", &two));
        let summary = summaries.try_get_summary(&"f:0", &"0").unwrap();
        assert!(summary[0].2.is_all_bottom());
        assert_eq!(summaries.edge_count(), 1);
    }

    #[test]
    fn test_all_top_summary_ignored() {
        let mut summaries = Summaries::new();
        assert!(!summaries.record_summary(&"f:0", &"0", &"f:2", &"r", &Ef::AllTop));
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_incoming() {
        let mut incoming: IncomingTable<&str, &str> = IncomingTable::new();
        assert!(incoming.add_incoming(&"f:0", &"p", &"main:1", &"x"));
        assert!(!incoming.add_incoming(&"f:0", &"p", &"main:1", &"x"));
        assert!(incoming.add_incoming(&"f:0", &"p", &"main:4", &"y"));
        assert!(incoming.incoming(&"f:0", &"q").is_empty());

        let mut sites = incoming.incoming(&"f:0", &"p");
        sites.sort();
        assert_eq!(sites, vec![("main:1", vec!["x"]), ("main:4", vec!["y"])]);
    }
}
