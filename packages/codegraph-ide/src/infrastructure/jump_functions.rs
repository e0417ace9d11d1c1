/*
 * Jump-function table
 *
 * Path edge (sourceStmt, d1) → (targetStmt, d2), keyed as a 4-tuple, mapped to the join of
 * every edge function discovered along paths between the two exploded nodes.
 *
 * Invariants:
 * - entries are only ever joined, never overwritten
 * - `AllTop` (the implicit value of an undiscovered edge) is never stored
 *
 * Three indexes serve the solver's lookups:
 * - forward: (sourceStmt, d1) → targets (phase 2 call-site values)
 * - reverse: (targetStmt, d2) → sources (return flow into callers)
 * - by target statement (result extraction)
 */

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::domain::edge_function::{CustomEdgeFunction, EdgeFunction};
use crate::domain::lattice::JoinLattice;

/// Edge of the exploded supergraph discovered by tabulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEdge<N, D> {
    pub source_stmt: N,
    pub source_fact: D,
    pub target_stmt: N,
    pub target_fact: D,
}

impl<N, D> PathEdge<N, D> {
    pub fn new(source_stmt: N, source_fact: D, target_stmt: N, target_fact: D) -> Self {
        Self {
            source_stmt,
            source_fact,
            target_stmt,
            target_fact,
        }
    }
}

pub struct JumpFunctions<N, D, L: JoinLattice, C: CustomEdgeFunction<L>> {
    table: FxHashMap<PathEdge<N, D>, EdgeFunction<L, C>>,
    forward: FxHashMap<(N, D), FxHashSet<(N, D)>>,
    reverse: FxHashMap<(N, D), FxHashSet<(N, D)>>,
    by_target: FxHashMap<N, FxHashSet<(N, D, D)>>,
}

impl<N, D, L, C> JumpFunctions<N, D, L, C>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
    L: JoinLattice,
    C: CustomEdgeFunction<L>,
{
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
            forward: FxHashMap::default(),
            reverse: FxHashMap::default(),
            by_target: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Stored function, `None` meaning `AllTop`.
    pub fn get(&self, edge: &PathEdge<N, D>) -> Option<&EdgeFunction<L, C>> {
        self.table.get(edge)
    }

    pub fn get_or_top(&self, edge: &PathEdge<N, D>) -> EdgeFunction<L, C> {
        self.table.get(edge).cloned().unwrap_or(EdgeFunction::AllTop)
    }

    /// Joins `function` into the entry for `edge`. Returns `true` if the stored function
    /// changed, which is exactly when the edge must be (re)scheduled.
    pub fn join_in(&mut self, edge: &PathEdge<N, D>, function: &EdgeFunction<L, C>) -> bool {
        let joined = match self.table.get(edge) {
            Some(existing) => {
                let joined = existing.join_with(function);
                if joined == *existing {
                    return false;
                }
                joined
            }
            None => function.clone(),
        };
        if joined.is_all_top() {
            return false;
        }
        if !self.table.contains_key(edge) {
            self.index(edge);
        }
        self.table.insert(edge.clone(), joined);
        true
    }

    fn index(&mut self, edge: &PathEdge<N, D>) {
        let source = (edge.source_stmt.clone(), edge.source_fact.clone());
        let target = (edge.target_stmt.clone(), edge.target_fact.clone());
        self.forward
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.reverse.entry(target).or_default().insert(source);
        self.by_target
            .entry(edge.target_stmt.clone())
            .or_default()
            .insert((
                edge.source_stmt.clone(),
                edge.source_fact.clone(),
                edge.target_fact.clone(),
            ));
    }

    /// Path edges reaching `(target_stmt, target_fact)`: `(source_stmt, source_fact, f)`.
    pub fn reverse_lookup(&self, target_stmt: &N, target_fact: &D) -> Vec<(N, D, EdgeFunction<L, C>)> {
        let key = (target_stmt.clone(), target_fact.clone());
        let Some(sources) = self.reverse.get(&key) else {
            return Vec::new();
        };
        sources
            .iter()
            .filter_map(|(sn, sd)| {
                let edge = PathEdge::new(sn.clone(), sd.clone(), target_stmt.clone(), target_fact.clone());
                self.table.get(&edge).map(|f| (sn.clone(), sd.clone(), f.clone()))
            })
            .collect()
    }

    /// Path edges leaving `(source_stmt, source_fact)`: `(target_stmt, target_fact, f)`.
    pub fn forward_lookup(&self, source_stmt: &N, source_fact: &D) -> Vec<(N, D, EdgeFunction<L, C>)> {
        let key = (source_stmt.clone(), source_fact.clone());
        let Some(targets) = self.forward.get(&key) else {
            return Vec::new();
        };
        targets
            .iter()
            .filter_map(|(tn, td)| {
                let edge = PathEdge::new(source_stmt.clone(), source_fact.clone(), tn.clone(), td.clone());
                self.table.get(&edge).map(|f| (tn.clone(), td.clone(), f.clone()))
            })
            .collect()
    }

    /// Path edges ending at statement `target_stmt`: `(source_stmt, source_fact, target_fact, f)`.
    pub fn lookup_by_target(&self, target_stmt: &N) -> Vec<(N, D, D, EdgeFunction<L, C>)> {
        let Some(entries) = self.by_target.get(target_stmt) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|(sn, sd, td)| {
                let edge = PathEdge::new(sn.clone(), sd.clone(), target_stmt.clone(), td.clone());
                self.table
                    .get(&edge)
                    .map(|f| (sn.clone(), sd.clone(), td.clone(), f.clone()))
            })
            .collect()
    }

    /// Facts reaching `target_stmt` along at least one path.
    pub fn facts_at(&self, target_stmt: &N) -> FxHashSet<D> {
        self.by_target
            .get(target_stmt)
            .map(|entries| entries.iter().map(|(_, _, d)| d.clone()).collect())
            .unwrap_or_default()
    }

    /// Every statement that is the target of a path edge.
    pub fn target_statements(&self) -> impl Iterator<Item = &N> {
        self.by_target.keys()
    }
}

impl<N, D, L, C> Default for JumpFunctions<N, D, L, C>
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge_function::NoCustom;
    use crate::domain::lattice::ConstantValue;

    type Table = JumpFunctions<&'static str, &'static str, ConstantValue, NoCustom>;
    type Ef = EdgeFunction<ConstantValue>;

    fn edge(sn: &'static str, sd: &'static str, tn: &'static str, td: &'static str) -> PathEdge<&'static str, &'static str> {
        PathEdge::new(sn, sd, tn, td)
    }

    #[test]
    fn test_all_top_never_stored() {
        let mut table = Table::new();
        assert!(!table.join_in(&edge("s", "0", "n", "x"), &Ef::AllTop));
        assert!(table.is_empty());
        assert!(table.get_or_top(&edge("s", "0", "n", "x")).is_all_top());
    }

    #[test]
    fn test_join_in_reports_change_only_once() {
        let mut table = Table::new();
        let e = edge("s", "0", "n", "x");
        assert!(table.join_in(&e, &Ef::Identity));
        assert!(!table.join_in(&e, &Ef::Identity));
        assert!(!table.join_in(&e, &Ef::AllTop));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_entries_only_weaken() {
        let mut table = Table::new();
        let e = edge("s", "0", "n", "x");
        assert!(table.join_in(&e, &Ef::constant(ConstantValue::Constant(1))));
        assert!(table.join_in(&e, &Ef::constant(ConstantValue::Constant(2))));
        assert!(table.get(&e).unwrap().is_all_bottom());
        // nothing can move an AllBottom entry
        assert!(!table.join_in(&e, &Ef::constant(ConstantValue::Constant(3))));
        assert!(!table.join_in(&e, &Ef::Identity));
    }

    #[test]
    fn test_indexes() {
        let mut table = Table::new();
        table.join_in(&edge("s", "0", "n", "x"), &Ef::Identity);
        table.join_in(&edge("s", "0", "n", "y"), &Ef::AllBottom);
        table.join_in(&edge("t", "a", "n", "x"), &Ef::Identity);

        let mut forward: Vec<_> = table
            .forward_lookup(&"s", &"0")
            .into_iter()
            .map(|(n, d, _)| (n, d))
            .collect();
        forward.sort();
        assert_eq!(forward, vec![("n", "x"), ("n", "y")]);

        let mut reverse: Vec<_> = table
            .reverse_lookup(&"n", &"x")
            .into_iter()
            .map(|(n, d, _)| (n, d))
            .collect();
        reverse.sort();
        assert_eq!(reverse, vec![("s", "0"), ("t", "a")]);

        assert_eq!(table.lookup_by_target(&"n").len(), 3);
        assert_eq!(table.facts_at(&"n").len(), 2);
        assert!(table.facts_at(&"missing").is_empty());
    }
}
