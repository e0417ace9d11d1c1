/*
 * Exploded supergraph recording
 *
 * Nodes are (statement, fact) pairs; an edge is recorded for every flow-function target
 * the solver visits, whether or not the jump function changed. Kept only when
 * `SolverConfig::record_exploded_edges` is set, for debugging analyses.
 */

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::hash::Hash;

/// Node in the exploded supergraph: (ICFG node, fact)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExplodedNode<N, D> {
    pub stmt: N,
    pub fact: D,
}

impl<N, D> ExplodedNode<N, D> {
    pub fn new(stmt: N, fact: D) -> Self {
        Self { stmt, fact }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExplodedEdgeKind {
    /// Intra-procedural edge
    Normal,
    /// Call site → callee start point
    Call,
    /// Callee exit → return site
    Return,
    /// Call site → return site, facts the callee leaves alone
    CallToReturn,
    /// Call site → return site through a hand-written summary
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExplodedEdge<N, D> {
    pub from: ExplodedNode<N, D>,
    pub to: ExplodedNode<N, D>,
    pub kind: ExplodedEdgeKind,
}

#[derive(Debug, Clone)]
pub struct ExplodedSupergraph<N, D> {
    nodes: FxHashSet<ExplodedNode<N, D>>,
    edges: FxHashSet<ExplodedEdge<N, D>>,
    successors: FxHashMap<ExplodedNode<N, D>, FxHashSet<ExplodedNode<N, D>>>,
    predecessors: FxHashMap<ExplodedNode<N, D>, FxHashSet<ExplodedNode<N, D>>>,
}

impl<N, D> ExplodedSupergraph<N, D>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            nodes: FxHashSet::default(),
            edges: FxHashSet::default(),
            successors: FxHashMap::default(),
            predecessors: FxHashMap::default(),
        }
    }

    pub fn add_node(&mut self, node: ExplodedNode<N, D>) {
        self.nodes.insert(node);
    }

    /// Adds an edge (and its endpoints). Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: ExplodedNode<N, D>, to: ExplodedNode<N, D>, kind: ExplodedEdgeKind) {
        let edge = ExplodedEdge {
            from: from.clone(),
            to: to.clone(),
            kind,
        };
        if !self.edges.insert(edge) {
            return;
        }
        self.add_node(from.clone());
        self.add_node(to.clone());
        self.successors
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        self.predecessors.entry(to).or_default().insert(from);
    }

    pub fn successors(&self, node: &ExplodedNode<N, D>) -> Option<&FxHashSet<ExplodedNode<N, D>>> {
        self.successors.get(node)
    }

    pub fn predecessors(&self, node: &ExplodedNode<N, D>) -> Option<&FxHashSet<ExplodedNode<N, D>>> {
        self.predecessors.get(node)
    }

    pub fn has_edge(&self, from: &ExplodedNode<N, D>, to: &ExplodedNode<N, D>) -> bool {
        self.successors
            .get(from)
            .is_some_and(|succs| succs.contains(to))
    }

    pub fn edges(&self) -> impl Iterator<Item = &ExplodedEdge<N, D>> {
        self.edges.iter()
    }

    pub fn edges_of_kind(&self, kind: ExplodedEdgeKind) -> impl Iterator<Item = &ExplodedEdge<N, D>> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

impl<N, D> Default for ExplodedSupergraph<N, D>
where
    N: Clone + Eq + Hash,
    D: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
