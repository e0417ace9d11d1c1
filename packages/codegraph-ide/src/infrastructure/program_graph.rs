/*
 * In-memory ICFG with string statement ids
 *
 * Each procedure is a list of statements chained in order: the first is the start point,
 * the last is an exit. Extra intraprocedural edges (branches, loops) and extra exits can
 * be added on top. A call statement's chain successors are its return sites.
 *
 * Example:
 *   main: m0 → m1 (call f) → m2
 *   f:    f0 → f1
 *
 *   let graph = ProgramGraph::builder()
 *       .procedure("main", &["m0", "m1", "m2"])
 *       .procedure("f", &["f0", "f1"])
 *       .call("m1", "f")
 *       .build();
 */

use rustc_hash::{FxHashMap, FxHashSet};

use crate::domain::icfg::Icfg;

#[derive(Debug, Clone, Default)]
pub struct ProgramGraph {
    method_of: FxHashMap<String, String>,
    successors: FxHashMap<String, Vec<String>>,
    predecessors: FxHashMap<String, Vec<String>>,
    start_points: FxHashMap<String, Vec<String>>,
    exit_points: FxHashMap<String, Vec<String>>,
    exits: FxHashSet<String>,
    callees: FxHashMap<String, Vec<String>>,
    callers: FxHashMap<String, Vec<String>>,
    /// Procedure order of declaration, for deterministic iteration
    procedures: Vec<String>,
}

impl ProgramGraph {
    pub fn builder() -> ProgramGraphBuilder {
        ProgramGraphBuilder::default()
    }

    pub fn procedures(&self) -> &[String] {
        &self.procedures
    }

    /// Number of statements across all procedures.
    pub fn num_statements(&self) -> usize {
        self.method_of.len()
    }

    pub fn contains(&self, stmt: &str) -> bool {
        self.method_of.contains_key(stmt)
    }
}

#[derive(Debug, Default)]
pub struct ProgramGraphBuilder {
    graph: ProgramGraph,
}

impl ProgramGraphBuilder {
    /// Declares procedure `name` with statements chained in order.
    pub fn procedure(mut self, name: &str, statements: &[&str]) -> Self {
        self.add_procedure(name, statements);
        self
    }

    pub fn add_procedure(&mut self, name: &str, statements: &[&str]) {
        let g = &mut self.graph;
        if !g.procedures.iter().any(|p| p == name) {
            g.procedures.push(name.to_string());
        }
        for stmt in statements {
            g.method_of.insert(stmt.to_string(), name.to_string());
        }
        if let (Some(first), Some(last)) = (statements.first(), statements.last()) {
            g.start_points
                .entry(name.to_string())
                .or_default()
                .push(first.to_string());
            g.exit_points
                .entry(name.to_string())
                .or_default()
                .push(last.to_string());
            g.exits.insert(last.to_string());
        }
        for pair in statements.windows(2) {
            Self::link(g, pair[0], pair[1]);
        }
    }

    /// Extra intraprocedural edge.
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.add_normal_edge(from, to);
        self
    }

    pub fn add_normal_edge(&mut self, from: &str, to: &str) {
        Self::link(&mut self.graph, from, to);
    }

    /// Marks `call_site` as a call of `callee`. May be repeated for several callees.
    pub fn call(mut self, call_site: &str, callee: &str) -> Self {
        self.add_call(call_site, callee);
        self
    }

    pub fn add_call(&mut self, call_site: &str, callee: &str) {
        let g = &mut self.graph;
        let callees = g.callees.entry(call_site.to_string()).or_default();
        if !callees.iter().any(|c| c == callee) {
            callees.push(callee.to_string());
            g.callers
                .entry(callee.to_string())
                .or_default()
                .push(call_site.to_string());
        }
    }

    /// Marks an additional exit statement of its procedure (e.g. an early return).
    pub fn exit(mut self, stmt: &str) -> Self {
        let g = &mut self.graph;
        if g.exits.insert(stmt.to_string()) {
            if let Some(method) = g.method_of.get(stmt) {
                g.exit_points
                    .entry(method.clone())
                    .or_default()
                    .push(stmt.to_string());
            }
        }
        self
    }

    fn link(g: &mut ProgramGraph, from: &str, to: &str) {
        let succs = g.successors.entry(from.to_string()).or_default();
        if !succs.iter().any(|s| s == to) {
            succs.push(to.to_string());
            g.predecessors
                .entry(to.to_string())
                .or_default()
                .push(from.to_string());
        }
    }

    pub fn build(self) -> ProgramGraph {
        self.graph
    }
}

impl Icfg for ProgramGraph {
    type Node = String;
    type Method = String;

    fn method_of(&self, n: &String) -> Option<String> {
        self.method_of.get(n).cloned()
    }

    fn predecessors_of(&self, n: &String) -> Vec<String> {
        self.predecessors.get(n).cloned().unwrap_or_default()
    }

    fn successors_of(&self, n: &String) -> Vec<String> {
        if self.is_call_stmt(n) {
            return Vec::new();
        }
        self.successors.get(n).cloned().unwrap_or_default()
    }

    fn is_call_stmt(&self, n: &String) -> bool {
        self.callees.contains_key(n)
    }

    fn is_exit_stmt(&self, n: &String) -> bool {
        self.exits.contains(n)
    }

    fn is_start_point(&self, n: &String) -> bool {
        self.method_of
            .get(n)
            .and_then(|m| self.start_points.get(m))
            .is_some_and(|starts| starts.contains(n))
    }

    fn callees_of_call_at(&self, n: &String) -> Vec<String> {
        self.callees.get(n).cloned().unwrap_or_default()
    }

    fn start_points_of(&self, m: &String) -> Vec<String> {
        self.start_points.get(m).cloned().unwrap_or_default()
    }

    fn exit_points_of(&self, m: &String) -> Vec<String> {
        self.exit_points.get(m).cloned().unwrap_or_default()
    }

    fn return_sites_of_call_at(&self, n: &String) -> Vec<String> {
        if !self.is_call_stmt(n) {
            return Vec::new();
        }
        self.successors.get(n).cloned().unwrap_or_default()
    }

    fn callers_of(&self, m: &String) -> Vec<String> {
        self.callers.get(m).cloned().unwrap_or_default()
    }
}
