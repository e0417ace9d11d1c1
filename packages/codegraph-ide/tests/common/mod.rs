//! Shared fixtures for solver integration tests
//!
//! - `TaintProblem`: IFDS reachability over variable facts (sources, assignments, kills,
//!   parameter/return binding, hand-written summaries)
//! - `ConstProblem`: IDE constant propagation over `ConstantValue`
//!
//! Statements are plain strings on a `ProgramGraph`.

#![allow(dead_code)]

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use codegraph_ide::domain::flow_function::{Compose, Gen, Identity, Kill, LambdaFlow, Transfer};
use codegraph_ide::{
    ConstantValue, CustomEdgeFunction, EdgeFunction, FlowFunctionPtr, IdeProblem, IfdsProblem,
    ProgramGraph,
};

pub fn s(v: &str) -> String {
    v.to_string()
}

/// Data-flow fact: the zero fact or a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Var {
    Zero,
    Named(String),
}

pub fn var(name: &str) -> Var {
    Var::Named(name.to_string())
}

pub fn facts(items: &[Var]) -> FxHashSet<Var> {
    items.iter().cloned().collect()
}

/// Parameter binding at a call site: caller variable → callee parameter.
fn bind_args(bindings: Vec<(String, String)>) -> FlowFunctionPtr<Var> {
    Arc::new(LambdaFlow::new(move |d: &Var| -> FxHashSet<Var> { match d {
        Var::Named(name) => bindings
            .iter()
            .filter(|(arg, _)| arg == name)
            .map(|(_, param)| Var::Named(param.clone()))
            .collect(),
        Var::Zero => FxHashSet::default(),
    }}))
}

/// Return binding: callee variable → caller variable.
fn bind_return(binding: Option<(String, String)>) -> FlowFunctionPtr<Var> {
    Arc::new(LambdaFlow::new(move |d: &Var| -> FxHashSet<Var> { match (d, &binding) {
        (Var::Named(name), Some((callee_var, caller_var))) if name == callee_var => {
            let mut out = FxHashSet::default();
            out.insert(Var::Named(caller_var.clone()));
            out
        }
        _ => FxHashSet::default(),
    }}))
}

/// Counts every application of `inner`.
fn counted(inner: FlowFunctionPtr<Var>, counter: Arc<AtomicUsize>) -> FlowFunctionPtr<Var> {
    Arc::new(LambdaFlow::new(move |d: &Var| {
        counter.fetch_add(1, Ordering::SeqCst);
        inner.compute_targets(d)
    }))
}

// ═══════════════════════════════════════════════════════════════
// IFDS taint problem
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct TaintProblem {
    pub entries: Vec<String>,
    /// stmt → variable tainted after it
    pub sources: FxHashMap<String, String>,
    /// stmt → (to, from)
    pub assigns: FxHashMap<String, (String, String)>,
    /// stmt → variable overwritten with an untainted value
    pub kills: FxHashMap<String, String>,
    /// call site → (caller var, callee param)
    pub args: FxHashMap<String, Vec<(String, String)>>,
    /// call site → (callee var, caller var)
    pub rets: FxHashMap<String, (String, String)>,
    /// callee → variable its hand-written summary taints
    pub summaries: FxHashMap<String, String>,
    /// Statements whose normal flow applications are counted
    pub counted: FxHashSet<String>,
    pub evaluations: Arc<AtomicUsize>,
    pub normal_flow_requests: Arc<AtomicUsize>,
}

impl TaintProblem {
    pub fn new(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn source(mut self, stmt: &str, v: &str) -> Self {
        self.sources.insert(s(stmt), s(v));
        self
    }

    pub fn assign(mut self, stmt: &str, to: &str, from: &str) -> Self {
        self.assigns.insert(s(stmt), (s(to), s(from)));
        self
    }

    pub fn kill(mut self, stmt: &str, v: &str) -> Self {
        self.kills.insert(s(stmt), s(v));
        self
    }

    pub fn arg(mut self, call_site: &str, caller_var: &str, param: &str) -> Self {
        self.args
            .entry(s(call_site))
            .or_default()
            .push((s(caller_var), s(param)));
        self
    }

    pub fn ret(mut self, call_site: &str, callee_var: &str, caller_var: &str) -> Self {
        self.rets.insert(s(call_site), (s(callee_var), s(caller_var)));
        self
    }

    pub fn summary(mut self, callee: &str, tainted: &str) -> Self {
        self.summaries.insert(s(callee), s(tainted));
        self
    }

    pub fn count_at(mut self, stmt: &str) -> Self {
        self.counted.insert(s(stmt));
        self
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl IfdsProblem<ProgramGraph> for TaintProblem {
    type Fact = Var;

    fn normal_flow(&self, curr: &String, _succ: &String) -> FlowFunctionPtr<Var> {
        self.normal_flow_requests.fetch_add(1, Ordering::SeqCst);
        let mut stages: Vec<FlowFunctionPtr<Var>> = Vec::new();
        if let Some(v) = self.kills.get(curr) {
            stages.push(Arc::new(Kill::new(var(v))));
        }
        if let Some((to, from)) = self.assigns.get(curr) {
            stages.push(Arc::new(Transfer::new(var(to), var(from))));
        }
        if let Some(v) = self.sources.get(curr) {
            stages.push(Arc::new(Gen::new(var(v), Var::Zero)));
        }
        let flow: FlowFunctionPtr<Var> = if stages.is_empty() {
            Identity::ptr()
        } else {
            Arc::new(Compose::new(stages))
        };
        if self.counted.contains(curr) {
            counted(flow, self.evaluations.clone())
        } else {
            flow
        }
    }

    fn call_flow(&self, call_site: &String, _callee: &String) -> FlowFunctionPtr<Var> {
        bind_args(self.args.get(call_site).cloned().unwrap_or_default())
    }

    fn return_flow(
        &self,
        call_site: &String,
        _callee: &String,
        _exit: &String,
        _return_site: &String,
    ) -> FlowFunctionPtr<Var> {
        bind_return(self.rets.get(call_site).cloned())
    }

    fn call_to_return_flow(
        &self,
        call_site: &String,
        _return_site: &String,
        _callees: &[String],
    ) -> FlowFunctionPtr<Var> {
        match self.rets.get(call_site) {
            Some((_, caller_var)) => Arc::new(Kill::new(var(caller_var))) as FlowFunctionPtr<Var>,
            None => Identity::ptr(),
        }
    }

    fn summary_flow(&self, _call_site: &String, callee: &String) -> Option<FlowFunctionPtr<Var>> {
        self.summaries
            .get(callee)
            .map(|v| Arc::new(Gen::new(var(v), Var::Zero)) as FlowFunctionPtr<Var>)
    }

    fn entry_points(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn create_zero_value(&self) -> Var {
        Var::Zero
    }
}

// ═══════════════════════════════════════════════════════════════
// IDE constant propagation
// ═══════════════════════════════════════════════════════════════

/// λv. v + k
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddConst(pub i64);

impl CustomEdgeFunction<ConstantValue> for AddConst {
    fn compute_target(&self, source: &ConstantValue) -> ConstantValue {
        match source {
            ConstantValue::Constant(v) => ConstantValue::Constant(v.wrapping_add(self.0)),
            other => *other,
        }
    }

    fn compose_with(&self, second: &Self) -> Option<Self> {
        Some(AddConst(self.0.wrapping_add(second.0)))
    }
}

pub type ConstEdge = EdgeFunction<ConstantValue, AddConst>;

#[derive(Default)]
pub struct ConstProblem {
    pub entries: Vec<String>,
    /// stmt → (var, k): `var = k`
    pub consts: FxHashMap<String, (String, i64)>,
    /// stmt → (to, from, k): `to = from + k`
    pub adds: FxHashMap<String, (String, String, i64)>,
    pub args: FxHashMap<String, Vec<(String, String)>>,
    pub rets: FxHashMap<String, (String, String)>,
}

impl ConstProblem {
    pub fn new(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn constant(mut self, stmt: &str, v: &str, k: i64) -> Self {
        self.consts.insert(s(stmt), (s(v), k));
        self
    }

    pub fn add(mut self, stmt: &str, to: &str, from: &str, k: i64) -> Self {
        self.adds.insert(s(stmt), (s(to), s(from), k));
        self
    }

    pub fn arg(mut self, call_site: &str, caller_var: &str, param: &str) -> Self {
        self.args
            .entry(s(call_site))
            .or_default()
            .push((s(caller_var), s(param)));
        self
    }

    pub fn ret(mut self, call_site: &str, callee_var: &str, caller_var: &str) -> Self {
        self.rets.insert(s(call_site), (s(callee_var), s(caller_var)));
        self
    }
}

impl IdeProblem<ProgramGraph> for ConstProblem {
    type Fact = Var;
    type Value = ConstantValue;
    type Custom = AddConst;

    fn normal_flow(&self, curr: &String, _succ: &String) -> FlowFunctionPtr<Var> {
        if let Some((v, _)) = self.consts.get(curr) {
            let kill: FlowFunctionPtr<Var> = Arc::new(Kill::new(var(v)));
            let gen: FlowFunctionPtr<Var> = Arc::new(Gen::new(var(v), Var::Zero));
            return Arc::new(Compose::new(vec![kill, gen]));
        }
        if let Some((to, from, _)) = self.adds.get(curr) {
            return Arc::new(Transfer::new(var(to), var(from))) as FlowFunctionPtr<Var>;
        }
        Identity::ptr()
    }

    fn call_flow(&self, call_site: &String, _callee: &String) -> FlowFunctionPtr<Var> {
        bind_args(self.args.get(call_site).cloned().unwrap_or_default())
    }

    fn return_flow(
        &self,
        call_site: &String,
        _callee: &String,
        _exit: &String,
        _return_site: &String,
    ) -> FlowFunctionPtr<Var> {
        bind_return(self.rets.get(call_site).cloned())
    }

    fn call_to_return_flow(
        &self,
        call_site: &String,
        _return_site: &String,
        _callees: &[String],
    ) -> FlowFunctionPtr<Var> {
        match self.rets.get(call_site) {
            Some((_, caller_var)) => Arc::new(Kill::new(var(caller_var))) as FlowFunctionPtr<Var>,
            None => Identity::ptr(),
        }
    }

    fn normal_edge(&self, curr: &String, curr_fact: &Var, _succ: &String, succ_fact: &Var) -> ConstEdge {
        if let Some((v, k)) = self.consts.get(curr) {
            if *curr_fact == Var::Zero && *succ_fact == var(v) {
                return EdgeFunction::constant(ConstantValue::Constant(*k));
            }
        }
        if let Some((to, from, k)) = self.adds.get(curr) {
            if *curr_fact == var(from) && *succ_fact == var(to) {
                return EdgeFunction::custom(AddConst(*k));
            }
        }
        EdgeFunction::Identity
    }

    fn call_edge(&self, _call_site: &String, _src: &Var, _callee: &String, _dest: &Var) -> ConstEdge {
        EdgeFunction::Identity
    }

    fn return_edge(
        &self,
        _call_site: &String,
        _callee: &String,
        _exit: &String,
        _exit_fact: &Var,
        _return_site: &String,
        _ret_fact: &Var,
    ) -> ConstEdge {
        EdgeFunction::Identity
    }

    fn call_to_return_edge(&self, _call_site: &String, _call_fact: &Var, _return_site: &String, _ret_fact: &Var) -> ConstEdge {
        EdgeFunction::Identity
    }

    fn entry_points(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn create_zero_value(&self) -> Var {
        Var::Zero
    }
}

// ═══════════════════════════════════════════════════════════════
// Programs
// ═══════════════════════════════════════════════════════════════

/// main: m0 → c1 (call f) → r1 → r1b → c2 (call f) → r2
/// f:    f0 → f1
pub fn two_call_sites() -> ProgramGraph {
    ProgramGraph::builder()
        .procedure("main", &["m0", "c1", "r1", "r1b", "c2", "r2"])
        .procedure("f", &["f0", "f1"])
        .call("c1", "f")
        .call("c2", "f")
        .build()
}

/// main: m0 → m1 (call f) → m2
/// f:    f0 → f1 → f2
pub fn single_call() -> ProgramGraph {
    ProgramGraph::builder()
        .procedure("main", &["m0", "m1", "m2"])
        .procedure("f", &["f0", "f1", "f2"])
        .call("m1", "f")
        .build()
}

/// Straight-line procedure `main` with `len` statements named `s0..`.
pub fn chain(len: usize) -> ProgramGraph {
    let names: Vec<String> = (0..len).map(|i| format!("s{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    ProgramGraph::builder().procedure("main", &refs).build()
}
