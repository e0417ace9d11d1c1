/*
 * Problem descriptions
 *
 * An analysis is described by flow-function factories (which facts hold), edge-function
 * factories (how values change along exploded edges), seeds and the zero fact.
 *
 * `IdeProblem` is the full contract consumed by the solver. `IfdsProblem` is the
 * reachability-only subset; `IfdsAdapter` lifts it onto the two-point lattice.
 */

use rustc_hash::{FxHashMap, FxHashSet};

use super::edge_function::{CustomEdgeFunction, EdgeFunction, NoCustom};
use super::flow_function::{Fact, FlowFunctionPtr};
use super::icfg::Icfg;
use super::lattice::{BinaryDomain, JoinLattice};

/// statement → fact → initial value
pub type Seeds<N, D, L> = FxHashMap<N, FxHashMap<D, L>>;

/// Edge function type of a problem.
pub type EdgeFn<P, I> =
    EdgeFunction<<P as IdeProblem<I>>::Value, <P as IdeProblem<I>>::Custom>;

/// IDE problem description.
///
/// Factories may be called more than once for the same key across solver runs, but the
/// per-run function cache calls each of them at most once per key within a run.
pub trait IdeProblem<I: Icfg> {
    type Fact: Fact;
    type Value: JoinLattice;
    type Custom: CustomEdgeFunction<Self::Value>;

    // ═══════════════════════════════════════════════════════════════
    // Flow functions
    // ═══════════════════════════════════════════════════════════════

    fn normal_flow(&self, curr: &I::Node, succ: &I::Node) -> FlowFunctionPtr<Self::Fact>;

    /// Caller facts at `call_site` → facts at the start points of `callee`.
    fn call_flow(&self, call_site: &I::Node, callee: &I::Method) -> FlowFunctionPtr<Self::Fact>;

    /// Facts at `exit` of `callee` → caller facts at `return_site`.
    fn return_flow(
        &self,
        call_site: &I::Node,
        callee: &I::Method,
        exit: &I::Node,
        return_site: &I::Node,
    ) -> FlowFunctionPtr<Self::Fact>;

    /// Facts that survive the call unaffected by the callees.
    fn call_to_return_flow(
        &self,
        call_site: &I::Node,
        return_site: &I::Node,
        callees: &[I::Method],
    ) -> FlowFunctionPtr<Self::Fact>;

    /// Hand-written summary for `callee`. When present the solver applies it (with
    /// `summary_edge`) at the return sites and never descends into `callee`.
    fn summary_flow(
        &self,
        _call_site: &I::Node,
        _callee: &I::Method,
    ) -> Option<FlowFunctionPtr<Self::Fact>> {
        None
    }

    /// Flow functions shared across keys (e.g. one `Arc` handed out for every
    /// assignment-free edge). The cache keeps them outside its per-run arena.
    fn singleton_flow_functions(&self) -> Vec<FlowFunctionPtr<Self::Fact>> {
        Vec::new()
    }

    // ═══════════════════════════════════════════════════════════════
    // Edge functions
    // ═══════════════════════════════════════════════════════════════

    fn normal_edge(
        &self,
        curr: &I::Node,
        curr_fact: &Self::Fact,
        succ: &I::Node,
        succ_fact: &Self::Fact,
    ) -> EdgeFn<Self, I>;

    fn call_edge(
        &self,
        call_site: &I::Node,
        src_fact: &Self::Fact,
        callee: &I::Method,
        dest_fact: &Self::Fact,
    ) -> EdgeFn<Self, I>;

    #[allow(clippy::too_many_arguments)]
    fn return_edge(
        &self,
        call_site: &I::Node,
        callee: &I::Method,
        exit: &I::Node,
        exit_fact: &Self::Fact,
        return_site: &I::Node,
        ret_fact: &Self::Fact,
    ) -> EdgeFn<Self, I>;

    fn call_to_return_edge(
        &self,
        call_site: &I::Node,
        call_fact: &Self::Fact,
        return_site: &I::Node,
        ret_fact: &Self::Fact,
    ) -> EdgeFn<Self, I>;

    /// Edge function paired with `summary_flow`.
    fn summary_edge(
        &self,
        _call_site: &I::Node,
        _call_fact: &Self::Fact,
        _return_site: &I::Node,
        _ret_fact: &Self::Fact,
    ) -> EdgeFn<Self, I> {
        EdgeFunction::Identity
    }

    // ═══════════════════════════════════════════════════════════════
    // Seeds and zero fact
    // ═══════════════════════════════════════════════════════════════

    fn entry_points(&self) -> Vec<I::Node>;

    /// Defaults to every entry point with the zero fact at ⊥.
    fn initial_seeds(&self, zero: &Self::Fact) -> Seeds<I::Node, Self::Fact, Self::Value> {
        self.entry_points()
            .into_iter()
            .map(|n| {
                let mut facts = FxHashMap::default();
                facts.insert(zero.clone(), self.bottom_element());
                (n, facts)
            })
            .collect()
    }

    /// Called once per solver run.
    fn create_zero_value(&self) -> Self::Fact;

    fn is_zero_value(&self, d: &Self::Fact) -> bool {
        *d == self.create_zero_value()
    }

    // ═══════════════════════════════════════════════════════════════
    // Value lattice
    // ═══════════════════════════════════════════════════════════════

    fn top_element(&self) -> Self::Value {
        Self::Value::top()
    }

    fn bottom_element(&self) -> Self::Value {
        Self::Value::bottom()
    }

    fn join(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a.join(b)
    }
}

/// Reachability-only problem description.
pub trait IfdsProblem<I: Icfg> {
    type Fact: Fact;

    fn normal_flow(&self, curr: &I::Node, succ: &I::Node) -> FlowFunctionPtr<Self::Fact>;

    fn call_flow(&self, call_site: &I::Node, callee: &I::Method) -> FlowFunctionPtr<Self::Fact>;

    fn return_flow(
        &self,
        call_site: &I::Node,
        callee: &I::Method,
        exit: &I::Node,
        return_site: &I::Node,
    ) -> FlowFunctionPtr<Self::Fact>;

    fn call_to_return_flow(
        &self,
        call_site: &I::Node,
        return_site: &I::Node,
        callees: &[I::Method],
    ) -> FlowFunctionPtr<Self::Fact>;

    fn summary_flow(
        &self,
        _call_site: &I::Node,
        _callee: &I::Method,
    ) -> Option<FlowFunctionPtr<Self::Fact>> {
        None
    }

    fn singleton_flow_functions(&self) -> Vec<FlowFunctionPtr<Self::Fact>> {
        Vec::new()
    }

    fn entry_points(&self) -> Vec<I::Node>;

    /// Defaults to every entry point with the zero fact.
    fn initial_seeds(&self, zero: &Self::Fact) -> FxHashMap<I::Node, FxHashSet<Self::Fact>> {
        self.entry_points()
            .into_iter()
            .map(|n| {
                let mut facts = FxHashSet::default();
                facts.insert(zero.clone());
                (n, facts)
            })
            .collect()
    }

    fn create_zero_value(&self) -> Self::Fact;

    fn is_zero_value(&self, d: &Self::Fact) -> bool {
        *d == self.create_zero_value()
    }
}

/// Lifts an [`IfdsProblem`] to an IDE problem over [`BinaryDomain`].
///
/// Edges leaving the zero fact are `AllBottom` ("reached"), all others `Identity`, so
/// phase 2 marks every reachable fact with ⊥.
pub struct IfdsAdapter<P> {
    inner: P,
}

impl<P> IfdsAdapter<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    fn edge_from<D, F: Fn(&D) -> bool>(is_zero: F, source: &D) -> EdgeFunction<BinaryDomain> {
        if is_zero(source) {
            EdgeFunction::AllBottom
        } else {
            EdgeFunction::Identity
        }
    }
}

impl<I: Icfg, P: IfdsProblem<I>> IdeProblem<I> for IfdsAdapter<P> {
    type Fact = P::Fact;
    type Value = BinaryDomain;
    type Custom = NoCustom;

    fn normal_flow(&self, curr: &I::Node, succ: &I::Node) -> FlowFunctionPtr<Self::Fact> {
        self.inner.normal_flow(curr, succ)
    }

    fn call_flow(&self, call_site: &I::Node, callee: &I::Method) -> FlowFunctionPtr<Self::Fact> {
        self.inner.call_flow(call_site, callee)
    }

    fn return_flow(
        &self,
        call_site: &I::Node,
        callee: &I::Method,
        exit: &I::Node,
        return_site: &I::Node,
    ) -> FlowFunctionPtr<Self::Fact> {
        self.inner.return_flow(call_site, callee, exit, return_site)
    }

    fn call_to_return_flow(
        &self,
        call_site: &I::Node,
        return_site: &I::Node,
        callees: &[I::Method],
    ) -> FlowFunctionPtr<Self::Fact> {
        self.inner.call_to_return_flow(call_site, return_site, callees)
    }

    fn summary_flow(
        &self,
        call_site: &I::Node,
        callee: &I::Method,
    ) -> Option<FlowFunctionPtr<Self::Fact>> {
        self.inner.summary_flow(call_site, callee)
    }

    fn singleton_flow_functions(&self) -> Vec<FlowFunctionPtr<Self::Fact>> {
        self.inner.singleton_flow_functions()
    }

    fn normal_edge(
        &self,
        _curr: &I::Node,
        curr_fact: &Self::Fact,
        _succ: &I::Node,
        _succ_fact: &Self::Fact,
    ) -> EdgeFunction<BinaryDomain> {
        Self::edge_from(|d| self.inner.is_zero_value(d), curr_fact)
    }

    fn call_edge(
        &self,
        _call_site: &I::Node,
        src_fact: &Self::Fact,
        _callee: &I::Method,
        _dest_fact: &Self::Fact,
    ) -> EdgeFunction<BinaryDomain> {
        Self::edge_from(|d| self.inner.is_zero_value(d), src_fact)
    }

    fn return_edge(
        &self,
        _call_site: &I::Node,
        _callee: &I::Method,
        _exit: &I::Node,
        exit_fact: &Self::Fact,
        _return_site: &I::Node,
        _ret_fact: &Self::Fact,
    ) -> EdgeFunction<BinaryDomain> {
        Self::edge_from(|d| self.inner.is_zero_value(d), exit_fact)
    }

    fn call_to_return_edge(
        &self,
        _call_site: &I::Node,
        call_fact: &Self::Fact,
        _return_site: &I::Node,
        _ret_fact: &Self::Fact,
    ) -> EdgeFunction<BinaryDomain> {
        Self::edge_from(|d| self.inner.is_zero_value(d), call_fact)
    }

    fn summary_edge(
        &self,
        _call_site: &I::Node,
        call_fact: &Self::Fact,
        _return_site: &I::Node,
        _ret_fact: &Self::Fact,
    ) -> EdgeFunction<BinaryDomain> {
        Self::edge_from(|d| self.inner.is_zero_value(d), call_fact)
    }

    fn entry_points(&self) -> Vec<I::Node> {
        self.inner.entry_points()
    }

    fn initial_seeds(&self, zero: &Self::Fact) -> Seeds<I::Node, Self::Fact, BinaryDomain> {
        self.inner
            .initial_seeds(zero)
            .into_iter()
            .map(|(n, facts)| {
                let values = facts
                    .into_iter()
                    .map(|d| (d, BinaryDomain::Bottom))
                    .collect();
                (n, values)
            })
            .collect()
    }

    fn create_zero_value(&self) -> Self::Fact {
        self.inner.create_zero_value()
    }

    fn is_zero_value(&self, d: &Self::Fact) -> bool {
        self.inner.is_zero_value(d)
    }
}
