/*
 * IDE Solver (Sagiv, Reps, Horwitz 1996; Naeem, Lhoták, Rodriguez 2010)
 *
 * Phase 1 (tabulation):
 *   Worklist of path edges (sp, d1) → (n, d2). Each pop dispatches on the kind of n:
 *   - call: call-to-return flow, call flow into the callees (or a hand-written summary),
 *     and direct application of existing end summaries
 *   - exit: record the end summary, return into every caller in the incoming table
 *   - otherwise (and exits with successors): normal flow
 *   Jump functions are only ever joined; an edge is rescheduled only when its jump
 *   function changed.
 *
 * Phase 2 (value propagation):
 *   2a: push seed values through call sites into callee start points until stable
 *   2b: every other (n, d) gets the join of its jump functions applied to the values at
 *       their sources
 *
 * A run is single-threaded and owns all of its tables. Independent solver instances
 * can run on separate threads.
 */

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::{SolverConfig, Validatable};
use crate::domain::edge_function::EdgeFunction;
use crate::domain::icfg::Icfg;
use crate::domain::lattice::{BinaryDomain, JoinLattice};
use crate::domain::problem::{EdgeFn, IdeProblem, IfdsAdapter, IfdsProblem, Seeds};
use crate::errors::{Result, SolverError, SolverPhase};
use crate::infrastructure::exploded_graph::{ExplodedEdgeKind, ExplodedNode, ExplodedSupergraph};
use crate::infrastructure::function_cache::{EdgeKey, FlowHandle, FlowKey, FunctionCache};
use crate::infrastructure::jump_functions::{JumpFunctions, PathEdge};
use crate::infrastructure::results::IdeResults;
use crate::infrastructure::run_context::RunContext;
use crate::infrastructure::summaries::{EndSummaries, IncomingTable};
use crate::shared::macros::hot_trace;

/// Results of an IDE run over `I` and `P`.
pub type SolverResults<I, P> = IdeResults<<I as Icfg>::Node, <P as IdeProblem<I>>::Fact, <P as IdeProblem<I>>::Value>;

type ValueMap<N, D, L> = FxHashMap<N, FxHashMap<D, L>>;

pub struct IdeSolver<'a, I: Icfg, P: IdeProblem<I>> {
    icfg: &'a I,
    problem: &'a P,
    ctx: RunContext<P::Fact>,

    jump: JumpFunctions<I::Node, P::Fact, P::Value, P::Custom>,
    end_summaries: EndSummaries<I::Node, P::Fact, P::Value, P::Custom>,
    incoming: IncomingTable<I::Node, P::Fact>,
    cache: FunctionCache<I::Node, I::Method, P::Fact, P::Value, P::Custom>,

    worklist: VecDeque<PathEdge<I::Node, P::Fact>>,
    /// Return sites reached by unbalanced returns; seeded with the zero fact in phase 2
    unbalanced_return_sites: FxHashSet<I::Node>,
    exploded: Option<ExplodedSupergraph<I::Node, P::Fact>>,
}

impl<'a, I: Icfg, P: IdeProblem<I>> IdeSolver<'a, I, P> {
    pub fn new(icfg: &'a I, problem: &'a P, config: SolverConfig) -> Self {
        let zero = problem.create_zero_value();
        let exploded = config.record_exploded_edges.then(ExplodedSupergraph::new);
        let mut cache = FunctionCache::new();
        for shared in problem.singleton_flow_functions() {
            cache.register_singleton(shared);
        }
        Self {
            icfg,
            problem,
            ctx: RunContext::new(zero, config),
            jump: JumpFunctions::new(),
            end_summaries: EndSummaries::new(),
            incoming: IncomingTable::new(),
            cache,
            worklist: VecDeque::new(),
            unbalanced_return_sites: FxHashSet::default(),
            exploded,
        }
    }

    /// Runs phase 1 and, if `compute_values` is set, phase 2.
    ///
    /// Consumes the solver: a second solve needs a fresh instance. Configuration errors
    /// are returned before any worklist processing; an exceeded iteration cap or time
    /// budget discards the partial tables.
    pub fn solve(mut self) -> Result<SolverResults<I, P>> {
        self.ctx.restart();
        self.ctx.config.validate()?;

        let seeds = self.collect_seeds()?;
        if seeds.is_empty() {
            if self.ctx.config.require_entry_points {
                return Err(SolverError::NoEntryPoints);
            }
            warn!("IDE solver started without seeds, result is empty");
            let values = self.ctx.config.compute_values.then(FxHashMap::default);
            return Ok(self.into_results(values));
        }
        if self.ctx.config.validate_icfg {
            self.validate_reachable_calls(&seeds)?;
        }

        info!(
            seed_statements = seeds.len(),
            "IDE phase 1: tabulating path edges"
        );
        self.submit_initial_seeds(&seeds);
        self.ctx.begin_phase();
        self.run_tabulation()?;
        info!(
            iterations = self.ctx.stats.iterations,
            path_edges = self.jump.len(),
            end_summaries = self.end_summaries.len(),
            "IDE phase 1 complete"
        );

        let values = if self.ctx.config.compute_values {
            info!("IDE phase 2: propagating values");
            self.ctx.begin_phase();
            let values = self.compute_values(&seeds)?;
            info!(
                value_propagations = self.ctx.stats.value_propagations,
                "IDE phase 2 complete"
            );
            Some(values)
        } else {
            None
        };

        Ok(self.into_results(values))
    }

    // ═══════════════════════════════════════════════════════════════
    // Seeding
    // ═══════════════════════════════════════════════════════════════

    fn collect_seeds(&self) -> Result<Seeds<I::Node, P::Fact, P::Value>> {
        let mut seeds = self.problem.initial_seeds(self.ctx.zero());
        seeds.retain(|_, facts| !facts.is_empty());
        if self.ctx.config.auto_add_zero {
            for facts in seeds.values_mut() {
                facts
                    .entry(self.ctx.zero().clone())
                    .or_insert_with(|| self.problem.bottom_element());
            }
        }
        if let Some(unknown) = seeds.keys().find(|n| self.icfg.method_of(n).is_none()) {
            return Err(SolverError::UnknownSeedStatement {
                statement: format!("{:?}", unknown),
            });
        }
        Ok(seeds)
    }

    /// Walks everything reachable from the seeds and rejects call sites the tabulation
    /// could not complete.
    fn validate_reachable_calls(&mut self, seeds: &Seeds<I::Node, P::Fact, P::Value>) -> Result<()> {
        let icfg = self.icfg;
        let mut visited: FxHashSet<I::Node> = FxHashSet::default();
        let mut queue: VecDeque<I::Node> = seeds.keys().cloned().collect();

        while let Some(n) = queue.pop_front() {
            if !visited.insert(n.clone()) {
                continue;
            }
            if !icfg.is_call_stmt(&n) {
                queue.extend(icfg.successors_of(&n));
                continue;
            }
            let return_sites = icfg.return_sites_of_call_at(&n);
            if return_sites.is_empty() {
                return Err(SolverError::dangling_call_site(&n, "call has no return site"));
            }
            for callee in icfg.callees_of_call_at(&n) {
                if self.summary_flow(&n, &callee).is_some() {
                    continue;
                }
                let starts = icfg.start_points_of(&callee);
                if starts.is_empty() {
                    return Err(SolverError::dangling_call_site(
                        &n,
                        format!("callee {:?} has no start point", callee),
                    ));
                }
                queue.extend(starts);
            }
            queue.extend(return_sites);
        }
        debug!(statements = visited.len(), "ICFG validated");
        Ok(())
    }

    fn submit_initial_seeds(&mut self, seeds: &Seeds<I::Node, P::Fact, P::Value>) {
        for (stmt, facts) in seeds {
            for fact in facts.keys() {
                if let Some(graph) = self.exploded.as_mut() {
                    graph.add_node(ExplodedNode::new(stmt.clone(), fact.clone()));
                }
                self.propagate(stmt, fact, stmt, fact, EdgeFunction::Identity, None);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Phase 1: tabulation
    // ═══════════════════════════════════════════════════════════════

    fn run_tabulation(&mut self) -> Result<()> {
        while let Some(edge) = self.worklist.pop_front() {
            self.ctx.step(SolverPhase::Tabulation)?;
            self.ctx.stats.iterations += 1;

            let f = self.jump.get_or_top(&edge);
            let n = &edge.target_stmt;
            if self.icfg.is_call_stmt(n) {
                debug!(stmt = ?n, fact = ?edge.target_fact, "Processing call edge");
                self.process_call(&edge, &f);
                continue;
            }
            if self.icfg.is_exit_stmt(n) {
                debug!(stmt = ?n, fact = ?edge.target_fact, "Processing exit edge");
                self.process_exit(&edge, &f);
            }
            let successors = self.icfg.successors_of(n);
            if !successors.is_empty() {
                debug!(stmt = ?n, fact = ?edge.target_fact, "Processing normal edge");
                self.process_normal(&edge, &f, successors);
            }
        }
        Ok(())
    }

    fn process_normal(&mut self, edge: &PathEdge<I::Node, P::Fact>, f: &EdgeFn<P, I>, successors: Vec<I::Node>) {
        let problem = self.problem;
        let (sp, d1, n, d2) = (&edge.source_stmt, &edge.source_fact, &edge.target_stmt, &edge.target_fact);

        for m in successors {
            let flow = self.cache.get_or_create_flow(
                FlowKey::Normal { curr: n.clone(), succ: m.clone() },
                || problem.normal_flow(n, &m),
            );
            for d3 in self.targets(flow, d2) {
                let e = self.edge_function(
                    EdgeKey::Normal(n.clone(), d2.clone(), m.clone(), d3.clone()),
                    || problem.normal_edge(n, d2, &m, &d3),
                );
                self.propagate(sp, d1, &m, &d3, f.compose_with(&e), Some((n, d2, ExplodedEdgeKind::Normal)));
            }
        }
    }

    fn process_call(&mut self, edge: &PathEdge<I::Node, P::Fact>, f: &EdgeFn<P, I>) {
        let (icfg, problem) = (self.icfg, self.problem);
        let (sp, d1, call_site, d2) = (&edge.source_stmt, &edge.source_fact, &edge.target_stmt, &edge.target_fact);
        let return_sites = icfg.return_sites_of_call_at(call_site);
        let callees = icfg.callees_of_call_at(call_site);

        for callee in &callees {
            if let Some(summary) = self.summary_flow(call_site, callee) {
                for r in &return_sites {
                    for d3 in self.targets(summary, d2) {
                        let e = self.edge_function(
                            EdgeKey::Summary(call_site.clone(), d2.clone(), r.clone(), d3.clone()),
                            || problem.summary_edge(call_site, d2, r, &d3),
                        );
                        self.propagate(sp, d1, r, &d3, f.compose_with(&e), Some((call_site, d2, ExplodedEdgeKind::Summary)));
                    }
                }
                continue;
            }

            let call_flow = self.call_flow(call_site, callee);
            let entry_facts = self.targets(call_flow, d2);
            for start in icfg.start_points_of(callee) {
                for d3 in &entry_facts {
                    self.incoming.add_incoming(&start, d3, call_site, d2);
                    self.propagate(&start, d3, &start, d3, EdgeFunction::Identity, Some((call_site, d2, ExplodedEdgeKind::Call)));

                    let Some(summary) = self.end_summaries.try_get_summary(&start, d3) else {
                        continue;
                    };
                    self.ctx.stats.summary_reuses += 1;
                    debug!(call_site = ?call_site, callee = ?callee, entry_fact = ?d3, exits = summary.len(), "Reusing end summary");

                    let f4 = self.edge_function(
                        EdgeKey::Call(call_site.clone(), d2.clone(), callee.clone(), d3.clone()),
                        || problem.call_edge(call_site, d2, callee, d3),
                    );
                    for (exit, d4, f_summary) in summary {
                        for r in &return_sites {
                            let return_flow = self.return_flow(call_site, callee, &exit, r);
                            for d5 in self.targets(return_flow, &d4) {
                                let f5 = self.return_edge(call_site, callee, &exit, &d4, r, &d5);
                                let f_prime = f4.compose_with(&f_summary).compose_with(&f5);
                                self.propagate(sp, d1, r, &d5, f.compose_with(&f_prime), Some((&exit, &d4, ExplodedEdgeKind::Return)));
                            }
                        }
                    }
                }
            }
        }

        for r in &return_sites {
            let flow = self.cache.get_or_create_flow(
                FlowKey::CallToReturn { call_site: call_site.clone(), return_site: r.clone() },
                || problem.call_to_return_flow(call_site, r, &callees),
            );
            for d3 in self.targets(flow, d2) {
                let e = self.edge_function(
                    EdgeKey::CallToReturn(call_site.clone(), d2.clone(), r.clone(), d3.clone()),
                    || problem.call_to_return_edge(call_site, d2, r, &d3),
                );
                self.propagate(sp, d1, r, &d3, f.compose_with(&e), Some((call_site, d2, ExplodedEdgeKind::CallToReturn)));
            }
        }
    }

    fn process_exit(&mut self, edge: &PathEdge<I::Node, P::Fact>, f: &EdgeFn<P, I>) {
        let (icfg, problem) = (self.icfg, self.problem);
        let (sp, d1, exit, d2) = (&edge.source_stmt, &edge.source_fact, &edge.target_stmt, &edge.target_fact);
        let Some(method) = icfg.method_of(exit) else {
            return;
        };

        if self.end_summaries.record_summary(sp, d1, exit, d2, f) {
            debug!(start = ?sp, entry_fact = ?d1, exit = ?exit, exit_fact = ?d2, "End summary recorded");
        }

        let callers = self.incoming.incoming(sp, d1);
        for (call_site, caller_facts) in &callers {
            for r in icfg.return_sites_of_call_at(call_site) {
                let return_flow = self.return_flow(call_site, &method, exit, &r);
                for d5 in self.targets(return_flow, d2) {
                    let f5 = self.return_edge(call_site, &method, exit, d2, &r, &d5);
                    for d4 in caller_facts {
                        let f4 = self.edge_function(
                            EdgeKey::Call(call_site.clone(), d4.clone(), method.clone(), d1.clone()),
                            || problem.call_edge(call_site, d4, &method, d1),
                        );
                        let f_prime = f4.compose_with(f).compose_with(&f5);
                        for (caller_sp, d3, f3) in self.jump.reverse_lookup(call_site, d4) {
                            self.propagate(&caller_sp, &d3, &r, &d5, f3.compose_with(&f_prime), Some((exit, d2, ExplodedEdgeKind::Return)));
                        }
                    }
                }
            }
        }

        // unbalanced return: the procedure was entered from a seed, not from a call
        if self.ctx.config.follow_returns_past_seeds && callers.is_empty() && self.problem.is_zero_value(d1) {
            let zero = self.ctx.zero().clone();
            for call_site in icfg.callers_of(&method) {
                for r in icfg.return_sites_of_call_at(&call_site) {
                    let return_flow = self.return_flow(&call_site, &method, exit, &r);
                    for d5 in self.targets(return_flow, d2) {
                        let f5 = self.return_edge(&call_site, &method, exit, d2, &r, &d5);
                        self.unbalanced_return_sites.insert(r.clone());
                        self.propagate(&r, &zero, &r, &d5, f.compose_with(&f5), Some((exit, d2, ExplodedEdgeKind::Return)));
                    }
                }
            }
        }
    }

    /// Joins `f` into the jump function of (source_stmt, source_fact) → (target, target_fact)
    /// and schedules the edge if that changed it.
    fn propagate(
        &mut self,
        source_stmt: &I::Node,
        source_fact: &P::Fact,
        target: &I::Node,
        target_fact: &P::Fact,
        f: EdgeFn<P, I>,
        origin: Option<(&I::Node, &P::Fact, ExplodedEdgeKind)>,
    ) {
        if let (Some(graph), Some((from_stmt, from_fact, kind))) = (self.exploded.as_mut(), origin) {
            graph.add_edge(
                ExplodedNode::new(from_stmt.clone(), from_fact.clone()),
                ExplodedNode::new(target.clone(), target_fact.clone()),
                kind,
            );
        }
        let edge = PathEdge::new(source_stmt.clone(), source_fact.clone(), target.clone(), target_fact.clone());
        if self.jump.join_in(&edge, &f) {
            self.ctx.stats.jump_function_updates += 1;
            hot_trace!(target = ?target, fact = ?target_fact, "Jump function updated");
            self.worklist.push_back(edge);
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Cached function access
    // ═══════════════════════════════════════════════════════════════

    /// Targets of `source` under `flow`, keeping the zero fact alive if configured.
    fn targets(&self, flow: FlowHandle, source: &P::Fact) -> FxHashSet<P::Fact> {
        let mut targets = self.cache.flow(flow).compute_targets(source);
        if self.ctx.config.auto_add_zero && self.problem.is_zero_value(source) {
            targets.insert(source.clone());
        }
        targets
    }

    fn edge_function<F>(&mut self, key: EdgeKey<I::Node, I::Method, P::Fact>, factory: F) -> EdgeFn<P, I>
    where
        F: FnOnce() -> EdgeFn<P, I>,
    {
        let handle = self.cache.get_or_create_edge(key, factory);
        self.cache.edge(handle)
    }

    fn summary_flow(&mut self, call_site: &I::Node, callee: &I::Method) -> Option<FlowHandle> {
        let problem = self.problem;
        self.cache
            .get_or_create_summary_flow(call_site, callee, || problem.summary_flow(call_site, callee))
    }

    fn call_flow(&mut self, call_site: &I::Node, callee: &I::Method) -> FlowHandle {
        let problem = self.problem;
        self.cache.get_or_create_flow(
            FlowKey::Call { call_site: call_site.clone(), callee: callee.clone() },
            || problem.call_flow(call_site, callee),
        )
    }

    fn return_flow(&mut self, call_site: &I::Node, callee: &I::Method, exit: &I::Node, return_site: &I::Node) -> FlowHandle {
        let problem = self.problem;
        self.cache.get_or_create_flow(
            FlowKey::Return {
                call_site: call_site.clone(),
                callee: callee.clone(),
                exit: exit.clone(),
                return_site: return_site.clone(),
            },
            || problem.return_flow(call_site, callee, exit, return_site),
        )
    }

    fn return_edge(
        &mut self,
        call_site: &I::Node,
        callee: &I::Method,
        exit: &I::Node,
        exit_fact: &P::Fact,
        return_site: &I::Node,
        ret_fact: &P::Fact,
    ) -> EdgeFn<P, I> {
        let problem = self.problem;
        self.edge_function(
            EdgeKey::Return {
                call_site: call_site.clone(),
                callee: callee.clone(),
                exit: exit.clone(),
                exit_fact: exit_fact.clone(),
                return_site: return_site.clone(),
                ret_fact: ret_fact.clone(),
            },
            || problem.return_edge(call_site, callee, exit, exit_fact, return_site, ret_fact),
        )
    }

    // ═══════════════════════════════════════════════════════════════
    // Phase 2: value propagation
    // ═══════════════════════════════════════════════════════════════

    fn compute_values(
        &mut self,
        seeds: &Seeds<I::Node, P::Fact, P::Value>,
    ) -> Result<ValueMap<I::Node, P::Fact, P::Value>> {
        let (icfg, problem) = (self.icfg, self.problem);

        // values at path-edge sources: seeds, callee start points, unbalanced return sites
        let mut source_values: FxHashMap<(I::Node, P::Fact), P::Value> = FxHashMap::default();
        let mut worklist: VecDeque<(I::Node, P::Fact)> = VecDeque::new();

        for (stmt, facts) in seeds {
            for (fact, value) in facts {
                let key = (stmt.clone(), fact.clone());
                if Self::join_value(problem, &mut source_values, key.clone(), value) {
                    worklist.push_back(key);
                }
            }
        }
        for r in &self.unbalanced_return_sites {
            let key = (r.clone(), self.ctx.zero().clone());
            if Self::join_value(problem, &mut source_values, key.clone(), &problem.bottom_element()) {
                worklist.push_back(key);
            }
        }

        // 2a: values flow into callee start points through call sites
        while let Some((source, d)) = worklist.pop_front() {
            self.ctx.step(SolverPhase::ValuePropagation)?;
            let value = source_values
                .get(&(source.clone(), d.clone()))
                .cloned()
                .unwrap_or_else(|| problem.top_element());

            for (call_site, d2, f) in self.jump.forward_lookup(&source, &d) {
                if !icfg.is_call_stmt(&call_site) {
                    continue;
                }
                let call_value = f.compute_target(&value);
                if call_value.is_top() {
                    continue;
                }
                for callee in icfg.callees_of_call_at(&call_site) {
                    if self.summary_flow(&call_site, &callee).is_some() {
                        continue;
                    }
                    let call_flow = self.call_flow(&call_site, &callee);
                    for d3 in self.targets(call_flow, &d2) {
                        let e = self.edge_function(
                            EdgeKey::Call(call_site.clone(), d2.clone(), callee.clone(), d3.clone()),
                            || problem.call_edge(&call_site, &d2, &callee, &d3),
                        );
                        let entry_value = e.compute_target(&call_value);
                        for start in icfg.start_points_of(&callee) {
                            let key = (start, d3.clone());
                            if Self::join_value(problem, &mut source_values, key.clone(), &entry_value) {
                                self.ctx.stats.value_propagations += 1;
                                hot_trace!(start = ?key.0, fact = ?key.1, "Start point value updated");
                                worklist.push_back(key);
                            }
                        }
                    }
                }
            }
        }

        // 2b: every reached (n, d) from the values at its sources
        let mut values: ValueMap<I::Node, P::Fact, P::Value> = FxHashMap::default();
        let targets: Vec<I::Node> = self.jump.target_statements().cloned().collect();
        for n in targets {
            self.ctx.step(SolverPhase::ValuePropagation)?;
            let at_n = values.entry(n.clone()).or_default();
            for (source, d1, d2, f) in self.jump.lookup_by_target(&n) {
                let source_value = source_values
                    .get(&(source, d1))
                    .cloned()
                    .unwrap_or_else(|| problem.top_element());
                let v = f.compute_target(&source_value);
                let slot = at_n.entry(d2).or_insert_with(|| problem.top_element());
                *slot = problem.join(slot, &v);
                self.ctx.stats.value_propagations += 1;
            }
        }
        Ok(values)
    }

    /// Joins `value` into `values[key]`; returns `true` if the stored value changed.
    fn join_value<K: Eq + std::hash::Hash>(
        problem: &P,
        values: &mut FxHashMap<K, P::Value>,
        key: K,
        value: &P::Value,
    ) -> bool {
        match values.get_mut(&key) {
            Some(existing) => {
                let joined = problem.join(existing, value);
                if joined == *existing {
                    return false;
                }
                *existing = joined;
                true
            }
            None => {
                if value.is_top() {
                    return false;
                }
                values.insert(key, value.clone());
                true
            }
        }
    }

    fn into_results(mut self, values: Option<ValueMap<I::Node, P::Fact, P::Value>>) -> SolverResults<I, P> {
        let reachable = self
            .jump
            .target_statements()
            .map(|n| (n.clone(), self.jump.facts_at(n)))
            .collect();

        self.ctx.stats.path_edges = self.jump.len();
        self.ctx.stats.summary_edges = self.end_summaries.edge_count();
        self.ctx.stats.absorb_cache(self.cache.statistics());
        let teardown = self.cache.teardown();
        self.ctx.finish();

        info!(
            path_edges = self.ctx.stats.path_edges,
            summary_reuses = self.ctx.stats.summary_reuses,
            analysis_time_ms = self.ctx.stats.analysis_time_ms,
            "IDE solver finished"
        );

        IdeResults {
            values_computed: values.is_some(),
            values: values.unwrap_or_default(),
            reachable,
            statistics: self.ctx.stats.clone(),
            zero: self.ctx.into_zero(),
            exploded: self.exploded,
            end_summaries: self.end_summaries.len(),
            teardown,
        }
    }
}

/// Solves an IFDS problem through [`IfdsAdapter`] (phase 2 is skipped unless configured).
pub fn solve_ifds<I, P>(
    icfg: &I,
    problem: P,
    config: SolverConfig,
) -> Result<IdeResults<I::Node, P::Fact, BinaryDomain>>
where
    I: Icfg,
    P: IfdsProblem<I>,
{
    let adapter = IfdsAdapter::new(problem);
    IdeSolver::new(icfg, &adapter, config).solve()
}
