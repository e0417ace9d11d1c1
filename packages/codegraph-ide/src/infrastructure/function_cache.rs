/*
 * Per-run flow/edge function cache
 *
 * Every factory of the problem description is called at most once per structural key
 * within a run; later requests receive the same instance back through a handle.
 *
 * Ownership:
 * - non-singleton functions live in one arena per run and are addressed by index
 * - singletons (built-in Identity / KillAll / AllTop / AllBottom, plus instances the
 *   problem declares shared) are never arena indices
 *
 * Teardown drops the arenas once. Singletons are never released by the cache even when
 * they also sit in its lookup tables, because the tables only hold their handles.
 */

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

use crate::domain::edge_function::{CustomEdgeFunction, EdgeFunction};
use crate::domain::flow_function::{Fact, FlowFunction, FlowFunctionPtr, Identity, KillAll};
use crate::domain::lattice::JoinLattice;

/// Handle to a cached flow function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowHandle {
    Identity,
    KillAll,
    /// Index into the singleton registry
    Singleton(usize),
    /// Index into the per-run arena
    Owned(usize),
}

impl FlowHandle {
    pub fn is_singleton(&self) -> bool {
        !matches!(self, Self::Owned(_))
    }
}

/// Handle to a cached edge function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeHandle {
    Identity,
    AllTop,
    AllBottom,
    Owned(usize),
}

impl EdgeHandle {
    pub fn is_singleton(&self) -> bool {
        !matches!(self, Self::Owned(_))
    }
}

/// Structural key of a flow function request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowKey<N, M> {
    Normal { curr: N, succ: N },
    Call { call_site: N, callee: M },
    Return { call_site: N, callee: M, exit: N, return_site: N },
    CallToReturn { call_site: N, return_site: N },
}

/// Structural key of an edge function request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeKey<N, M, D> {
    Normal(N, D, N, D),
    Call(N, D, M, D),
    Return {
        call_site: N,
        callee: M,
        exit: N,
        exit_fact: D,
        return_site: N,
        ret_fact: D,
    },
    CallToReturn(N, D, N, D),
    Summary(N, D, N, D),
}

/// Counters reported in the solver statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub flow_functions_constructed: u64,
    pub flow_cache_hits: u64,
    pub edge_functions_constructed: u64,
    pub edge_cache_hits: u64,
}

/// What teardown released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TeardownReport {
    /// Arena-owned flow functions dropped (each exactly once)
    pub flow_functions_released: usize,
    /// Arena-owned edge functions dropped (each exactly once)
    pub edge_functions_released: usize,
    /// Distinct singleton handles referenced by the lookup tables, left alive
    pub singletons_retained: usize,
}

pub struct FunctionCache<N, M, D: Fact, L: JoinLattice, C: CustomEdgeFunction<L>> {
    flow_keys: FxHashMap<FlowKey<N, M>, FlowHandle>,
    summary_flows: FxHashMap<(N, M), Option<FlowHandle>>,
    flow_arena: Vec<FlowFunctionPtr<D>>,
    singletons: Vec<FlowFunctionPtr<D>>,

    edge_keys: FxHashMap<EdgeKey<N, M, D>, EdgeHandle>,
    edge_arena: Vec<EdgeFunction<L, C>>,

    stats: CacheStatistics,
}

fn same_instance<D: Fact>(a: &FlowFunctionPtr<D>, b: &FlowFunctionPtr<D>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl<N, M, D, L, C> FunctionCache<N, M, D, L, C>
where
    N: Clone + Eq + Hash,
    M: Clone + Eq + Hash,
    D: Fact,
    L: JoinLattice,
    C: CustomEdgeFunction<L>,
{
    pub fn new() -> Self {
        Self {
            flow_keys: FxHashMap::default(),
            summary_flows: FxHashMap::default(),
            flow_arena: Vec::new(),
            singletons: Vec::new(),
            edge_keys: FxHashMap::default(),
            edge_arena: Vec::new(),
            stats: CacheStatistics::default(),
        }
    }

    /// Marks `function` as shared. Factories returning this same instance later get a
    /// singleton handle and the instance never enters the arena.
    pub fn register_singleton(&mut self, function: FlowFunctionPtr<D>) -> FlowHandle {
        if function.is_identity() {
            return FlowHandle::Identity;
        }
        if function.is_kill_all() {
            return FlowHandle::KillAll;
        }
        if let Some(i) = self.singletons.iter().position(|s| same_instance(s, &function)) {
            return FlowHandle::Singleton(i);
        }
        self.singletons.push(function);
        FlowHandle::Singleton(self.singletons.len() - 1)
    }

    fn adopt_flow(&mut self, function: FlowFunctionPtr<D>) -> FlowHandle {
        self.stats.flow_functions_constructed += 1;
        if function.is_identity() {
            return FlowHandle::Identity;
        }
        if function.is_kill_all() {
            return FlowHandle::KillAll;
        }
        if let Some(i) = self.singletons.iter().position(|s| same_instance(s, &function)) {
            return FlowHandle::Singleton(i);
        }
        self.flow_arena.push(function);
        FlowHandle::Owned(self.flow_arena.len() - 1)
    }

    pub fn get_or_create_flow<F>(&mut self, key: FlowKey<N, M>, factory: F) -> FlowHandle
    where
        F: FnOnce() -> FlowFunctionPtr<D>,
    {
        if let Some(handle) = self.flow_keys.get(&key) {
            self.stats.flow_cache_hits += 1;
            return *handle;
        }
        let handle = self.adopt_flow(factory());
        self.flow_keys.insert(key, handle);
        handle
    }

    /// Like `get_or_create_flow`, remembering `None` answers as well.
    pub fn get_or_create_summary_flow<F>(&mut self, call_site: &N, callee: &M, factory: F) -> Option<FlowHandle>
    where
        F: FnOnce() -> Option<FlowFunctionPtr<D>>,
    {
        let key = (call_site.clone(), callee.clone());
        if let Some(handle) = self.summary_flows.get(&key) {
            self.stats.flow_cache_hits += 1;
            return *handle;
        }
        let handle = factory().map(|f| self.adopt_flow(f));
        self.summary_flows.insert(key, handle);
        handle
    }

    pub fn flow(&self, handle: FlowHandle) -> &dyn FlowFunction<D> {
        match handle {
            FlowHandle::Identity => &Identity,
            FlowHandle::KillAll => &KillAll,
            FlowHandle::Singleton(i) => self.singletons[i].as_ref(),
            FlowHandle::Owned(i) => self.flow_arena[i].as_ref(),
        }
    }

    pub fn get_or_create_edge<F>(&mut self, key: EdgeKey<N, M, D>, factory: F) -> EdgeHandle
    where
        F: FnOnce() -> EdgeFunction<L, C>,
    {
        if let Some(handle) = self.edge_keys.get(&key) {
            self.stats.edge_cache_hits += 1;
            return *handle;
        }
        self.stats.edge_functions_constructed += 1;
        let handle = match factory() {
            EdgeFunction::Identity => EdgeHandle::Identity,
            EdgeFunction::AllTop => EdgeHandle::AllTop,
            EdgeFunction::AllBottom => EdgeHandle::AllBottom,
            function => {
                self.edge_arena.push(function);
                EdgeHandle::Owned(self.edge_arena.len() - 1)
            }
        };
        self.edge_keys.insert(key, handle);
        handle
    }

    pub fn edge(&self, handle: EdgeHandle) -> EdgeFunction<L, C> {
        match handle {
            EdgeHandle::Identity => EdgeFunction::Identity,
            EdgeHandle::AllTop => EdgeFunction::AllTop,
            EdgeHandle::AllBottom => EdgeFunction::AllBottom,
            EdgeHandle::Owned(i) => self.edge_arena[i].clone(),
        }
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.stats
    }

    pub fn owned_flow_functions(&self) -> usize {
        self.flow_arena.len()
    }

    pub fn owned_edge_functions(&self) -> usize {
        self.edge_arena.len()
    }

    /// Releases every arena-owned function exactly once.
    pub fn teardown(self) -> TeardownReport {
        let mut retained_flows: FxHashSet<FlowHandle> = self
            .flow_keys
            .values()
            .copied()
            .filter(FlowHandle::is_singleton)
            .collect();
        retained_flows.extend(
            self.summary_flows
                .values()
                .flatten()
                .copied()
                .filter(FlowHandle::is_singleton),
        );
        let retained_edges: FxHashSet<EdgeHandle> = self
            .edge_keys
            .values()
            .copied()
            .filter(EdgeHandle::is_singleton)
            .collect();

        let report = TeardownReport {
            flow_functions_released: self.flow_arena.len(),
            edge_functions_released: self.edge_arena.len(),
            singletons_retained: retained_flows.len() + retained_edges.len(),
        };
        drop(self.flow_arena);
        drop(self.edge_arena);
        debug!(
            flow_functions_released = report.flow_functions_released,
            edge_functions_released = report.edge_functions_released,
            singletons_retained = report.singletons_retained,
            "Function cache torn down"
        );
        report
    }
}

impl<N, M, D, L, C> Default for FunctionCache<N, M, D, L, C>
where
    N: Clone + Eq + Hash,
    M: Clone + Eq + Hash,
    D: Fact,
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
    use crate::domain::flow_function::{Gen, Kill};
    use crate::domain::lattice::ConstantValue;

    type Cache = FunctionCache<&'static str, &'static str, &'static str, ConstantValue, NoCustom>;

    fn normal(curr: &'static str, succ: &'static str) -> FlowKey<&'static str, &'static str> {
        FlowKey::Normal { curr, succ }
    }

    #[test]
    fn test_factory_called_once_per_key() {
        let mut cache = Cache::new();
        let mut calls = 0;
        let first = cache.get_or_create_flow(normal("a", "b"), || {
            calls += 1;
            Arc::new(Gen::new("x", "0"))
        });
        let second = cache.get_or_create_flow(normal("a", "b"), || {
            calls += 1;
            Arc::new(Gen::new("x", "0"))
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert!(matches!(first, FlowHandle::Owned(0)));
        assert_eq!(cache.statistics().flow_cache_hits, 1);
        assert_eq!(cache.flow(first).compute_targets(&"0").len(), 2);
    }

    #[test]
    fn test_handles_are_arena_slots() {
        let mut cache = Cache::new();
        let vars = ["a", "b", "c", "d"];
        let handles: Vec<FlowHandle> = vars
            .windows(2)
            .map(|pair| cache.get_or_create_flow(normal(pair[0], pair[1]), || Arc::new(Kill::new(pair[1]))))
            .collect();
        assert_eq!(handles, vec![FlowHandle::Owned(0), FlowHandle::Owned(1), FlowHandle::Owned(2)]);
        assert_eq!(cache.owned_flow_functions(), 3);
        assert!(cache.flow(handles[2]).compute_targets(&"d").is_empty());

        let e0 = cache.get_or_create_edge(EdgeKey::Normal("a", "x", "b", "x"), || {
            EdgeFunction::constant(ConstantValue::Constant(1))
        });
        let e1 = cache.get_or_create_edge(EdgeKey::Normal("b", "x", "c", "x"), || {
            EdgeFunction::constant(ConstantValue::Constant(2))
        });
        assert_eq!((e0, e1), (EdgeHandle::Owned(0), EdgeHandle::Owned(1)));
        assert_eq!(cache.edge(e1), EdgeFunction::Constant(ConstantValue::Constant(2)));
    }

    #[test]
    fn test_builtin_flow_singletons_skip_arena() {
        let mut cache = Cache::new();
        let id = cache.get_or_create_flow(normal("a", "b"), Identity::ptr);
        let kill = cache.get_or_create_flow(normal("b", "c"), KillAll::ptr);
        assert_eq!(id, FlowHandle::Identity);
        assert_eq!(kill, FlowHandle::KillAll);
        assert_eq!(cache.owned_flow_functions(), 0);
        assert!(cache.flow(id).is_identity());
    }

    #[test]
    fn test_registered_singleton_is_never_released() {
        let mut cache = Cache::new();
        let shared: FlowFunctionPtr<&'static str> = Arc::new(Kill::new("x"));
        let registered = cache.register_singleton(shared.clone());

        // the same instance handed out under two keys
        let h1 = cache.get_or_create_flow(normal("a", "b"), || shared.clone());
        let h2 = cache.get_or_create_flow(normal("b", "c"), || shared.clone());
        let owned = cache.get_or_create_flow(normal("c", "d"), || Arc::new(Kill::new("y")));
        assert_eq!(h1, registered);
        assert_eq!(h2, registered);
        assert!(matches!(owned, FlowHandle::Owned(_)));

        let report = cache.teardown();
        assert_eq!(report.flow_functions_released, 1);
        assert_eq!(report.singletons_retained, 1);
        // the cache dropped nothing it did not own
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_edge_cache() {
        let mut cache = Cache::new();
        let key = EdgeKey::Normal("a", "x", "b", "x");
        let h = cache.get_or_create_edge(key.clone(), || EdgeFunction::constant(ConstantValue::Constant(3)));
        let again = cache.get_or_create_edge(key, || EdgeFunction::Identity);
        assert_eq!(h, again);
        assert_eq!(cache.edge(h), EdgeFunction::Constant(ConstantValue::Constant(3)));

        let bottom = cache.get_or_create_edge(EdgeKey::Normal("a", "0", "b", "x"), || EdgeFunction::AllBottom);
        assert_eq!(bottom, EdgeHandle::AllBottom);

        let stats = cache.statistics();
        assert_eq!(stats.edge_functions_constructed, 2);
        assert_eq!(stats.edge_cache_hits, 1);

        let report = cache.teardown();
        assert_eq!(report.edge_functions_released, 1);
        assert_eq!(report.singletons_retained, 1);
    }

    #[test]
    fn test_summary_flow_none_is_cached() {
        let mut cache = Cache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let handle = cache.get_or_create_summary_flow(&"c", &"f", || {
                calls += 1;
                None
            });
            assert!(handle.is_none());
        }
        assert_eq!(calls, 1);
    }
}
