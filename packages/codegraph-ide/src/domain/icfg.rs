/*
 * Interprocedural control-flow graph contract
 *
 * The solver never inspects statements or procedures; it walks the program only through
 * these queries. Implementations return owned collections so that graph backends with
 * computed adjacency (call-graph resolution, lazily built CFGs) are not forced to keep
 * borrowed storage alive.
 */

use std::fmt::Debug;
use std::hash::Hash;

pub trait Icfg {
    /// Statement (ICFG node)
    type Node: Clone + Eq + Hash + Debug;

    /// Procedure
    type Method: Clone + Eq + Hash + Debug;

    /// Procedure containing `n`, `None` for statements the graph does not know.
    fn method_of(&self, n: &Self::Node) -> Option<Self::Method>;

    fn predecessors_of(&self, n: &Self::Node) -> Vec<Self::Node>;

    /// Intraprocedural successors. Call statements reach their return sites through
    /// `return_sites_of_call_at`, not through this query.
    fn successors_of(&self, n: &Self::Node) -> Vec<Self::Node>;

    fn is_call_stmt(&self, n: &Self::Node) -> bool;

    fn is_exit_stmt(&self, n: &Self::Node) -> bool;

    fn is_start_point(&self, n: &Self::Node) -> bool;

    /// Possible targets of a call (more than one under imprecise call-graph resolution).
    fn callees_of_call_at(&self, n: &Self::Node) -> Vec<Self::Method>;

    fn start_points_of(&self, m: &Self::Method) -> Vec<Self::Node>;

    fn exit_points_of(&self, m: &Self::Method) -> Vec<Self::Node>;

    fn return_sites_of_call_at(&self, n: &Self::Node) -> Vec<Self::Node>;

    /// Call statements that may invoke `m`. Only needed for unbalanced returns.
    fn callers_of(&self, m: &Self::Method) -> Vec<Self::Node>;
}
