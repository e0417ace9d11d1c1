/*
 * Edge-function algebra (IDE micro-functions)
 *
 * An edge function maps the lattice value of a source exploded node to the value of a
 * target exploded node. Edge functions form a monoid under `compose_with` (sequential
 * application, identity = `Identity`) and a semi-lattice under `join_with` (pointwise join).
 *
 * The well-known constants are matched first so that the solver's change detection
 * (`jump.join_with(new) != jump`) recognises them structurally, whatever the allocation
 * history. Only analysis-specific functions fall back to `Composite` / `Joined` nodes.
 *
 * References:
 * - Sagiv, Reps, Horwitz (1996): "Precise Interprocedural Dataflow Analysis with
 *   Applications to Constant Propagation"
 */

use std::fmt::Debug;
use std::sync::Arc;

use super::lattice::JoinLattice;

/// Most distinct functions a `Joined` may hold. A join with more parts widens to
/// `AllBottom`, which bounds how often a jump function can change inside a loop.
pub const JOIN_LIMIT: usize = 4;

/// Analysis-specific edge function (e.g. "add k", "taint level + 1").
///
/// Implementations are plain values compared structurally, so two functions built at
/// different times for the same purpose are recognised as equal by the solver.
///
/// Joins without a closed form are kept as a `Joined` node of at most [`JOIN_LIMIT`]
/// parts and widened to `AllBottom` beyond that. Closed-form joins must themselves reach
/// a fixed point after finitely many steps.
pub trait CustomEdgeFunction<L: JoinLattice>: Clone + Eq + Debug {
    /// Apply this function to `source`.
    fn compute_target(&self, source: &L) -> L;

    /// Closed-form `self ; second`, if one exists.
    ///
    /// Returning `None` makes the algebra build a `Composite` chain instead. Chains grow on
    /// every loop iteration, so infinite-height lattices should implement this.
    fn compose_with(&self, _second: &Self) -> Option<Self> {
        None
    }

    /// Closed-form pointwise join, if one exists.
    ///
    /// `None` keeps both functions in a bounded `Joined` node (see [`JOIN_LIMIT`]).
    fn join_with(&self, _other: &Self) -> Option<Self> {
        None
    }
}

/// Placeholder for analyses that only use the built-in edge functions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum NoCustom {}

impl<L: JoinLattice> CustomEdgeFunction<L> for NoCustom {
    fn compute_target(&self, _source: &L) -> L {
        match *self {}
    }
}

/// Edge function over lattice `L`.
#[derive(Clone, Debug)]
pub enum EdgeFunction<L: JoinLattice, C: CustomEdgeFunction<L> = NoCustom> {
    /// λv. v
    Identity,
    /// λv. ⊤ (the implicit value of every jump function not yet discovered)
    AllTop,
    /// λv. ⊥ (reachability in IFDS problems)
    AllBottom,
    /// λv. c, never built with ⊤ or ⊥ (see [`EdgeFunction::constant`])
    Constant(L),
    /// Analysis-specific function
    Custom(C),
    /// Sequential application, first element applied first. At least two elements, none of
    /// them `Identity`, a constant, `Composite` or `Joined`.
    Composite(Arc<[EdgeFunction<L, C>]>),
    /// Pointwise join of at least two distinct elements, none of them `AllTop`,
    /// `AllBottom` or `Joined`.
    Joined(Arc<[EdgeFunction<L, C>]>),
}

impl<L: JoinLattice, C: CustomEdgeFunction<L>> EdgeFunction<L, C> {
    pub fn identity() -> Self {
        Self::Identity
    }

    pub fn all_top() -> Self {
        Self::AllTop
    }

    pub fn all_bottom() -> Self {
        Self::AllBottom
    }

    /// Constant function, normalised so that `constant(⊤) == AllTop` and
    /// `constant(⊥) == AllBottom`.
    pub fn constant(value: L) -> Self {
        if value.is_top() {
            Self::AllTop
        } else if value.is_bottom() {
            Self::AllBottom
        } else {
            Self::Constant(value)
        }
    }

    pub fn custom(function: C) -> Self {
        Self::Custom(function)
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    pub fn is_all_top(&self) -> bool {
        matches!(self, Self::AllTop)
    }

    pub fn is_all_bottom(&self) -> bool {
        matches!(self, Self::AllBottom)
    }

    /// True for functions that ignore their input.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::AllTop | Self::AllBottom | Self::Constant(_))
    }

    /// Computes the value resulting from applying this function to `source`.
    pub fn compute_target(&self, source: &L) -> L {
        match self {
            Self::Identity => source.clone(),
            Self::AllTop => L::top(),
            Self::AllBottom => L::bottom(),
            Self::Constant(c) => c.clone(),
            Self::Custom(f) => f.compute_target(source),
            Self::Composite(chain) => chain
                .iter()
                .fold(source.clone(), |value, f| f.compute_target(&value)),
            Self::Joined(parts) => parts
                .iter()
                .map(|f| f.compute_target(source))
                .fold(L::top(), |acc, v| acc.join(&v)),
        }
    }

    /// Returns a function equivalent to applying `self` first and `second` afterwards.
    ///
    /// `AllBottom` absorbs on both sides: once a path is known to reach an exploded node
    /// with ⊥, no later edge can make it "less reached".
    pub fn compose_with(&self, second: &Self) -> Self {
        match (self, second) {
            (_, Self::Identity) => self.clone(),
            (Self::Identity, _) => second.clone(),
            (Self::AllBottom, _) | (_, Self::AllBottom) => Self::AllBottom,
            // λv. ⊤ and λv. c after anything stay constant
            (_, Self::AllTop) => Self::AllTop,
            (_, Self::Constant(c)) => Self::Constant(c.clone()),
            // a constant followed by anything is the constant image
            (Self::AllTop, g) => Self::constant(g.compute_target(&L::top())),
            (Self::Constant(c), g) => Self::constant(g.compute_target(c)),
            // distribute over joins (edge functions are distributive)
            (f, Self::Joined(parts)) => Self::join_all(parts.iter().map(|g| f.compose_with(g))),
            (Self::Joined(parts), g) => Self::join_all(parts.iter().map(|f| f.compose_with(g))),
            (f, g) => Self::chain(f, g),
        }
    }

    /// Returns the pointwise join of `self` and `other`.
    ///
    /// Exact unless the result would need more than [`JOIN_LIMIT`] parts, in which case it
    /// widens to `AllBottom`.
    pub fn join_with(&self, other: &Self) -> Self {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Self::AllTop, g) => g.clone(),
            (f, Self::AllTop) => f.clone(),
            (Self::AllBottom, _) | (_, Self::AllBottom) => Self::AllBottom,
            (Self::Constant(a), Self::Constant(b)) => Self::constant(a.join(b)),
            (Self::Custom(a), Self::Custom(b)) => match a.join_with(b) {
                Some(joined) => Self::Custom(joined),
                None => Self::joined_of(self, other),
            },
            _ => Self::joined_of(self, other),
        }
    }

    fn join_all(functions: impl Iterator<Item = Self>) -> Self {
        functions.fold(Self::AllTop, |acc, f| acc.join_with(&f))
    }

    fn joined_of(first: &Self, second: &Self) -> Self {
        let mut parts: Vec<Self> = Vec::new();
        for f in first.join_parts().iter().chain(second.join_parts().iter()) {
            if !parts.contains(f) {
                parts.push(f.clone());
            }
        }
        if parts.len() == 1 {
            return parts.pop().unwrap_or(Self::AllTop);
        }
        if parts.len() > JOIN_LIMIT {
            return Self::AllBottom;
        }
        Self::Joined(parts.into())
    }

    fn join_parts(&self) -> Vec<Self> {
        match self {
            Self::Joined(parts) => parts.to_vec(),
            f => vec![f.clone()],
        }
    }

    fn chain_parts(&self) -> Vec<Self> {
        match self {
            Self::Composite(chain) => chain.to_vec(),
            f => vec![f.clone()],
        }
    }

    /// Concatenates two non-trivial functions, merging adjacent custom functions when the
    /// analysis offers a closed form.
    fn chain(first: &Self, second: &Self) -> Self {
        let mut chain = first.chain_parts();
        for g in second.chain_parts() {
            let merged = match (chain.last(), &g) {
                (Some(Self::Custom(a)), Self::Custom(b)) => a.compose_with(b),
                _ => None,
            };
            match merged {
                Some(m) => {
                    chain.pop();
                    chain.push(Self::Custom(m));
                }
                None => chain.push(g),
            }
        }
        if chain.len() == 1 {
            return chain.pop().unwrap_or(Self::Identity);
        }
        Self::Composite(chain.into())
    }
}

impl<L: JoinLattice, C: CustomEdgeFunction<L>> PartialEq for EdgeFunction<L, C> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Identity, Self::Identity)
            | (Self::AllTop, Self::AllTop)
            | (Self::AllBottom, Self::AllBottom) => true,
            (Self::Constant(a), Self::Constant(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => Arc::ptr_eq(a, b) || a[..] == b[..],
            // join parts are deduplicated, so set equality is length + containment
            (Self::Joined(a), Self::Joined(b)) => {
                Arc::ptr_eq(a, b) || (a.len() == b.len() && a.iter().all(|f| b.contains(f)))
            }
            _ => false,
        }
    }
}

impl<L: JoinLattice, C: CustomEdgeFunction<L>> Eq for EdgeFunction<L, C> {}

impl<L: JoinLattice, C: CustomEdgeFunction<L>> Default for EdgeFunction<L, C> {
    /// The value of a jump function that has not been discovered.
    fn default() -> Self {
        Self::AllTop
    }
}
