/*
 * Value lattices for IDE value propagation
 *
 * Convention used throughout the solver:
 * - `top` is the neutral element of `join` ("no information yet", unreachable)
 * - `bottom` absorbs under `join` (reachable / no constant known)
 *
 * Seeds start at `bottom`; every (statement, fact) pair starts at `top` and is only
 * ever joined downwards, which is what bounds phase 2.
 */

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Join semi-lattice of IDE values.
///
/// Laws (checked by the property tests):
/// - `a.join(a) == a`
/// - `a.join(b) == b.join(a)`
/// - `a.join(top) == a`
/// - `a.join(bottom) == bottom`
pub trait JoinLattice: Clone + Eq + Hash + Debug {
    /// Neutral element of `join`.
    fn top() -> Self;

    /// Absorbing element of `join`.
    fn bottom() -> Self;

    /// Combine the values of two paths reaching the same (statement, fact).
    fn join(&self, other: &Self) -> Self;

    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    /// Lattice order: `self ⊑ other` iff joining `self` into `other` changes nothing.
    ///
    /// With `top` neutral this orders `bottom ⊑ v ⊑ top`.
    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *self
    }
}

/// Two-point lattice for pure reachability (IFDS) problems.
///
/// `Bottom` means "fact holds here", `Top` means "not reached".
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryDomain {
    /// Used to initialize the computation at entry points.
    Bottom,
    /// Neutral element used at merge points.
    Top,
}

impl JoinLattice for BinaryDomain {
    fn top() -> Self {
        Self::Top
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn join(&self, other: &Self) -> Self {
        if *self == Self::Top && *other == Self::Top {
            Self::Top
        } else {
            Self::Bottom
        }
    }
}

/// Flat constant-propagation lattice.
///
/// ```text
///            Top
///      /   /  |  \   \
///   ... -1    0   1  ...
///      \   \  |  /   /
///          Bottom       (not a constant)
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ConstantValue {
    Top,
    Constant(i64),
    Bottom,
}

impl JoinLattice for ConstantValue {
    fn top() -> Self {
        Self::Top
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Top, v) | (v, Self::Top) => *v,
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Constant(a), Self::Constant(b)) if a == b => Self::Constant(*a),
            _ => Self::Bottom,
        }
    }
}

impl ConstantValue {
    pub fn as_constant(&self) -> Option<i64> {
        match self {
            Self::Constant(c) => Some(*c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_domain_join() {
        use BinaryDomain::*;
        assert_eq!(Top.join(&Top), Top);
        assert_eq!(Top.join(&Bottom), Bottom);
        assert_eq!(Bottom.join(&Top), Bottom);
        assert_eq!(Bottom.join(&Bottom), Bottom);
    }

    #[test]
    fn test_binary_domain_order() {
        assert!(BinaryDomain::Bottom.leq(&BinaryDomain::Top));
        assert!(!BinaryDomain::Top.leq(&BinaryDomain::Bottom));
    }

    #[test]
    fn test_constant_join_same() {
        let v = ConstantValue::Constant(5);
        assert_eq!(v.join(&ConstantValue::Constant(5)), ConstantValue::Constant(5));
    }

    #[test]
    fn test_constant_join_different() {
        let v = ConstantValue::Constant(5);
        assert_eq!(v.join(&ConstantValue::Constant(7)), ConstantValue::Bottom);
    }

    #[test]
    fn test_constant_top_is_neutral() {
        let v = ConstantValue::Constant(5);
        assert_eq!(v.join(&ConstantValue::Top), v);
        assert_eq!(ConstantValue::Top.join(&v), v);
    }

    #[test]
    fn test_constant_bottom_absorbs() {
        let v = ConstantValue::Constant(5);
        assert_eq!(v.join(&ConstantValue::Bottom), ConstantValue::Bottom);
        assert!(ConstantValue::Bottom.is_bottom());
        assert!(ConstantValue::Top.is_top());
        assert_eq!(v.as_constant(), Some(5));
    }
}
