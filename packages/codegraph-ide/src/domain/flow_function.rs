/*
 * Flow functions: D → 2^D
 *
 * A flow function describes the effect of one ICFG edge on a single data-flow fact.
 * The solver only ever asks for the targets of one source fact at a time, which is
 * what makes the exploded supergraph distributive.
 *
 * Stock functions follow the usual IFDS toolbox (Bodden 2012, "Inter-procedural
 * Data-flow Analysis with IFDS/IDE and Soot").
 */

use rustc_hash::FxHashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Data-flow fact. Facts are compared by value; the run's zero fact is the one value
/// returned by `create_zero_value`.
pub trait Fact: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Fact for T {}

/// Maps one incoming fact to the facts holding after an ICFG edge.
///
/// An empty result kills the fact.
pub trait FlowFunction<D: Fact>: Send + Sync {
    fn compute_targets(&self, source: &D) -> FxHashSet<D>;

    /// f(d) = {d}. Identity functions are never stored in the per-run cache.
    fn is_identity(&self) -> bool {
        false
    }

    /// f(d) = ∅
    fn is_kill_all(&self) -> bool {
        false
    }
}

/// Shared handle to a flow function produced by an analysis.
pub type FlowFunctionPtr<D> = Arc<dyn FlowFunction<D>>;

fn singleton<D: Fact>(fact: D) -> FxHashSet<D> {
    let mut set = FxHashSet::default();
    set.insert(fact);
    set
}

/// f(d) = {d}
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Identity {
    pub fn ptr<D: Fact>() -> FlowFunctionPtr<D> {
        Arc::new(Identity)
    }
}

impl<D: Fact> FlowFunction<D> for Identity {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        singleton(source.clone())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// f(d) = ∅
#[derive(Debug, Clone, Copy, Default)]
pub struct KillAll;

impl KillAll {
    pub fn ptr<D: Fact>() -> FlowFunctionPtr<D> {
        Arc::new(KillAll)
    }
}

impl<D: Fact> FlowFunction<D> for KillAll {
    fn compute_targets(&self, _source: &D) -> FxHashSet<D> {
        FxHashSet::default()
    }

    fn is_kill_all(&self) -> bool {
        true
    }
}

/// Generates `fact` out of the zero fact; every other fact passes through.
#[derive(Debug, Clone)]
pub struct Gen<D: Fact> {
    pub fact: D,
    pub zero: D,
}

impl<D: Fact> Gen<D> {
    pub fn new(fact: D, zero: D) -> Self {
        Self { fact, zero }
    }
}

impl<D: Fact + Send + Sync> FlowFunction<D> for Gen<D> {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        let mut result = singleton(source.clone());
        if *source == self.zero {
            result.insert(self.fact.clone());
        }
        result
    }
}

/// Kills `fact`; every other fact passes through.
#[derive(Debug, Clone)]
pub struct Kill<D: Fact> {
    pub fact: D,
}

impl<D: Fact> Kill<D> {
    pub fn new(fact: D) -> Self {
        Self { fact }
    }
}

impl<D: Fact + Send + Sync> FlowFunction<D> for Kill<D> {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        if *source == self.fact {
            FxHashSet::default()
        } else {
            singleton(source.clone())
        }
    }
}

/// Assignment `to = from`: `from` also produces `to`, the old `to` is killed.
#[derive(Debug, Clone)]
pub struct Transfer<D: Fact> {
    pub to: D,
    pub from: D,
}

impl<D: Fact> Transfer<D> {
    pub fn new(to: D, from: D) -> Self {
        Self { to, from }
    }
}

impl<D: Fact + Send + Sync> FlowFunction<D> for Transfer<D> {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        if *source == self.from {
            let mut result = singleton(self.from.clone());
            result.insert(self.to.clone());
            result
        } else if *source == self.to {
            FxHashSet::default()
        } else {
            singleton(source.clone())
        }
    }
}

/// Union of the targets of several flow functions.
#[derive(Clone)]
pub struct Union<D: Fact> {
    parts: Vec<FlowFunctionPtr<D>>,
}

impl<D: Fact> Union<D> {
    pub fn new(parts: Vec<FlowFunctionPtr<D>>) -> Self {
        Self { parts }
    }
}

impl<D: Fact> FlowFunction<D> for Union<D> {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        let mut result = FxHashSet::default();
        for part in &self.parts {
            result.extend(part.compute_targets(source));
        }
        result
    }

    fn is_identity(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.is_identity())
    }

    fn is_kill_all(&self) -> bool {
        self.parts.iter().all(|p| p.is_kill_all())
    }
}

/// Sequential application, first element first.
#[derive(Clone)]
pub struct Compose<D: Fact> {
    stages: Vec<FlowFunctionPtr<D>>,
}

impl<D: Fact> Compose<D> {
    pub fn new(stages: Vec<FlowFunctionPtr<D>>) -> Self {
        Self { stages }
    }
}

impl<D: Fact> FlowFunction<D> for Compose<D> {
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        let mut current = singleton(source.clone());
        for stage in &self.stages {
            if current.is_empty() {
                break;
            }
            current = current
                .iter()
                .flat_map(|d| stage.compute_targets(d))
                .collect();
        }
        current
    }

    fn is_identity(&self) -> bool {
        self.stages.iter().all(|s| s.is_identity())
    }

    fn is_kill_all(&self) -> bool {
        self.stages.iter().any(|s| s.is_kill_all())
    }
}

/// Flow function backed by a closure.
pub struct LambdaFlow<F> {
    function: F,
}

impl<F> LambdaFlow<F> {
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<D, F> FlowFunction<D> for LambdaFlow<F>
where
    D: Fact,
    F: Fn(&D) -> FxHashSet<D> + Send + Sync,
{
    fn compute_targets(&self, source: &D) -> FxHashSet<D> {
        (self.function)(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum TestFact {
        Zero,
        Var(&'static str),
    }

    fn set(facts: &[TestFact]) -> FxHashSet<TestFact> {
        facts.iter().cloned().collect()
    }

    #[test]
    fn test_identity_and_kill_all() {
        let x = TestFact::Var("x");
        assert_eq!(Identity.compute_targets(&x), set(&[x.clone()]));
        assert!(FlowFunction::<TestFact>::is_identity(&Identity));
        assert!(KillAll.compute_targets(&x).is_empty());
        assert!(FlowFunction::<TestFact>::is_kill_all(&KillAll));
    }

    #[test]
    fn test_gen_from_zero_only() {
        let gen = Gen::new(TestFact::Var("x"), TestFact::Zero);
        assert_eq!(
            gen.compute_targets(&TestFact::Zero),
            set(&[TestFact::Zero, TestFact::Var("x")])
        );
        assert_eq!(
            gen.compute_targets(&TestFact::Var("y")),
            set(&[TestFact::Var("y")])
        );
    }

    #[test]
    fn test_kill() {
        let kill = Kill::new(TestFact::Var("x"));
        assert!(kill.compute_targets(&TestFact::Var("x")).is_empty());
        assert_eq!(kill.compute_targets(&TestFact::Zero), set(&[TestFact::Zero]));
    }

    #[test]
    fn test_transfer_assignment() {
        // a = b
        let transfer = Transfer::new(TestFact::Var("a"), TestFact::Var("b"));
        assert_eq!(
            transfer.compute_targets(&TestFact::Var("b")),
            set(&[TestFact::Var("a"), TestFact::Var("b")])
        );
        assert!(transfer.compute_targets(&TestFact::Var("a")).is_empty());
        assert_eq!(
            transfer.compute_targets(&TestFact::Var("c")),
            set(&[TestFact::Var("c")])
        );
    }

    #[test]
    fn test_union_and_compose() {
        let gen: FlowFunctionPtr<TestFact> =
            Arc::new(Gen::new(TestFact::Var("x"), TestFact::Zero));
        let kill_zero: FlowFunctionPtr<TestFact> = Arc::new(Kill::new(TestFact::Zero));

        let composed = Compose::new(vec![gen.clone(), kill_zero.clone()]);
        assert_eq!(
            composed.compute_targets(&TestFact::Zero),
            set(&[TestFact::Var("x")])
        );

        let union = Union::new(vec![Identity::ptr(), KillAll::ptr()]);
        assert_eq!(
            union.compute_targets(&TestFact::Var("y")),
            set(&[TestFact::Var("y")])
        );
        assert!(!union.is_identity());
        assert!(Compose::<TestFact>::new(vec![Identity::ptr(), KillAll::ptr()]).is_kill_all());
    }

    #[test]
    fn test_lambda_flow() {
        let rename = LambdaFlow::new(|d: &TestFact| match d {
            TestFact::Var("p") => set(&[TestFact::Var("q")]),
            other => set(&[other.clone()]),
        });
        assert_eq!(
            rename.compute_targets(&TestFact::Var("p")),
            set(&[TestFact::Var("q")])
        );
        assert_eq!(rename.compute_targets(&TestFact::Zero), set(&[TestFact::Zero]));
    }
}
