/*
 * Codegraph IDE - IFDS/IDE tabulation solver
 *
 * Feature-First Layout:
 * - domain/         : Contracts and algebra (lattices, edge functions, flow functions, ICFG,
 *                     problem descriptions)
 * - infrastructure/ : Jump-function and summary stores, function cache, solver, results
 * - config/         : Solver configuration (presets, YAML/JSON)
 * - errors.rs       : Solver error taxonomy
 *
 * Usage:
 *   let graph = ProgramGraph::builder().procedure("main", &["s1", "s2"]).build();
 *   let results = IdeSolver::new(&graph, &problem, SolverConfig::default()).solve()?;
 *   let facts = results.results_at(&"s2".to_string());
 */

#![allow(clippy::too_many_arguments)] // Edge factories mirror the exploded-edge shape
#![allow(clippy::type_complexity)] // Nested table types are the data model

pub mod config;
pub mod domain;
pub mod errors;
pub mod infrastructure;
mod shared;

pub use config::{ConfigError, Preset, SolverConfig, Validatable};
pub use domain::{
    BinaryDomain, ConstantValue, CustomEdgeFunction, EdgeFn, EdgeFunction, Fact, FlowFunction,
    FlowFunctionPtr, Icfg, IdeProblem, IfdsAdapter, IfdsProblem, JoinLattice, NoCustom, Seeds,
    JOIN_LIMIT,
};
pub use errors::{Result, SolverError, SolverPhase};
pub use infrastructure::{
    solve_ifds, ExplodedEdgeKind, ExplodedNode, ExplodedSupergraph, IdeResults, IdeSolver,
    ProgramGraph, ProgramGraphBuilder, SolverStatistics, TeardownReport,
};
