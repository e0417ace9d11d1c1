//! Solver infrastructure
//!
//! - jump_functions: path-edge / jump-function store
//! - summaries: end summaries and the incoming table
//! - function_cache: per-run flow/edge function arena
//! - run_context: per-run state and statistics
//! - solver: two-phase IDE tabulation
//! - results: result extraction
//! - exploded_graph: optional exploded supergraph recording
//! - program_graph: in-memory ICFG

pub mod exploded_graph;
pub mod function_cache;
pub mod jump_functions;
pub mod program_graph;
pub mod results;
pub mod run_context;
pub mod solver; // IDE tabulation solver
pub mod summaries;

pub use exploded_graph::{ExplodedEdge, ExplodedEdgeKind, ExplodedNode, ExplodedSupergraph};
pub use function_cache::{
    CacheStatistics, EdgeHandle, EdgeKey, FlowHandle, FlowKey, FunctionCache, TeardownReport,
};
pub use jump_functions::{JumpFunctions, PathEdge};
pub use program_graph::{ProgramGraph, ProgramGraphBuilder};
pub use results::IdeResults;
pub use run_context::{RunContext, SolverStatistics};
pub use solver::{solve_ifds, IdeSolver, SolverResults};
pub use summaries::{EndSummaries, IncomingTable};
