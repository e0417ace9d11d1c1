//! Solver domain: pure contracts and algebra
//!
//! - lattice: value lattices (`JoinLattice`, `BinaryDomain`, `ConstantValue`)
//! - edge_function: IDE micro-function algebra
//! - flow_function: IFDS flow-function contract and stock functions
//! - icfg: interprocedural CFG contract
//! - problem: problem descriptions and the IFDS → IDE adapter

pub mod edge_function; // Identity / AllTop / AllBottom / Constant / Composite / Joined
pub mod flow_function;
pub mod icfg;
pub mod lattice;
pub mod problem;

pub use edge_function::{CustomEdgeFunction, EdgeFunction, NoCustom, JOIN_LIMIT};
pub use flow_function::{
    Compose, Fact, FlowFunction, FlowFunctionPtr, Gen, Identity, Kill, KillAll, LambdaFlow,
    Transfer, Union,
};
pub use icfg::Icfg;
pub use lattice::{BinaryDomain, ConstantValue, JoinLattice};
pub use problem::{EdgeFn, IdeProblem, IfdsAdapter, IfdsProblem, Seeds};
