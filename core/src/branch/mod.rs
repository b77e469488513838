// stepflow/src/branch/mod.rs

//! Branch steps: route a step into one of several sub-flows, each running
//! over a context extracted from the parent.

pub mod builder;
pub(crate) mod scope;

pub use builder::{BranchBuilder, RouteBuilder};
