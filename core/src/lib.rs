// stepflow/src/lib.rs

//! stepflow: a small async, type-safe step runner.
//!
//! A [`Flow`] is an ordered list of named steps over a context `T`, shared
//! between handlers as [`Shared<T>`]. Each step has `before`, `on` and `after`
//! handlers. A handler either continues or halts the run, or fails with the
//! flow's error type. Steps can be optional, skipped by a predicate, or turned
//! into a branch that hands a sub-context to one of several sub-flows.
//! [`FlowRegistry`] keeps flows keyed by context type.

pub mod branch;
pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::branch::{BranchBuilder, RouteBuilder};
pub use crate::core::control::{Control, Outcome};
pub use crate::core::shared::Shared;
pub use crate::core::step::{Handler, SkipIf, Step};
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, Phase};
pub use crate::registry::FlowRegistry;
