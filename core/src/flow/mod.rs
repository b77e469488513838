// stepflow/src/flow/mod.rs

//! `Flow<T, E>`: declaration, handler registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::{Flow, Phase};
