// storefront/src/lib.rs

//! Order placement, payment settlement and inventory for the storefront.
//!
//! Every workflow with state to protect (checkout, settlement, cancellation,
//! admin status updates) is a `stepflow::Flow` registered in
//! [`state::AppState::flows`]. The HTTP layer in [`web`] and the operations in
//! [`services::orders`] only build contexts and read results back.

pub mod config;
pub mod errors;
pub mod models;
pub mod payments;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
