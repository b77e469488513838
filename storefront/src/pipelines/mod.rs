// storefront/src/pipelines/mod.rs

//! Builds and registers every order flow.

use crate::errors::AppError;
use crate::payments::PaymentAdapters;
use std::sync::Arc;
use stepflow::FlowRegistry;

pub mod common_steps;
pub mod contexts;
pub mod factories;

pub mod cancellation_pipeline;
pub mod checkout_pipeline;
pub mod settlement_pipeline;
pub mod status_pipeline;

/// Registers checkout, settlement, cancellation and status update against
/// their context types. Called once while building `AppState`.
pub fn register_all_flows(registry: &FlowRegistry<AppError>, adapters: &PaymentAdapters) {
  tracing::info!("Registering order flows...");

  let payment_flows = factories::PaymentFlows::build(adapters);
  registry.register(checkout_pipeline::build_checkout_flow(&payment_flows));
  registry.register(settlement_pipeline::build_settlement_flow(&payment_flows));
  registry.register(cancellation_pipeline::build_cancellation_flow());
  registry.register(status_pipeline::build_status_update_flow(Arc::new(
    cancellation_pipeline::build_cancellation_flow(),
  )));

  tracing::info!("All order flows registered.");
}
