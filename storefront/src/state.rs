// storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::payments::{CardProvider, PaymentAdapters};
use crate::pipelines;
use crate::services::inventory::InventoryLedger;
use crate::services::notifier::Notifier;
use crate::store::Stores;
use std::sync::Arc;
use stepflow::FlowRegistry;

/// Everything a request handler or flow step needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub stores: Stores,
  pub ledger: Arc<InventoryLedger>,
  pub payments: Arc<PaymentAdapters>,
  pub notifier: Arc<dyn Notifier>,
  pub flows: Arc<FlowRegistry<AppError>>,
}

impl AppState {
  /// Wires the adapters from `config` and registers every order flow.
  pub fn new(
    config: Arc<AppConfig>,
    stores: Stores,
    card_provider: Arc<dyn CardProvider>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let payments = Arc::new(PaymentAdapters::new(&config, card_provider));
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_flows(&flows, &payments);
    Self {
      config,
      ledger: Arc::new(InventoryLedger::new(stores.inventory.clone())),
      stores,
      payments,
      notifier,
      flows,
    }
  }
}
