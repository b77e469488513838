// storefront/src/services/inventory.rs

//! The inventory ledger: the only writer of product stock.

use crate::errors::{AppError, Result};
use crate::models::order::OrderItem;
use crate::store::{InventoryStore, StockChange, StockLine};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

pub struct InventoryLedger {
  store: Arc<dyn InventoryStore>,
}

/// Sums quantities per product; one order may hold a product in several sizes.
pub fn stock_lines(items: &[OrderItem]) -> Vec<StockLine> {
  let mut per_product: BTreeMap<Uuid, i32> = BTreeMap::new();
  for item in items {
    *per_product.entry(item.product_id).or_default() += item.quantity;
  }
  per_product
    .into_iter()
    .map(|(product_id, quantity)| StockLine { product_id, quantity })
    .collect()
}

impl InventoryLedger {
  pub fn new(store: Arc<dyn InventoryStore>) -> Self {
    Self { store }
  }

  /// Takes the order's quantities out of stock. A shortfall here means a
  /// stock check upstream was missed; it is never corrected silently.
  #[instrument(name = "ledger::decrement", skip(self, items), fields(lines = items.len()), err(Display))]
  pub async fn decrement(&self, order_id: Uuid, items: &[OrderItem]) -> Result<()> {
    match self.store.decrement(&stock_lines(items)).await? {
      StockChange::Applied => {
        info!("Stock decremented.");
        Ok(())
      }
      StockChange::Shortfall {
        product_id,
        requested,
        available,
      } => {
        error!(invariant = true, %product_id, requested, available, "Stock would go negative.");
        Err(AppError::InvariantViolation(format!(
          "order {} needs {} of product {} but only {} remain",
          order_id, requested, product_id, available
        )))
      }
      StockChange::MissingProduct(product_id) => {
        error!(invariant = true, %product_id, "Ordered product vanished from the catalog.");
        Err(AppError::InvariantViolation(format!(
          "order {} references missing product {}",
          order_id, product_id
        )))
      }
    }
  }

  #[instrument(name = "ledger::restore", skip(self, items), fields(lines = items.len()), err(Display))]
  pub async fn restore(&self, order_id: Uuid, items: &[OrderItem]) -> Result<()> {
    self.store.restore(&stock_lines(items)).await?;
    info!("Stock restored.");
    Ok(())
  }
}
