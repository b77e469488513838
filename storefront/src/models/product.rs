// storefront/src/models/product.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The inventory-relevant view of a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub stock_quantity: i32,
  /// Denormalized `stock_quantity > 0`.
  pub in_stock: bool,
  pub image_ref: Option<String>,
}

impl Product {
  pub fn new(name: impl Into<String>, price_cents: i64, stock_quantity: i32) -> Self {
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      price_cents,
      stock_quantity,
      in_stock: stock_quantity > 0,
      image_ref: None,
    }
  }
}
