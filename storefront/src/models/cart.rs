// storefront/src/models/cart.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
  pub product_id: Uuid,
  #[serde(default)]
  pub size: Option<String>,
  pub quantity: i32,
}

/// One cart per user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
  pub user_id: Uuid,
  pub items: Vec<CartEntry>,
  pub total_items: i32,
  pub total_amount_cents: i64,
}

impl Cart {
  pub fn empty(user_id: Uuid) -> Self {
    Self {
      user_id,
      ..Default::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}
