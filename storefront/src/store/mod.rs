// storefront/src/store/mod.rs

//! Persistence seams. Handlers only see these traits; `MemoryStore` and
//! `PgStore` implement all of them.
//!
//! Every `bool`-returning `OrderStore` method is a compare-and-swap: it
//! returns `true` only if this call changed the record.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::cart::Cart;
use crate::models::order::{Order, OrderStatus, PaymentInfo};
use crate::models::product::Product;
use crate::models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Quantity of one product to take or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Result of an all-or-nothing stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockChange {
  Applied,
  Shortfall {
    product_id: Uuid,
    requested: i32,
    available: i32,
  },
  MissingProduct(Uuid),
}

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
}

/// Atomic per call: either every line is applied or none is.
#[async_trait]
pub trait InventoryStore: Send + Sync {
  /// Takes stock only if every line is still available at update time, and
  /// keeps `in_stock == (stock_quantity > 0)`.
  async fn decrement(&self, lines: &[StockLine]) -> Result<StockChange>;

  /// Returns stock and marks the products in stock.
  async fn restore(&self, lines: &[StockLine]) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// An absent cart reads as empty.
  async fn get_cart(&self, user_id: Uuid) -> Result<Cart>;
  async fn clear_cart(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
  async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
  pub number: u32,
  pub limit: u32,
}

impl Page {
  pub fn new(number: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
    Self {
      number: number.unwrap_or(1).max(1),
      limit: limit.unwrap_or(default_limit).clamp(1, 100),
    }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.number - 1) * u64::from(self.limit)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
  pub status: OrderStatus,
  pub count: i64,
  pub total_value_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
  pub by_status: Vec<StatusTotals>,
  pub paid_revenue_cents: i64,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: &Order) -> Result<()>;

  async fn get(&self, id: Uuid) -> Result<Option<Order>>;

  async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()>;

  /// Unpaid and `pending` → paid and `confirmed`, with `paid_at` and `info`.
  /// Sets `inventory_committed` in the same swap: the caller owes the ledger
  /// the decrement and must release the flag if it fails.
  async fn mark_paid(&self, id: Uuid, info: &PaymentInfo, paid_at: DateTime<Utc>) -> Result<bool>;

  /// Records a pending or failed attempt on an order that is still unpaid.
  async fn record_payment_attempt(&self, id: Uuid, info: &PaymentInfo) -> Result<bool>;

  /// `from → to`, only while the status is still `from`. Entering
  /// `delivered` stamps `delivered_at = at`.
  async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus, at: DateTime<Utc>) -> Result<bool>;

  /// `inventory_committed` false → true. Puts a claim back after a failed
  /// restore so the stock stays owed to the catalog.
  async fn claim_inventory(&self, id: Uuid) -> Result<bool>;

  /// `inventory_committed` true → false.
  async fn release_inventory(&self, id: Uuid) -> Result<bool>;

  /// Newest first, plus the total number of matching orders.
  async fn list(&self, filter: &OrderFilter, page: Page) -> Result<(Vec<Order>, u64)>;

  async fn status_summary(&self) -> Result<OrderSummary>;
}

/// The collaborator handles shared by every flow.
#[derive(Clone)]
pub struct Stores {
  pub orders: Arc<dyn OrderStore>,
  pub catalog: Arc<dyn Catalog>,
  pub inventory: Arc<dyn InventoryStore>,
  pub carts: Arc<dyn CartStore>,
  pub users: Arc<dyn UserDirectory>,
}

impl Stores {
  pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
    Self {
      orders: store.clone(),
      catalog: store.clone(),
      inventory: store.clone(),
      carts: store.clone(),
      users: store,
    }
  }

  pub fn postgres(store: Arc<postgres::PgStore>) -> Self {
    Self {
      orders: store.clone(),
      catalog: store.clone(),
      inventory: store.clone(),
      carts: store.clone(),
      users: store,
    }
  }
}
