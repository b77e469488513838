// storefront/src/store/memory.rs

//! In-process backend. Each map sits behind its own `parking_lot::RwLock`;
//! every compare-and-swap runs under a single write guard.

use super::{
  CartStore, Catalog, InventoryStore, OrderFilter, OrderStore, OrderSummary, Page, StatusTotals, StockChange,
  StockLine, UserDirectory,
};
use crate::errors::Result;
use crate::models::cart::Cart;
use crate::models::order::{Order, OrderStatus, PaymentInfo};
use crate::models::product::Product;
use crate::models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
  products: RwLock<HashMap<Uuid, Product>>,
  carts: RwLock<HashMap<Uuid, Cart>>,
  users: RwLock<HashMap<Uuid, User>>,
  orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put_product(&self, product: Product) {
    self.products.write().insert(product.id, product);
  }

  pub fn put_cart(&self, cart: Cart) {
    self.carts.write().insert(cart.user_id, cart);
  }

  pub fn put_user(&self, user: User) {
    self.users.write().insert(user.id, user);
  }

  pub fn product(&self, id: Uuid) -> Option<Product> {
    self.products.read().get(&id).cloned()
  }

  pub fn cart(&self, user_id: Uuid) -> Option<Cart> {
    self.carts.read().get(&user_id).cloned()
  }

  pub fn order_count(&self) -> usize {
    self.orders.read().len()
  }

  /// Applies `f` to the order under the write lock when `guard` holds.
  fn swap_if(&self, id: Uuid, guard: impl FnOnce(&Order) -> bool, f: impl FnOnce(&mut Order)) -> bool {
    let mut orders = self.orders.write();
    let Some(order) = orders.get_mut(&id) else {
      return false;
    };
    if !guard(order) {
      return false;
    }
    f(order);
    true
  }
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.product(id))
  }
}

#[async_trait]
impl InventoryStore for MemoryStore {
  async fn decrement(&self, lines: &[StockLine]) -> Result<StockChange> {
    let mut products = self.products.write();
    for line in lines {
      match products.get(&line.product_id) {
        None => return Ok(StockChange::MissingProduct(line.product_id)),
        Some(p) if p.stock_quantity < line.quantity => {
          return Ok(StockChange::Shortfall {
            product_id: line.product_id,
            requested: line.quantity,
            available: p.stock_quantity,
          })
        }
        Some(_) => {}
      }
    }
    for line in lines {
      if let Some(p) = products.get_mut(&line.product_id) {
        p.stock_quantity -= line.quantity;
        p.in_stock = p.stock_quantity > 0;
      }
    }
    Ok(StockChange::Applied)
  }

  async fn restore(&self, lines: &[StockLine]) -> Result<()> {
    let mut products = self.products.write();
    for line in lines {
      match products.get_mut(&line.product_id) {
        Some(p) => {
          p.stock_quantity += line.quantity;
          p.in_stock = p.stock_quantity > 0;
        }
        None => tracing::warn!(product_id = %line.product_id, "Restoring stock for a product no longer in the catalog."),
      }
    }
    Ok(())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn get_cart(&self, user_id: Uuid) -> Result<Cart> {
    Ok(self.cart(user_id).unwrap_or_else(|| Cart::empty(user_id)))
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    self.carts.write().insert(user_id, Cart::empty(user_id));
    Ok(())
  }
}

#[async_trait]
impl UserDirectory for MemoryStore {
  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.users.read().get(&id).cloned())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn insert(&self, order: &Order) -> Result<()> {
    self.orders.write().insert(order.id, order.clone());
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()> {
    if let Some(order) = self.orders.write().get_mut(&id) {
      order.payment_reference = Some(reference.to_string());
    }
    Ok(())
  }

  async fn mark_paid(&self, id: Uuid, info: &PaymentInfo, paid_at: DateTime<Utc>) -> Result<bool> {
    Ok(self.swap_if(
      id,
      |o| !o.is_paid && o.status == OrderStatus::Pending,
      |o| {
        o.is_paid = true;
        o.paid_at = Some(paid_at);
        o.payment_info = Some(info.clone());
        o.status = OrderStatus::Confirmed;
        o.inventory_committed = true;
      },
    ))
  }

  async fn record_payment_attempt(&self, id: Uuid, info: &PaymentInfo) -> Result<bool> {
    Ok(self.swap_if(id, |o| !o.is_paid, |o| o.payment_info = Some(info.clone())))
  }

  async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus, at: DateTime<Utc>) -> Result<bool> {
    Ok(self.swap_if(
      id,
      |o| o.status == from,
      |o| {
        o.status = to;
        if to == OrderStatus::Delivered {
          o.delivered_at = Some(at);
        }
      },
    ))
  }

  async fn claim_inventory(&self, id: Uuid) -> Result<bool> {
    Ok(self.swap_if(id, |o| !o.inventory_committed, |o| o.inventory_committed = true))
  }

  async fn release_inventory(&self, id: Uuid) -> Result<bool> {
    Ok(self.swap_if(id, |o| o.inventory_committed, |o| o.inventory_committed = false))
  }

  async fn list(&self, filter: &OrderFilter, page: Page) -> Result<(Vec<Order>, u64)> {
    let orders = self.orders.read();
    let mut matching: Vec<&Order> = orders
      .values()
      .filter(|o| filter.status.map_or(true, |s| o.status == s))
      .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
      .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    let total = matching.len() as u64;
    let rows = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit as usize)
      .cloned()
      .collect();
    Ok((rows, total))
  }

  async fn status_summary(&self) -> Result<OrderSummary> {
    let orders = self.orders.read();
    let mut by_status: HashMap<OrderStatus, (i64, i64)> = HashMap::new();
    let mut paid_revenue_cents = 0;
    for order in orders.values() {
      let entry = by_status.entry(order.status).or_default();
      entry.0 += 1;
      entry.1 += order.total_amount_cents;
      if order.is_paid {
        paid_revenue_cents += order.total_amount_cents;
      }
    }
    let mut by_status: Vec<StatusTotals> = by_status
      .into_iter()
      .map(|(status, (count, total_value_cents))| StatusTotals {
        status,
        count,
        total_value_cents,
      })
      .collect();
    by_status.sort_by_key(|t| t.status);
    Ok(OrderSummary {
      by_status,
      paid_revenue_cents,
    })
  }
}
