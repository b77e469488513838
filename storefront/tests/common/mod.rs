// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::errors::{AppError, Result};
use storefront::models::cart::{Cart, CartEntry};
use storefront::models::order::{Order, PaymentMethod, ShippingAddress};
use storefront::models::product::Product;
use storefront::payments::GatewayNotification;
use storefront::pipelines::contexts::PlaceOrderRequest;
use storefront::services::notifier::{LogNotifier, Notification, Notifier, SentNotification};
use storefront::services::payment_mock::SimulatedCardNetwork;
use storefront::state::AppState;
use storefront::store::memory::MemoryStore;
use storefront::store::{InventoryStore, StockChange, StockLine, Stores};
use tracing::Level;
use uuid::Uuid;

pub const MERCHANT_ID: &str = "1221149";
pub const MERCHANT_SECRET: &str = "test-merchant-secret";

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  let vars: HashMap<&str, &str> = HashMap::from([
    ("GATEWAY_MERCHANT_ID", MERCHANT_ID),
    ("GATEWAY_MERCHANT_SECRET", MERCHANT_SECRET),
    ("PROVIDER_TIMEOUT_MS", "200"),
  ]);
  AppConfig::from_vars(|name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

/// Notifier whose provider is always down.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
  async fn send(&self, _notification: Notification) -> Result<SentNotification> {
    Err(AppError::Internal("mail provider unavailable".to_string()))
  }
}

/// Inventory whose next restore fails once after `fail_next_restore`.
pub struct FlakyInventory {
  inner: Arc<MemoryStore>,
  fail_restore: AtomicBool,
}

impl FlakyInventory {
  pub fn fail_next_restore(&self) {
    self.fail_restore.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl InventoryStore for FlakyInventory {
  async fn decrement(&self, lines: &[StockLine]) -> Result<StockChange> {
    self.inner.decrement(lines).await
  }

  async fn restore(&self, lines: &[StockLine]) -> Result<()> {
    if self.fail_restore.swap(false, Ordering::SeqCst) {
      return Err(AppError::Internal("inventory store unavailable".to_string()));
    }
    self.inner.restore(lines).await
  }
}

pub struct Harness {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub cards: Arc<SimulatedCardNetwork>,
  pub mail: Arc<LogNotifier>,
}

pub fn harness() -> Harness {
  let mail = Arc::new(LogNotifier::new("orders@example.com"));
  harness_with(test_config(), mail.clone(), mail)
}

pub fn harness_with(config: AppConfig, notifier: Arc<dyn Notifier>, mail: Arc<LogNotifier>) -> Harness {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let cards = Arc::new(SimulatedCardNetwork::new());
  let state = AppState::new(Arc::new(config), Stores::memory(store.clone()), cards.clone(), notifier);
  Harness {
    state,
    store,
    cards,
    mail,
  }
}

/// A harness whose stock writes go through a `FlakyInventory`.
pub fn harness_with_flaky_inventory() -> (Harness, Arc<FlakyInventory>) {
  setup_tracing();
  let mail = Arc::new(LogNotifier::new("orders@example.com"));
  let store = Arc::new(MemoryStore::new());
  let cards = Arc::new(SimulatedCardNetwork::new());
  let inventory = Arc::new(FlakyInventory {
    inner: store.clone(),
    fail_restore: AtomicBool::new(false),
  });
  let mut stores = Stores::memory(store.clone());
  stores.inventory = inventory.clone();
  let state = AppState::new(Arc::new(test_config()), stores, cards.clone(), mail.clone());
  let h = Harness {
    state,
    store,
    cards,
    mail,
  };
  (h, inventory)
}

impl Harness {
  pub fn product(&self, name: &str, price_cents: i64, stock: i32) -> Product {
    let product = Product::new(name, price_cents, stock);
    self.store.put_product(product.clone());
    product
  }

  pub fn stock(&self, product_id: Uuid) -> i32 {
    self.store.product(product_id).map(|p| p.stock_quantity).expect("product exists")
  }

  pub fn fill_cart(&self, user_id: Uuid, entries: Vec<CartEntry>) {
    self.store.put_cart(Cart {
      user_id,
      total_items: entries.iter().map(|e| e.quantity).sum(),
      total_amount_cents: 0,
      items: entries,
    });
  }

  pub fn cart_len(&self, user_id: Uuid) -> usize {
    self.store.cart(user_id).map(|c| c.items.len()).unwrap_or(0)
  }

  pub async fn order(&self, order_id: Uuid) -> Order {
    self
      .state
      .stores
      .orders
      .get(order_id)
      .await
      .expect("store read")
      .expect("order exists")
  }

  /// A notification for `order` signed with the configured secret.
  pub fn notification(&self, order: &Order, status_code: &str) -> GatewayNotification {
    let mut n = GatewayNotification {
      merchant_id: MERCHANT_ID.to_string(),
      order_id: order.id.to_string(),
      amount: storefront::models::format_cents(order.total_amount_cents),
      currency: order.currency.clone(),
      status_code: status_code.to_string(),
      signature: String::new(),
      payment_id: Some(format!("3200{}", &order.id.simple().to_string()[..8])),
      method: Some("VISA".to_string()),
      status_message: Some("Successfully completed the payment.".to_string()),
      card_holder_name: Some("Nimal Perera".to_string()),
      card_no: Some("************1292".to_string()),
    };
    n.signature = self.state.payments.gateway.notification_hash(&n);
    n
  }
}

pub fn entry(product: &Product, quantity: i32) -> CartEntry {
  CartEntry {
    product_id: product.id,
    size: Some("M".to_string()),
    quantity,
  }
}

pub fn shipping() -> ShippingAddress {
  ShippingAddress {
    full_name: "Nimal Perera".to_string(),
    email: "nimal@example.com".to_string(),
    phone: "+94771234567".to_string(),
    street: "42 Galle Road".to_string(),
    city: "Colombo".to_string(),
    region: Some("Western".to_string()),
    postal_code: "00300".to_string(),
    country: "Sri Lanka".to_string(),
  }
}

pub fn request(method: PaymentMethod, items: Option<Vec<CartEntry>>) -> PlaceOrderRequest {
  PlaceOrderRequest {
    items,
    shipping_address: shipping(),
    payment_method: method,
  }
}
