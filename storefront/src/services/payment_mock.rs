// storefront/src/services/payment_mock.rs

//! In-process card network used when no provider key is configured, and by
//! the tests.

use crate::errors::{AppError, Result};
use crate::payments::{CardProvider, IntentRequest, PaymentIntent};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Default)]
pub struct SimulatedCardNetwork {
  intents: RwLock<HashMap<String, PaymentIntent>>,
  latency: RwLock<Duration>,
  calls: RwLock<usize>,
}

impl SimulatedCardNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the provider-side status, e.g. after the customer pays.
  pub fn set_status(&self, intent_id: &str, status: &str) -> bool {
    match self.intents.write().get_mut(intent_id) {
      Some(intent) => {
        intent.status = status.to_string();
        true
      }
      None => false,
    }
  }

  /// Registers an intent as if created elsewhere.
  pub fn insert(&self, intent: PaymentIntent) {
    self.intents.write().insert(intent.id.clone(), intent);
  }

  pub fn set_latency(&self, latency: Duration) {
    *self.latency.write() = latency;
  }

  /// Number of provider calls made so far.
  pub fn calls(&self) -> usize {
    *self.calls.read()
  }

  async fn round_trip(&self) {
    *self.calls.write() += 1;
    let latency = *self.latency.read();
    if !latency.is_zero() {
      tokio::time::sleep(latency).await;
    }
  }
}

#[async_trait]
impl CardProvider for SimulatedCardNetwork {
  #[instrument(name = "card_sim::create_intent", skip(self, request), fields(order_id = %request.order_id))]
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent> {
    self.round_trip().await;
    if request.amount_cents <= 0 {
      return Err(AppError::Provider("Amount must be greater than zero".to_string()));
    }
    let id = format!("pi_{}", Uuid::new_v4().simple());
    let intent = PaymentIntent {
      id: id.clone(),
      amount: request.amount_cents,
      currency: request.currency.clone(),
      status: "requires_payment_method".to_string(),
      client_secret: Some(format!("{}_secret_{}", id, Uuid::new_v4().simple())),
      metadata: HashMap::from([
        ("order_id".to_string(), request.order_id.to_string()),
        ("user_id".to_string(), request.user_id.to_string()),
      ]),
    };
    self.insert(intent.clone());
    info!(intent_id = %id, "Simulated payment intent created.");
    Ok(intent)
  }

  #[instrument(name = "card_sim::retrieve_intent", skip(self))]
  async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
    self.round_trip().await;
    self
      .intents
      .read()
      .get(intent_id)
      .cloned()
      .ok_or_else(|| AppError::Provider(format!("No such payment intent: {}", intent_id)))
  }
}
