// storefront/src/payments/mod.rs

//! The three payment adapters behind one `PaymentAdapter` capability set.

pub mod card;
pub mod card_http;
pub mod cash;
pub mod redirect;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::order::{Order, PaymentInfo, PaymentMethod};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub use card::CardNetwork;
pub use cash::CashOnDelivery;
pub use redirect::{RedirectGateway, RedirectPayload};

/// What the client needs to finish paying.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentHandle {
  /// Nothing to do client-side (cash on delivery).
  None,
  ClientSecret { intent_id: String, client_secret: String },
  Redirect { url: String, payload: RedirectPayload },
}

/// Fields the redirect gateway posts to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayNotification {
  pub merchant_id: String,
  pub order_id: String,
  #[serde(rename = "payhere_amount")]
  pub amount: String,
  #[serde(rename = "payhere_currency")]
  pub currency: String,
  pub status_code: String,
  #[serde(rename = "md5sig")]
  pub signature: String,
  #[serde(default)]
  pub payment_id: Option<String>,
  #[serde(default)]
  pub method: Option<String>,
  #[serde(default)]
  pub status_message: Option<String>,
  #[serde(default)]
  pub card_holder_name: Option<String>,
  #[serde(default)]
  pub card_no: Option<String>,
}

/// A payment confirmation, resolved against exactly one order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationEvent {
  CashOnDelivery,
  Card { transaction_id: String },
  Gateway(GatewayNotification),
}

impl ConfirmationEvent {
  pub fn method(&self) -> PaymentMethod {
    match self {
      ConfirmationEvent::CashOnDelivery => PaymentMethod::CashOnDelivery,
      ConfirmationEvent::Card { .. } => PaymentMethod::CardNetwork,
      ConfirmationEvent::Gateway(_) => PaymentMethod::RedirectGateway,
    }
  }
}

/// Outcome of `PaymentAdapter::confirm`.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
  Paid(PaymentInfo),
  /// Recorded for audit; the order stays unpaid.
  Pending(PaymentInfo),
  Failed(PaymentInfo),
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
  fn method(&self) -> PaymentMethod;

  async fn initiate(&self, order: &Order, amount_cents: i64) -> Result<PaymentHandle>;

  /// Must not touch the order; the settlement flow applies the result.
  async fn confirm(&self, order: &Order, event: &ConfirmationEvent) -> Result<Settlement>;
}

/// A card network payment intent as the provider reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntent {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  pub status: String,
  #[serde(default)]
  pub client_secret: Option<String>,
  #[serde(default)]
  pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct IntentRequest {
  pub amount_cents: i64,
  pub currency: String,
  pub order_id: Uuid,
  pub user_id: Uuid,
}

/// The card network's API surface.
#[async_trait]
pub trait CardProvider: Send + Sync {
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent>;
  async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}

pub struct PaymentAdapters {
  pub cash: Arc<CashOnDelivery>,
  pub card: Arc<CardNetwork>,
  pub gateway: Arc<RedirectGateway>,
}

impl PaymentAdapters {
  pub fn new(config: &AppConfig, card_provider: Arc<dyn CardProvider>) -> Self {
    Self {
      cash: Arc::new(CashOnDelivery),
      card: Arc::new(CardNetwork::new(config.card.clone(), card_provider)),
      gateway: Arc::new(RedirectGateway::new(config.gateway.clone())),
    }
  }

  pub fn for_method(&self, method: PaymentMethod) -> Arc<dyn PaymentAdapter> {
    match method {
      PaymentMethod::CashOnDelivery => self.cash.clone(),
      PaymentMethod::CardNetwork => self.card.clone(),
      PaymentMethod::RedirectGateway => self.gateway.clone(),
    }
  }
}
