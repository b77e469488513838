// storefront/src/payments/card.rs
use super::{CardProvider, ConfirmationEvent, IntentRequest, PaymentAdapter, PaymentHandle, PaymentIntent, Settlement};
use crate::config::CardNetworkConfig;
use crate::errors::{AppError, Result};
use crate::models::order::{Order, PaymentInfo, PaymentMethod};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

const SUCCEEDED: &str = "succeeded";

/// Card network payment intents. Every provider call is bounded by the
/// configured timeout.
pub struct CardNetwork {
  config: CardNetworkConfig,
  provider: Arc<dyn CardProvider>,
}

impl CardNetwork {
  pub fn new(config: CardNetworkConfig, provider: Arc<dyn CardProvider>) -> Self {
    Self { config, provider }
  }

  /// Rejects amounts below the card floor.
  pub fn check_amount(&self, amount_cents: i64) -> Result<()> {
    if amount_cents < self.config.minimum_amount_cents {
      return Err(AppError::AmountTooSmall {
        amount_cents,
        minimum_cents: self.config.minimum_amount_cents,
      });
    }
    Ok(())
  }

  async fn fetch(&self, intent_id: &str) -> Result<PaymentIntent> {
    match timeout(self.config.timeout, self.provider.retrieve_intent(intent_id)).await {
      Err(_) => {
        warn!(intent_id, timeout_ms = self.config.timeout.as_millis() as u64, "Card provider timed out.");
        Err(AppError::PaymentNotCompleted(
          "card network did not answer in time".to_string(),
        ))
      }
      Ok(Err(e)) => {
        warn!(intent_id, error = %e, "Card provider lookup failed.");
        Err(AppError::PaymentNotCompleted(format!("could not verify payment: {}", e)))
      }
      Ok(Ok(intent)) => Ok(intent),
    }
  }
}

#[async_trait]
impl PaymentAdapter for CardNetwork {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::CardNetwork
  }

  #[instrument(name = "card::initiate", skip(self, order), fields(order_id = %order.id), err(Display))]
  async fn initiate(&self, order: &Order, amount_cents: i64) -> Result<PaymentHandle> {
    self.check_amount(amount_cents)?;
    let request = IntentRequest {
      amount_cents,
      currency: self.config.currency.clone(),
      order_id: order.id,
      user_id: order.user_id,
    };
    let intent = timeout(self.config.timeout, self.provider.create_intent(&request))
      .await
      .map_err(|_| AppError::Provider("card network did not answer in time".to_string()))??;
    let client_secret = intent
      .client_secret
      .clone()
      .ok_or_else(|| AppError::Provider(format!("intent {} has no client secret", intent.id)))?;
    info!(intent_id = %intent.id, "Card payment intent created.");
    Ok(PaymentHandle::ClientSecret {
      intent_id: intent.id,
      client_secret,
    })
  }

  #[instrument(name = "card::confirm", skip(self, order, event), fields(order_id = %order.id), err(Display))]
  async fn confirm(&self, order: &Order, event: &ConfirmationEvent) -> Result<Settlement> {
    let ConfirmationEvent::Card { transaction_id } = event else {
      return Err(AppError::Validation(format!(
        "Expected a card confirmation, got {}",
        event.method()
      )));
    };
    if transaction_id.trim().is_empty() {
      return Err(AppError::Validation("transaction_id is required".to_string()));
    }

    let intent = self.fetch(transaction_id).await?;
    if intent.status != SUCCEEDED {
      info!(intent_id = %intent.id, status = %intent.status, "Card payment not completed.");
      return Err(AppError::PaymentNotCompleted(format!(
        "payment intent {} is '{}'",
        intent.id, intent.status
      )));
    }
    let order_id = order.id.to_string();
    let belongs = intent.metadata.get("order_id") == Some(&order_id)
      && intent.amount == order.total_amount_cents
      && intent.currency.eq_ignore_ascii_case(&order.currency);
    if !belongs {
      warn!(intent_id = %intent.id, "Payment intent does not match the order.");
      return Err(AppError::PaymentNotCompleted(format!(
        "payment intent {} does not belong to order {}",
        intent.id, order.id
      )));
    }

    let mut info = PaymentInfo::new(intent.id, intent.status);
    info.email_address = Some(order.shipping_address.email.clone());
    Ok(Settlement::Paid(info))
  }
}
