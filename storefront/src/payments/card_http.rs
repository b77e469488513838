// storefront/src/payments/card_http.rs

//! HTTP client for a Stripe-compatible payment intents API.

use super::{CardProvider, IntentRequest, PaymentIntent};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

pub struct HttpCardProvider {
  client: reqwest::Client,
  api_base: String,
  api_key: String,
}

impl HttpCardProvider {
  pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      api_base: api_base.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    })
  }
}

#[async_trait]
impl CardProvider for HttpCardProvider {
  #[instrument(name = "card_http::create_intent", skip(self, request), fields(order_id = %request.order_id), err)]
  async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent> {
    let form = [
      ("amount", request.amount_cents.to_string()),
      ("currency", request.currency.clone()),
      ("metadata[order_id]", request.order_id.to_string()),
      ("metadata[user_id]", request.user_id.to_string()),
      ("automatic_payment_methods[enabled]", "true".to_string()),
    ];
    let intent = self
      .client
      .post(format!("{}/v1/payment_intents", self.api_base))
      .bearer_auth(&self.api_key)
      .form(&form)
      .send()
      .await?
      .error_for_status()?
      .json::<PaymentIntent>()
      .await?;
    Ok(intent)
  }

  #[instrument(name = "card_http::retrieve_intent", skip(self), err)]
  async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
    if intent_id.is_empty() || !intent_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      return Err(AppError::Validation(format!("Malformed payment intent id '{}'", intent_id)));
    }
    let intent = self
      .client
      .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
      .bearer_auth(&self.api_key)
      .send()
      .await?
      .error_for_status()?
      .json::<PaymentIntent>()
      .await?;
    Ok(intent)
  }
}
