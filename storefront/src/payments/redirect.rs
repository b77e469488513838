// storefront/src/payments/redirect.rs

//! Redirect gateway: the browser posts a signed form to the hosted checkout
//! page and the gateway later posts a signed notification back.
//!
//! Signatures are upper-case hex MD5 digests over the concatenated fields
//! followed by the merchant secret, which is the gateway's wire format.

use super::{ConfirmationEvent, GatewayNotification, PaymentAdapter, PaymentHandle, Settlement};
use crate::config::GatewayConfig;
use crate::errors::{AppError, Result};
use crate::models::order::{Order, PaymentInfo, PaymentMethod};
use crate::models::{format_cents, parse_cents};
use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Status codes posted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
  Success,
  Pending,
  /// `-1` cancelled, `-2` failed, `-3` charged back, or anything unknown.
  Failed(String),
}

impl GatewayStatus {
  pub fn from_code(code: &str) -> Self {
    match code.trim() {
      "2" => GatewayStatus::Success,
      "0" => GatewayStatus::Pending,
      other => GatewayStatus::Failed(other.to_string()),
    }
  }
}

/// The form posted to the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedirectPayload {
  pub merchant_id: String,
  pub return_url: String,
  pub cancel_url: String,
  pub notify_url: String,
  pub order_id: String,
  pub items: String,
  pub currency: String,
  pub amount: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub city: String,
  pub country: String,
  pub hash: String,
}

pub struct RedirectGateway {
  config: GatewayConfig,
}

fn md5_upper_hex(input: &str) -> String {
  hex::encode_upper(Md5::digest(input.as_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
  if a.len() != b.len() {
    return false;
  }
  let mut diff = 0u8;
  for (x, y) in a.bytes().zip(b.bytes()) {
    diff |= x ^ y;
  }
  diff == 0
}

/// `****-****-****-NNNN` from whatever the gateway reports.
pub fn mask_card(card_no: &str) -> Option<String> {
  let digits: Vec<char> = card_no.chars().filter(|c| c.is_ascii_digit()).collect();
  if digits.len() < 4 {
    return None;
  }
  let last4: String = digits[digits.len() - 4..].iter().collect();
  Some(format!("****-****-****-{}", last4))
}

impl RedirectGateway {
  pub fn new(config: GatewayConfig) -> Self {
    Self { config }
  }

  pub fn checkout_hash(&self, order_id: &str, amount: &str, currency: &str) -> String {
    md5_upper_hex(&format!(
      "{}{}{}{}{}",
      self.config.merchant_id, order_id, amount, currency, self.config.merchant_secret
    ))
  }

  pub fn notification_hash(&self, n: &GatewayNotification) -> String {
    md5_upper_hex(&format!(
      "{}{}{}{}{}{}",
      n.merchant_id, n.order_id, n.amount, n.currency, n.status_code, self.config.merchant_secret
    ))
  }

  /// Fails closed with `InvalidSignature` unless the notification carries our
  /// merchant id and a matching signature.
  pub fn authenticate(&self, n: &GatewayNotification) -> Result<()> {
    if !self.config.is_configured() {
      warn!(order_id = %n.order_id, "Gateway notification received but no merchant credentials are configured.");
      return Err(AppError::InvalidSignature(n.order_id.clone()));
    }
    if n.merchant_id != self.config.merchant_id {
      warn!(order_id = %n.order_id, "Gateway notification for a different merchant.");
      return Err(AppError::InvalidSignature(n.order_id.clone()));
    }
    let expected = self.notification_hash(n);
    if !constant_time_eq(&expected, &n.signature.trim().to_ascii_uppercase()) {
      warn!(order_id = %n.order_id, "Gateway notification signature mismatch.");
      return Err(AppError::InvalidSignature(n.order_id.clone()));
    }
    Ok(())
  }

  fn attempt_info(&self, order: &Order, n: &GatewayNotification, status: &str) -> PaymentInfo {
    let transaction_id = n
      .payment_id
      .clone()
      .filter(|id| !id.is_empty())
      .unwrap_or_else(|| format!("gateway_{}", Uuid::new_v4().simple()));
    let mut info = PaymentInfo::new(transaction_id, status);
    info.email_address = Some(order.shipping_address.email.clone());
    info.method_detail = n.card_no.as_deref().and_then(mask_card).or_else(|| n.method.clone());
    info.card_holder_name = n.card_holder_name.clone();
    info.message = n.status_message.clone();
    info
  }
}

#[async_trait]
impl PaymentAdapter for RedirectGateway {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::RedirectGateway
  }

  #[instrument(name = "gateway::initiate", skip(self, order), fields(order_id = %order.id), err(Display))]
  async fn initiate(&self, order: &Order, amount_cents: i64) -> Result<PaymentHandle> {
    if !self.config.is_configured() {
      return Err(AppError::Config("Redirect gateway merchant credentials are not configured".to_string()));
    }
    let order_id = order.id.to_string();
    let amount = format_cents(amount_cents);
    let currency = self.config.currency.clone();
    let hash = self.checkout_hash(&order_id, &amount, &currency);
    let ship = &order.shipping_address;
    let (first_name, last_name) = ship.first_and_last_name();
    let items = order.items.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", ");

    let payload = RedirectPayload {
      merchant_id: self.config.merchant_id.clone(),
      return_url: self.config.return_url.clone(),
      cancel_url: self.config.cancel_url.clone(),
      notify_url: self.config.notify_url.clone(),
      order_id,
      items,
      currency,
      amount,
      first_name,
      last_name,
      email: ship.email.clone(),
      phone: ship.phone.clone(),
      address: ship.street.clone(),
      city: ship.city.clone(),
      country: ship.country.clone(),
      hash,
    };
    info!(sandbox = self.config.sandbox, "Gateway checkout payload signed.");
    Ok(PaymentHandle::Redirect {
      url: self.config.checkout_url().to_string(),
      payload,
    })
  }

  #[instrument(name = "gateway::confirm", skip(self, order, event), fields(order_id = %order.id), err(Display))]
  async fn confirm(&self, order: &Order, event: &ConfirmationEvent) -> Result<Settlement> {
    let ConfirmationEvent::Gateway(n) = event else {
      return Err(AppError::Validation(format!(
        "Expected a gateway notification, got {}",
        event.method()
      )));
    };
    self.authenticate(n)?;

    match GatewayStatus::from_code(&n.status_code) {
      GatewayStatus::Success => {
        let amount_matches = parse_cents(&n.amount) == Some(order.total_amount_cents);
        let currency_matches = n.currency.eq_ignore_ascii_case(&order.currency);
        if !(amount_matches && currency_matches) {
          warn!(amount = %n.amount, currency = %n.currency, "Gateway reported success for a different amount.");
          let mut info = self.attempt_info(order, n, "failed");
          info.message = Some(format!(
            "paid {} {} but order total is {} {}",
            n.amount,
            n.currency,
            format_cents(order.total_amount_cents),
            order.currency
          ));
          return Ok(Settlement::Failed(info));
        }
        Ok(Settlement::Paid(self.attempt_info(order, n, "completed")))
      }
      GatewayStatus::Pending => Ok(Settlement::Pending(self.attempt_info(order, n, "pending"))),
      GatewayStatus::Failed(code) => {
        info!(status_code = %code, "Gateway reported a failed payment.");
        Ok(Settlement::Failed(self.attempt_info(order, n, "failed")))
      }
    }
  }
}
