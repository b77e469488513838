// storefront/src/payments/cash.rs
use super::{ConfirmationEvent, PaymentAdapter, PaymentHandle, Settlement};
use crate::errors::{AppError, Result};
use crate::models::order::{Order, PaymentInfo, PaymentMethod};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Pay on delivery: nothing to initiate, confirmation needs no round trip.
pub struct CashOnDelivery;

#[async_trait]
impl PaymentAdapter for CashOnDelivery {
  fn method(&self) -> PaymentMethod {
    PaymentMethod::CashOnDelivery
  }

  async fn initiate(&self, _order: &Order, _amount_cents: i64) -> Result<PaymentHandle> {
    Ok(PaymentHandle::None)
  }

  async fn confirm(&self, order: &Order, event: &ConfirmationEvent) -> Result<Settlement> {
    if !matches!(event, ConfirmationEvent::CashOnDelivery) {
      return Err(AppError::Validation(format!(
        "Expected a cash-on-delivery confirmation, got {}",
        event.method()
      )));
    }
    let mut info = PaymentInfo::new(format!("cod_{}", Uuid::new_v4().simple()), "cash_on_delivery");
    info.email_address = Some(order.shipping_address.email.clone());
    info!(order_id = %order.id, "Cash-on-delivery order accepted.");
    Ok(Settlement::Paid(info))
  }
}
