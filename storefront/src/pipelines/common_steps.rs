// storefront/src/pipelines/common_steps.rs

//! Steps and helpers shared between the order flows.

use crate::errors::{AppError, Result as AppResult};
use crate::models::format_cents;
use crate::models::order::Order;
use crate::models::user::Principal;
use crate::pipelines::contexts::SettlementCtx;
use crate::services::notifier::Notification;
use crate::state::AppState;
use stepflow::{Control, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Fetches an order or fails with `OrderNotFound`.
pub async fn fetch_order(state: &AppState, order_id: Uuid) -> AppResult<Order> {
  state
    .stores
    .orders
    .get(order_id)
    .await?
    .ok_or(AppError::OrderNotFound(order_id))
}

/// Owner-or-admin check used by the read and cancel paths.
pub fn ensure_owner_or_admin(principal: &Principal, order: &Order) -> AppResult<()> {
  if principal.is_admin() || order.is_owned_by(principal.user_id) {
    Ok(())
  } else {
    warn!(user_id = %principal.user_id, order_id = %order.id, "Principal does not own the order.");
    Err(AppError::AccessDenied("Not authorized to access this order".to_string()))
  }
}

fn confirmation_body(name: &str, order: &Order) -> String {
  let lines: String = order
    .items
    .iter()
    .map(|item| {
      format!(
        "<li>{} x {} ({} {})</li>",
        item.quantity,
        item.name,
        format_cents(item.line_total_cents()),
        order.currency
      )
    })
    .collect();
  format!(
    "<p>Hi {},</p><p>Your order #{} is confirmed.</p><ul>{}</ul><p>Total: {} {}</p>",
    name,
    order.id,
    lines,
    format_cents(order.total_amount_cents),
    order.currency
  )
}

/// Sends the order confirmation. A delivery failure is logged and the flow
/// continues; the order is already settled at this point.
#[instrument(name = "common_step::send_order_confirmation", skip(ctx))]
pub async fn send_order_confirmation(ctx: Shared<SettlementCtx>) -> AppResult<Control> {
  let (state, order) = {
    let guard = ctx.read();
    (guard.app_state.clone(), guard.order.clone())
  };
  let Some(order) = order else {
    warn!("No settled order to notify about.");
    return Ok(Control::Continue);
  };

  let (to, name) = match state.stores.users.get_user(order.user_id).await {
    Ok(Some(user)) => (user.email, user.name),
    Ok(None) => (
      order.shipping_address.email.clone(),
      order.shipping_address.full_name.clone(),
    ),
    Err(e) => {
      warn!(order_id = %order.id, error = %e, "User lookup failed; using the shipping contact.");
      (
        order.shipping_address.email.clone(),
        order.shipping_address.full_name.clone(),
      )
    }
  };

  let notification = Notification {
    to,
    subject: format!("Your order #{} is confirmed", order.id),
    html_body: confirmation_body(&name, &order),
  };
  match state.notifier.send(notification).await {
    Ok(sent) => {
      info!(order_id = %order.id, message_id = %sent.message_id, "Order confirmation sent.");
      ctx.write().notified = true;
    }
    Err(e) => warn!(order_id = %order.id, error = %e, "Order confirmation failed to send."),
  }
  Ok(Control::Continue)
}
