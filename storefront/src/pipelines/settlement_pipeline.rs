// storefront/src/pipelines/settlement_pipeline.rs

//! The settlement coordinator. Every step is a hard gate; the order is only
//! written through the store's conditional updates so a duplicate or
//! concurrent confirmation can never pay or decrement twice.

use crate::errors::AppError;
use crate::models::format_cents;
use crate::models::order::{OrderStatus, PaymentMethod};
use crate::payments::{ConfirmationEvent, Settlement};
use crate::pipelines::common_steps::{fetch_order, send_order_confirmation};
use crate::pipelines::contexts::{Caller, SettlementCtx};
use crate::pipelines::factories::{settlement_payment_ctx, PaymentFlows};
use chrono::Utc;
use stepflow::{Control, Flow, Shared};
use tracing::{error, info, warn};

/// Recorded on an order that was cancelled before its payment came through.
pub const PAID_AFTER_CANCELLATION: &str = "paid_after_cancellation";

pub fn build_settlement_flow(payment_flows: &PaymentFlows) -> Flow<SettlementCtx, AppError> {
  let mut flow = Flow::<SettlementCtx, AppError>::new(
    "settlement",
    &[
      ("load_order", false),
      ("authorize", false),
      ("idempotency_gate", false),
      ("confirm_payment", false),
      ("apply_settlement", false),
      ("commit_inventory", false),
      ("clear_cart", false),
      ("notify_customer", true),
    ],
  );

  flow.on("load_order", |ctx: Shared<SettlementCtx>| async move {
    let (state, order_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order_id)
    };
    let order = fetch_order(&state, order_id).await?;
    let mut guard = ctx.write();
    guard.already_paid = order.is_paid;
    guard.order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("authorize", |ctx: Shared<SettlementCtx>| async move {
    let guard = ctx.read();
    let order = guard
      .order
      .as_ref()
      .ok_or(AppError::OrderNotFound(guard.order_id))?;

    match (&guard.caller, &guard.event) {
      (Caller::Gateway, ConfirmationEvent::Gateway(notification)) => {
        guard.app_state.payments.gateway.authenticate(notification)?;
        if notification.order_id != order.id.to_string() {
          warn!(order_id = %order.id, claimed = %notification.order_id, "Signed notification names another order.");
          return Err(AppError::InvalidSignature(notification.order_id.clone()));
        }
      }
      (Caller::Gateway, _) => {
        return Err(AppError::AccessDenied(
          "Only gateway notifications may settle without a principal".to_string(),
        ));
      }
      (Caller::Principal(_), ConfirmationEvent::Gateway(_)) => {
        return Err(AppError::AccessDenied(
          "Gateway notifications are accepted from the gateway only".to_string(),
        ));
      }
      (Caller::Principal(principal), _) => {
        if !order.is_owned_by(principal.user_id) {
          warn!(user_id = %principal.user_id, order_id = %order.id, "Settlement attempted by a non-owner.");
          return Err(AppError::AccessDenied("Not authorized to settle this order".to_string()));
        }
      }
    }

    let method = guard.event.method();
    if method != order.payment_method {
      return Err(AppError::Validation(format!(
        "Order {} was placed with {}, not {}",
        order.id, order.payment_method, method
      )));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("idempotency_gate", |ctx: Shared<SettlementCtx>| async move {
    let guard = ctx.read();
    let Some(order) = guard.order.as_ref().filter(|o| o.is_paid) else {
      return Ok::<_, AppError>(Control::Continue);
    };
    // Paid orders hold their stock until cancelled; anything else means an
    // earlier decrement failed.
    if !order.inventory_committed && order.status != OrderStatus::Cancelled {
      error!(invariant = true, order_id = %order.id, status = %order.status, "Paid order never took its stock.");
      return Err(AppError::InvariantViolation(format!(
        "order {} is paid but its stock was never decremented",
        order.id
      )));
    }
    info!(order_id = %order.id, "Order already paid; confirmation is a no-op.");
    Ok(Control::Halt)
  });

  let method_of = |c: &SettlementCtx| c.event.method();
  flow
    .branch("confirm_payment")
    .route(payment_flows.cash.clone(), settlement_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::CashOnDelivery)
    .route(payment_flows.card.clone(), settlement_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::CardNetwork)
    .route(payment_flows.gateway.clone(), settlement_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::RedirectGateway)
    .finish(false);

  flow.after("confirm_payment", |ctx: Shared<SettlementCtx>| async move {
    let mut guard = ctx.write();
    let settlement = guard
      .payment
      .as_ref()
      .and_then(|sub| sub.read().settlement.clone())
      .ok_or_else(|| AppError::Internal("Payment adapter returned no settlement".to_string()))?;
    guard.settlement = Some(settlement);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("apply_settlement", |ctx: Shared<SettlementCtx>| async move {
    let (state, caller, order_id, settlement) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.caller, guard.order_id, guard.settlement.clone())
    };
    let settlement = settlement.ok_or_else(|| AppError::Internal("No settlement to apply".to_string()))?;
    let orders = &state.stores.orders;

    match settlement {
      Settlement::Paid(payment_info) => {
        if orders.mark_paid(order_id, &payment_info, Utc::now()).await? {
          let order = fetch_order(&state, order_id).await?;
          info!(%order_id, transaction_id = %payment_info.transaction_id, "Order paid and confirmed.");
          ctx.write().order = Some(order);
          return Ok::<_, AppError>(Control::Continue);
        }
        let current = fetch_order(&state, order_id).await?;
        if current.is_paid {
          info!(%order_id, "A concurrent confirmation settled the order first.");
          let mut guard = ctx.write();
          guard.already_paid = true;
          guard.order = Some(current);
          return Ok(Control::Halt);
        }
        if current.status != OrderStatus::Cancelled || current.payment_method == PaymentMethod::CashOnDelivery {
          warn!(%order_id, status = %current.status, "Order can no longer be settled.");
          return Err(AppError::Conflict(format!(
            "Order {} is {} and cannot be settled",
            order_id, current.status
          )));
        }

        let mut info = payment_info;
        info.status = PAID_AFTER_CANCELLATION.to_string();
        info.message = Some(format!(
          "{} {} captured after cancellation; refund required",
          format_cents(current.total_amount_cents),
          current.currency
        ));
        if !orders.record_payment_attempt(order_id, &info).await? {
          info!(%order_id, "Order was paid before the late payment could be recorded.");
        }
        error!(
          refund_required = true,
          %order_id,
          transaction_id = %info.transaction_id,
          "Payment captured for a cancelled order."
        );
        let order = fetch_order(&state, order_id).await?;
        {
          let mut guard = ctx.write();
          guard.order = Some(order);
          guard.settlement = Some(Settlement::Failed(info));
        }
        match caller {
          // The gateway only needs to know the notification was taken.
          Caller::Gateway => Ok(Control::Halt),
          Caller::Principal(_) => Err(AppError::Conflict(format!(
            "Order {} was cancelled before the payment completed; it will be refunded",
            order_id
          ))),
        }
      }
      Settlement::Pending(payment_info) | Settlement::Failed(payment_info) => {
        if !orders.record_payment_attempt(order_id, &payment_info).await? {
          info!(%order_id, "Order was paid before the attempt could be recorded.");
        }
        let order = fetch_order(&state, order_id).await?;
        info!(%order_id, status = %payment_info.status, "Payment attempt recorded; order left unpaid.");
        let mut guard = ctx.write();
        guard.already_paid = order.is_paid;
        guard.order = Some(order);
        Ok(Control::Halt)
      }
    }
  });

  flow.on("commit_inventory", |ctx: Shared<SettlementCtx>| async move {
    let (state, order) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order.clone())
    };
    let order = order.ok_or_else(|| AppError::Internal("No settled order".to_string()))?;
    let orders = &state.stores.orders;

    // `mark_paid` took the claim; this run owes the decrement.
    if let Err(e) = state.ledger.decrement(order.id, &order.items).await {
      error!(invariant = true, order_id = %order.id, error = %e, "Paid order could not take its stock.");
      match orders.release_inventory(order.id).await {
        Ok(true) => {}
        Ok(false) => error!(
          invariant = true,
          order_id = %order.id,
          "Order was cancelled while its stock was being taken; restored stock may be overstated."
        ),
        Err(release) => error!(order_id = %order.id, error = %release, "Releasing the inventory claim failed."),
      }
      // The payment stands, so the cart is spent either way.
      if let Err(clear) = state.stores.carts.clear_cart(order.user_id).await {
        warn!(user_id = %order.user_id, error = %clear, "Cart could not be cleared after a failed decrement.");
      }
      return Err(e);
    }
    ctx.write().inventory_applied = true;
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("clear_cart", |ctx: Shared<SettlementCtx>| async move {
    let (state, user_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order.as_ref().map(|o| o.user_id))
    };
    if let Some(user_id) = user_id {
      state.stores.carts.clear_cart(user_id).await?;
      info!(%user_id, "Cart cleared after settlement.");
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("notify_customer", send_order_confirmation);

  flow
}
