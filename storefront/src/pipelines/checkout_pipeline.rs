// storefront/src/pipelines/checkout_pipeline.rs
use crate::errors::AppError;
use crate::models::order::{Order, PaymentMethod};
use crate::payments::{ConfirmationEvent, PaymentHandle};
use crate::pipelines::contexts::{Caller, CheckoutCtx, SettlementCtx};
use crate::pipelines::factories::{checkout_payment_ctx, PaymentFlows};
use crate::services::cart_snapshot::snapshot_lines;
use stepflow::{Control, Flow, Shared};
use tracing::{debug, info, warn};

/// Checkout: snapshot the cart, price the order, ask the chosen adapter for a
/// payment handle, persist, and settle right away for cash on delivery.
pub fn build_checkout_flow(payment_flows: &PaymentFlows) -> Flow<CheckoutCtx, AppError> {
  let mut flow = Flow::<CheckoutCtx, AppError>::new(
    "checkout",
    &[
      ("validate_request", false),
      ("snapshot_cart", false),
      ("price_order", false),
      ("initiate_payment", false),
      ("persist_order", false),
      ("settle_cash_on_delivery", false),
    ],
  );

  flow.on("validate_request", |ctx: Shared<CheckoutCtx>| async move {
    let guard = ctx.read();
    guard.request.shipping_address.validate()?;
    if let Some(items) = &guard.request.items {
      if let Some(bad) = items.iter().find(|entry| entry.quantity < 0) {
        return Err(AppError::Validation(format!(
          "Quantity for product {} cannot be negative",
          bad.product_id
        )));
      }
    }
    debug!(user_id = %guard.principal.user_id, method = %guard.request.payment_method, "Checkout request accepted.");
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("snapshot_cart", |ctx: Shared<CheckoutCtx>| async move {
    let (state, user_id, explicit) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.principal.user_id, guard.request.items.clone())
    };
    let entries = match explicit {
      Some(items) => items,
      None => state.stores.carts.get_cart(user_id).await?.items,
    };
    let lines = snapshot_lines(state.stores.catalog.as_ref(), &entries).await?;
    info!(%user_id, lines = lines.len(), "Cart snapshot taken.");
    ctx.write().lines = lines;
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("price_order", |ctx: Shared<CheckoutCtx>| async move {
    let mut guard = ctx.write();
    let config = guard.app_state.config.clone();
    let order = Order::new(
      guard.principal.user_id,
      std::mem::take(&mut guard.lines),
      guard.request.shipping_address.clone(),
      guard.request.payment_method,
      config.store.shipping_fee_cents,
      config.store.currency.clone(),
    );
    info!(
      order_id = %order.id,
      subtotal = order.subtotal_cents,
      shipping = order.shipping_fee_cents,
      total = order.total_amount_cents,
      "Order priced."
    );
    guard.order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  let method_of = |c: &CheckoutCtx| c.request.payment_method;
  flow
    .branch("initiate_payment")
    .route(payment_flows.cash.clone(), checkout_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::CashOnDelivery)
    .route(payment_flows.card.clone(), checkout_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::CardNetwork)
    .route(payment_flows.gateway.clone(), checkout_payment_ctx)
    .when(move |c| method_of(c) == PaymentMethod::RedirectGateway)
    .finish(false);

  flow.after("initiate_payment", |ctx: Shared<CheckoutCtx>| async move {
    let mut guard = ctx.write();
    let handle = guard
      .payment
      .as_ref()
      .and_then(|sub| sub.read().handle.clone())
      .ok_or_else(|| AppError::Internal("Payment adapter returned no handle".to_string()))?;
    if let (PaymentHandle::ClientSecret { intent_id, .. }, Some(order)) = (&handle, guard.order.as_mut()) {
      order.payment_reference = Some(intent_id.clone());
    }
    guard.handle = Some(handle);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("persist_order", |ctx: Shared<CheckoutCtx>| async move {
    let (state, order) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order.clone())
    };
    let order = order.ok_or_else(|| AppError::Internal("No priced order to persist".to_string()))?;
    state.stores.orders.insert(&order).await?;
    info!(order_id = %order.id, user_id = %order.user_id, method = %order.payment_method, "Order stored as pending.");
    Ok::<_, AppError>(Control::Continue)
  });

  flow.skip_if("settle_cash_on_delivery", |c: &CheckoutCtx| {
    c.request.payment_method != PaymentMethod::CashOnDelivery
  });
  flow.on("settle_cash_on_delivery", |ctx: Shared<CheckoutCtx>| async move {
    let (state, principal, order_id) = {
      let guard = ctx.read();
      let order_id = guard
        .order
        .as_ref()
        .map(|o| o.id)
        .ok_or_else(|| AppError::Internal("No order to settle".to_string()))?;
      (guard.app_state.clone(), guard.principal, order_id)
    };
    let settlement = Shared::new(SettlementCtx::new(
      state.clone(),
      Caller::Principal(principal),
      order_id,
      ConfirmationEvent::CashOnDelivery,
    ));
    if let Err(e) = state.flows.run(settlement.clone()).await {
      warn!(%order_id, error = %e, "Cash on delivery settlement failed; order left pending.");
      return Err(e);
    }
    let settled = settlement.read().order.clone();
    ctx.write().order = settled;
    info!(%order_id, "Cash on delivery order settled at checkout.");
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}
