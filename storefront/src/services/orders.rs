// storefront/src/services/orders.rs

//! Order operations exposed to the HTTP layer. Each one either runs a
//! registered flow or reads through the order store.

use crate::errors::{AppError, Result};
use crate::models::order::{Order, OrderStatus, PaymentInfo, PaymentMethod};
use crate::models::user::Principal;
use crate::payments::{ConfirmationEvent, GatewayNotification, PaymentHandle, Settlement};
use crate::pipelines::common_steps::{ensure_owner_or_admin, fetch_order};
use crate::pipelines::contexts::{
  CancellationCtx, Caller, CheckoutCtx, PlaceOrderRequest, SettlementCtx, StatusUpdateCtx,
};
use crate::state::AppState;
use crate::store::{OrderFilter, OrderSummary, Page};
use chrono::{DateTime, Utc};
use serde::Serialize;
use stepflow::{Outcome, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// What the client gets back from checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
  pub order_id: Uuid,
  pub status: OrderStatus,
  pub is_paid: bool,
  pub payment_method: PaymentMethod,
  pub subtotal_cents: i64,
  pub shipping_fee_cents: i64,
  pub total_amount_cents: i64,
  pub currency: String,
  pub payment: PaymentHandle,
}

/// Result of one settlement run.
#[derive(Debug, Clone)]
pub struct SettledOrder {
  pub order: Order,
  /// The order was already paid; nothing changed.
  pub duplicate: bool,
  /// `None` when the idempotency gate stopped the run before the adapter.
  pub settlement: Option<Settlement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusView {
  pub order_id: Uuid,
  pub is_paid: bool,
  pub paid_at: Option<DateTime<Utc>>,
  pub payment_method: PaymentMethod,
  pub payment_info: Option<PaymentInfo>,
  pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub current_page: u32,
  pub total_pages: u64,
  pub total_orders: u64,
  pub has_next_page: bool,
  pub has_prev_page: bool,
}

impl Pagination {
  pub fn new(page: Page, total_orders: u64) -> Self {
    let total_pages = total_orders.div_ceil(u64::from(page.limit));
    Self {
      current_page: page.number,
      total_pages,
      total_orders,
      has_next_page: u64::from(page.number) < total_pages,
      has_prev_page: page.number > 1,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
  pub orders: Vec<Order>,
  pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminOrderPage {
  pub orders: Vec<Order>,
  pub pagination: Pagination,
  pub summary: OrderSummary,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[instrument(name = "orders::place", skip(state, request), fields(user_id = %principal.user_id, method = %request.payment_method), err(Display))]
pub async fn place_order(state: &AppState, principal: Principal, request: PlaceOrderRequest) -> Result<PlacedOrder> {
  let ctx = Shared::new(CheckoutCtx::new(state.clone(), principal, request));
  state.flows.run(ctx.clone()).await?;

  let guard = ctx.read();
  let order = guard
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("Checkout finished without an order".to_string()))?;
  info!(order_id = %order.id, status = %order.status, "Order placed.");
  Ok(PlacedOrder {
    order_id: order.id,
    status: order.status,
    is_paid: order.is_paid,
    payment_method: order.payment_method,
    subtotal_cents: order.subtotal_cents,
    shipping_fee_cents: order.shipping_fee_cents,
    total_amount_cents: order.total_amount_cents,
    currency: order.currency.clone(),
    payment: guard.handle.clone().unwrap_or(PaymentHandle::None),
  })
}

/// Issues a fresh handle for an unpaid card or gateway order.
#[instrument(name = "orders::initiate_payment", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn initiate_payment(state: &AppState, principal: Principal, order_id: Uuid) -> Result<PaymentHandle> {
  let order = fetch_order(state, order_id).await?;
  if !order.is_owned_by(principal.user_id) {
    return Err(AppError::AccessDenied("Not authorized to pay for this order".to_string()));
  }
  if order.is_paid {
    return Err(AppError::Conflict(format!("Order {} is already paid", order_id)));
  }
  if order.status == OrderStatus::Cancelled {
    return Err(AppError::Conflict(format!("Order {} is cancelled", order_id)));
  }
  if order.payment_method == PaymentMethod::CashOnDelivery {
    return Err(AppError::Validation(
      "Cash on delivery orders do not take an online payment".to_string(),
    ));
  }

  let adapter = state.payments.for_method(order.payment_method);
  let handle = adapter.initiate(&order, order.total_amount_cents).await?;
  if let PaymentHandle::ClientSecret { intent_id, .. } = &handle {
    state.stores.orders.set_payment_reference(order_id, intent_id).await?;
  }
  info!(method = %order.payment_method, "Payment handle re-issued.");
  Ok(handle)
}

async fn settle(state: &AppState, caller: Caller, order_id: Uuid, event: ConfirmationEvent) -> Result<SettledOrder> {
  let ctx = Shared::new(SettlementCtx::new(state.clone(), caller, order_id, event));
  let outcome = state.flows.run(ctx.clone()).await?;

  let guard = ctx.read();
  let order = guard.order.clone().ok_or(AppError::OrderNotFound(order_id))?;
  let settled = SettledOrder {
    order,
    duplicate: guard.already_paid,
    settlement: guard.settlement.clone(),
  };
  if outcome == Outcome::Halted {
    info!(%order_id, duplicate = settled.duplicate, is_paid = settled.order.is_paid, "Settlement stopped early.");
  }
  Ok(settled)
}

#[instrument(name = "orders::confirm_card", skip(state, transaction_id), fields(user_id = %principal.user_id), err(Display))]
pub async fn confirm_card_payment(
  state: &AppState,
  principal: Principal,
  order_id: Uuid,
  transaction_id: String,
) -> Result<SettledOrder> {
  if transaction_id.trim().is_empty() {
    return Err(AppError::Validation("Transaction id is required".to_string()));
  }
  settle(
    state,
    Caller::Principal(principal),
    order_id,
    ConfirmationEvent::Card { transaction_id },
  )
  .await
}

#[instrument(name = "orders::confirm_cod", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn confirm_cash_on_delivery(state: &AppState, principal: Principal, order_id: Uuid) -> Result<SettledOrder> {
  settle(state, Caller::Principal(principal), order_id, ConfirmationEvent::CashOnDelivery).await
}

/// Handles the gateway's server-to-server notification. Only the signature
/// authenticates it.
#[instrument(name = "orders::gateway_notification", skip(state, notification), fields(order_id = %notification.order_id, status_code = %notification.status_code), err(Display))]
pub async fn handle_gateway_notification(state: &AppState, notification: GatewayNotification) -> Result<SettledOrder> {
  let order_id = Uuid::parse_str(notification.order_id.trim()).map_err(|_| {
    warn!("Gateway notification names an unknown order id format.");
    AppError::Validation(format!("Invalid order id '{}'", notification.order_id))
  })?;
  settle(state, Caller::Gateway, order_id, ConfirmationEvent::Gateway(notification)).await
}

#[instrument(name = "orders::cancel", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn cancel_order(state: &AppState, principal: Principal, order_id: Uuid) -> Result<Order> {
  let ctx = Shared::new(CancellationCtx::new(state.clone(), principal, order_id));
  state.flows.run(ctx.clone()).await?;
  let guard = ctx.read();
  guard.order.clone().ok_or(AppError::OrderNotFound(order_id))
}

#[instrument(name = "orders::update_status", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn update_order_status(state: &AppState, principal: Principal, order_id: Uuid, status: &str) -> Result<Order> {
  let ctx = Shared::new(StatusUpdateCtx::new(state.clone(), principal, order_id, status));
  state.flows.run(ctx.clone()).await?;
  let guard = ctx.read();
  guard.order.clone().ok_or(AppError::OrderNotFound(order_id))
}

pub async fn get_order(state: &AppState, principal: Principal, order_id: Uuid) -> Result<Order> {
  let order = fetch_order(state, order_id).await?;
  ensure_owner_or_admin(&principal, &order)?;
  Ok(order)
}

/// Payment view of an order. An unpaid gateway order here may mean the
/// notification never arrived; nothing polls the gateway for it.
pub async fn payment_status(state: &AppState, principal: Principal, order_id: Uuid) -> Result<PaymentStatusView> {
  let order = get_order(state, principal, order_id).await?;
  Ok(PaymentStatusView {
    order_id: order.id,
    is_paid: order.is_paid,
    paid_at: order.paid_at,
    payment_method: order.payment_method,
    payment_info: order.payment_info,
    status: order.status,
  })
}

#[instrument(name = "orders::list_mine", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn list_my_orders(
  state: &AppState,
  principal: Principal,
  page: Page,
  status: Option<OrderStatus>,
) -> Result<OrderPage> {
  let filter = OrderFilter {
    status,
    user_id: Some(principal.user_id),
  };
  let (orders, total) = state.stores.orders.list(&filter, page).await?;
  Ok(OrderPage {
    orders,
    pagination: Pagination::new(page, total),
  })
}

#[instrument(name = "orders::list_all", skip(state), fields(user_id = %principal.user_id), err(Display))]
pub async fn list_orders(
  state: &AppState,
  principal: Principal,
  page: Page,
  status: Option<OrderStatus>,
  user_id: Option<Uuid>,
) -> Result<AdminOrderPage> {
  if !principal.is_admin() {
    return Err(AppError::AccessDenied("Only administrators can list all orders".to_string()));
  }
  let filter = OrderFilter { status, user_id };
  let (orders, total) = state.stores.orders.list(&filter, page).await?;
  let summary = state.stores.orders.status_summary().await?;
  Ok(AdminOrderPage {
    orders,
    pagination: Pagination::new(page, total),
    summary,
  })
}
