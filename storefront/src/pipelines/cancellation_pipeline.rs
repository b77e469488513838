// storefront/src/pipelines/cancellation_pipeline.rs
use crate::errors::AppError;
use crate::models::order::OrderStatus;
use crate::pipelines::common_steps::{ensure_owner_or_admin, fetch_order};
use crate::pipelines::contexts::CancellationCtx;
use chrono::Utc;
use stepflow::{Control, Flow, Shared};
use tracing::{debug, error, info, warn};

const TRANSITION_ATTEMPTS: usize = 3;

/// Cancels an order. The status swap happens first; stock comes back only if
/// this run is the one that releases the order's inventory claim. A cancelled
/// order still holding its claim had a restore fail, and cancelling it again
/// retries the restore.
pub fn build_cancellation_flow() -> Flow<CancellationCtx, AppError> {
  let mut flow = Flow::<CancellationCtx, AppError>::new(
    "cancellation",
    &[
      ("load_order", false),
      ("authorize", false),
      ("check_cancellable", false),
      ("transition", false),
      ("restore_inventory", false),
      ("reload", false),
    ],
  );

  flow.on("load_order", |ctx: Shared<CancellationCtx>| async move {
    let (state, order_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order_id)
    };
    let order = fetch_order(&state, order_id).await?;
    ctx.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("authorize", |ctx: Shared<CancellationCtx>| async move {
    let guard = ctx.read();
    let order = guard.order.as_ref().ok_or(AppError::OrderNotFound(guard.order_id))?;
    ensure_owner_or_admin(&guard.principal, order)?;
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("check_cancellable", |ctx: Shared<CancellationCtx>| async move {
    let mut guard = ctx.write();
    let order = guard.order.as_ref().ok_or(AppError::OrderNotFound(guard.order_id))?;
    if order.status == OrderStatus::Cancelled && order.inventory_committed {
      warn!(order_id = %order.id, "Cancelled order still holds its stock; retrying the restore.");
      guard.resuming_restore = true;
      return Ok::<_, AppError>(Control::Continue);
    }
    if order.status.is_terminal() {
      info!(order_id = %order.id, status = %order.status, "Order is past the point of cancellation.");
      return Err(AppError::OrderNotCancellable(order.id));
    }
    Ok(Control::Continue)
  });

  flow.skip_if("transition", |c: &CancellationCtx| c.resuming_restore);

  flow.on("transition", |ctx: Shared<CancellationCtx>| async move {
    let (state, order_id, mut current) = {
      let guard = ctx.read();
      let status = guard.order.as_ref().map(|o| o.status).unwrap_or(OrderStatus::Pending);
      (guard.app_state.clone(), guard.order_id, status)
    };
    for attempt in 1..=TRANSITION_ATTEMPTS {
      if current.is_terminal() {
        return Err(AppError::OrderNotCancellable(order_id));
      }
      if state
        .stores
        .orders
        .transition(order_id, current, OrderStatus::Cancelled, Utc::now())
        .await?
      {
        info!(%order_id, from = %current, "Order cancelled.");
        return Ok::<_, AppError>(Control::Continue);
      }
      debug!(%order_id, attempt, "Status moved underneath the cancellation; retrying.");
      current = fetch_order(&state, order_id).await?.status;
    }
    warn!(%order_id, "Cancellation kept losing the status race.");
    Err(AppError::Conflict(format!("Order {} changed while cancelling; try again", order_id)))
  });

  flow.on("restore_inventory", |ctx: Shared<CancellationCtx>| async move {
    let (state, order_id, resuming) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order_id, guard.resuming_restore)
    };
    let orders = &state.stores.orders;
    if !orders.release_inventory(order_id).await? {
      if resuming {
        info!(%order_id, "Another cancellation restored the stock first.");
        return Err(AppError::OrderNotCancellable(order_id));
      }
      debug!(%order_id, "No stock was taken for this order; nothing to restore.");
      return Ok::<_, AppError>(Control::Continue);
    }
    // Items are frozen at checkout, so the loaded copy is authoritative.
    let items = fetch_order(&state, order_id).await?.items;
    if let Err(e) = state.ledger.restore(order_id, &items).await {
      error!(%order_id, error = %e, "Stock restore failed; keeping the claim so a retry can return it.");
      if !orders.claim_inventory(order_id).await? {
        error!(invariant = true, %order_id, "Inventory claim was retaken during a failed restore.");
      }
      return Err(e);
    }
    ctx.write().inventory_restored = true;
    Ok(Control::Continue)
  });

  flow.on("reload", |ctx: Shared<CancellationCtx>| async move {
    let (state, order_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order_id)
    };
    let order = fetch_order(&state, order_id).await?;
    ctx.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}
