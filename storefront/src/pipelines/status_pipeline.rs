// storefront/src/pipelines/status_pipeline.rs
use crate::errors::AppError;
use crate::models::order::OrderStatus;
use crate::pipelines::common_steps::fetch_order;
use crate::pipelines::contexts::{CancellationCtx, StatusUpdateCtx};
use chrono::Utc;
use std::sync::Arc;
use stepflow::{Control, Flow, FlowError, Shared};
use tracing::{info, warn};

fn is_cancellation(c: &StatusUpdateCtx) -> bool {
  c.target == Some(OrderStatus::Cancelled)
}

fn cancellation_ctx(ctx: Shared<StatusUpdateCtx>) -> Result<Shared<CancellationCtx>, FlowError> {
  let sub = {
    let guard = ctx.read();
    Shared::new(CancellationCtx::new(guard.app_state.clone(), guard.principal, guard.order_id))
  };
  ctx.write().cancellation = Some(sub.clone());
  Ok(sub)
}

/// Administrative status update. `cancelled` is delegated to the
/// cancellation flow; everything else is a forward fulfilment move.
pub fn build_status_update_flow(cancellation: Arc<Flow<CancellationCtx, AppError>>) -> Flow<StatusUpdateCtx, AppError> {
  let mut flow = Flow::<StatusUpdateCtx, AppError>::new(
    "status_update",
    &[
      ("authorize", false),
      ("parse_status", false),
      ("load_order", false),
      ("cancel", false),
      ("advance", false),
    ],
  );

  flow.on("authorize", |ctx: Shared<StatusUpdateCtx>| async move {
    let guard = ctx.read();
    if !guard.principal.is_admin() {
      warn!(user_id = %guard.principal.user_id, "Non-admin attempted a status update.");
      return Err(AppError::AccessDenied("Only administrators can update order status".to_string()));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("parse_status", |ctx: Shared<StatusUpdateCtx>| async move {
    let mut guard = ctx.write();
    let target = guard.requested.trim().to_ascii_lowercase().parse::<OrderStatus>()?;
    guard.target = Some(target);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("load_order", |ctx: Shared<StatusUpdateCtx>| async move {
    let (state, order_id) = {
      let guard = ctx.read();
      (guard.app_state.clone(), guard.order_id)
    };
    let order = fetch_order(&state, order_id).await?;
    ctx.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
    .branch("cancel")
    .route(cancellation, cancellation_ctx)
    .when(is_cancellation)
    .otherwise(Control::Continue)
    .finish(false);

  flow.after("cancel", |ctx: Shared<StatusUpdateCtx>| async move {
    let mut guard = ctx.write();
    let cancelled = guard.cancellation.as_ref().and_then(|sub| sub.read().order.clone());
    if let Some(order) = cancelled {
      guard.order = Some(order);
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.skip_if("advance", is_cancellation);
  flow.on("advance", |ctx: Shared<StatusUpdateCtx>| async move {
    let (state, order_id, from, to) = {
      let guard = ctx.read();
      let from = guard.order.as_ref().map(|o| o.status).ok_or(AppError::OrderNotFound(guard.order_id))?;
      let to = guard
        .target
        .ok_or_else(|| AppError::InvalidStatus(guard.requested.clone()))?;
      (guard.app_state.clone(), guard.order_id, from, to)
    };
    if !from.can_advance_to(to) {
      return Err(AppError::InvalidTransition { from, to });
    }
    if !state.stores.orders.transition(order_id, from, to, Utc::now()).await? {
      warn!(%order_id, %from, %to, "Order status changed during the update.");
      return Err(AppError::Conflict(format!("Order {} is no longer {}", order_id, from)));
    }
    let order = fetch_order(&state, order_id).await?;
    info!(%order_id, %from, %to, "Order status updated.");
    ctx.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}
