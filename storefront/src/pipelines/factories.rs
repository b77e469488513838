// storefront/src/pipelines/factories.rs

//! Per-method payment sub-flows, and the branch extractors that hand them a
//! `PaymentCtx` carved out of the checkout or settlement context.

use crate::errors::AppError;
use crate::payments::{PaymentAdapter, PaymentAdapters};
use crate::pipelines::contexts::{CheckoutCtx, PaymentCtx, PaymentStage, SettlementCtx};
use std::sync::Arc;
use stepflow::{Control, Flow, FlowError, Shared};
use tracing::{debug, info, instrument};

/// One sub-flow per adapter, shared by the checkout and settlement branches.
#[derive(Clone)]
pub struct PaymentFlows {
  pub cash: Arc<Flow<PaymentCtx, AppError>>,
  pub card: Arc<Flow<PaymentCtx, AppError>>,
  pub gateway: Arc<Flow<PaymentCtx, AppError>>,
}

impl PaymentFlows {
  pub fn build(adapters: &PaymentAdapters) -> Self {
    Self {
      cash: payment_flow("payment::cash_on_delivery", adapters.cash.clone()),
      card: payment_flow("payment::card_network", adapters.card.clone()),
      gateway: payment_flow("payment::redirect_gateway", adapters.gateway.clone()),
    }
  }
}

/// Builds the `initiate` / `confirm` flow around one adapter. The stage in
/// the sub-context decides which of the two steps runs.
#[instrument(name = "factory::payment_flow", skip(adapter), fields(method = %adapter.method()))]
pub fn payment_flow(name: &str, adapter: Arc<dyn PaymentAdapter>) -> Arc<Flow<PaymentCtx, AppError>> {
  let mut flow = Flow::<PaymentCtx, AppError>::new(name, &[("initiate", false), ("confirm", false)]);
  flow.skip_if("initiate", |c: &PaymentCtx| c.stage != PaymentStage::Initiate);
  flow.skip_if("confirm", |c: &PaymentCtx| c.stage != PaymentStage::Confirm);

  let initiate_adapter = adapter.clone();
  flow.on("initiate", move |ctx: Shared<PaymentCtx>| {
    let adapter = initiate_adapter.clone();
    async move {
      let order = ctx.read().order.clone();
      let handle = adapter.initiate(&order, order.total_amount_cents).await?;
      info!(order_id = %order.id, method = %adapter.method(), "Payment initiated.");
      ctx.write().handle = Some(handle);
      Ok::<_, AppError>(Control::Continue)
    }
  });

  flow.on("confirm", move |ctx: Shared<PaymentCtx>| {
    let adapter = adapter.clone();
    async move {
      let (order, event) = {
        let guard = ctx.read();
        (guard.order.clone(), guard.event.clone())
      };
      let event = event.ok_or_else(|| AppError::Internal("Confirmation stage without an event".to_string()))?;
      let settlement = adapter.confirm(&order, &event).await?;
      debug!(order_id = %order.id, ?settlement, "Adapter confirmation finished.");
      ctx.write().settlement = Some(settlement);
      Ok::<_, AppError>(Control::Continue)
    }
  });

  info!(flow = name, "Payment sub-flow built.");
  Arc::new(flow)
}

fn missing(what: &str) -> FlowError {
  FlowError::from(anyhow::anyhow!("{} is not available yet", what))
}

/// Branch extractor for checkout: a fresh initiation sub-context, kept on the
/// parent so the after-hook can read the handle back.
pub fn checkout_payment_ctx(ctx: Shared<CheckoutCtx>) -> Result<Shared<PaymentCtx>, FlowError> {
  let order = ctx.read().order.clone().ok_or_else(|| missing("priced order"))?;
  let sub = Shared::new(PaymentCtx::initiate(order));
  ctx.write().payment = Some(sub.clone());
  Ok(sub)
}

/// Branch extractor for settlement: a confirmation sub-context for the loaded
/// order and the incoming event.
pub fn settlement_payment_ctx(ctx: Shared<SettlementCtx>) -> Result<Shared<PaymentCtx>, FlowError> {
  let (order, event) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.event.clone())
  };
  let order = order.ok_or_else(|| missing("loaded order"))?;
  let sub = Shared::new(PaymentCtx::confirm(order, event));
  ctx.write().payment = Some(sub.clone());
  Ok(sub)
}
