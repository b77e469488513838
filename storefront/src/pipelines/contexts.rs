// storefront/src/pipelines/contexts.rs

//! Context structs for the order flows. Handlers receive them wrapped in
//! `stepflow::Shared`.

use crate::models::cart::CartEntry;
use crate::models::order::{Order, OrderItem, OrderStatus, PaymentMethod, ShippingAddress};
use crate::models::user::Principal;
use crate::payments::{ConfirmationEvent, PaymentHandle, Settlement};
use crate::state::AppState;
use serde::Deserialize;
use stepflow::Shared;
use uuid::Uuid;

/// Which half of an adapter a payment sub-flow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
  Initiate,
  Confirm,
}

/// Sub-context handed to the per-method payment flows.
#[derive(Debug, Clone)]
pub struct PaymentCtx {
  pub stage: PaymentStage,
  pub order: Order,
  pub event: Option<ConfirmationEvent>,
  pub handle: Option<PaymentHandle>,
  pub settlement: Option<Settlement>,
}

impl PaymentCtx {
  pub fn initiate(order: Order) -> Self {
    Self {
      stage: PaymentStage::Initiate,
      order,
      event: None,
      handle: None,
      settlement: None,
    }
  }

  pub fn confirm(order: Order, event: ConfirmationEvent) -> Self {
    Self {
      stage: PaymentStage::Confirm,
      order,
      event: Some(event),
      handle: None,
      settlement: None,
    }
  }
}

/// Body of a checkout request. `items == None` uses the stored cart.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
  #[serde(default)]
  pub items: Option<Vec<CartEntry>>,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,
}

#[derive(Clone)]
pub struct CheckoutCtx {
  pub app_state: AppState,
  pub principal: Principal,
  pub request: PlaceOrderRequest,
  pub lines: Vec<OrderItem>,
  pub order: Option<Order>,
  pub payment: Option<Shared<PaymentCtx>>,
  pub handle: Option<PaymentHandle>,
}

impl CheckoutCtx {
  pub fn new(app_state: AppState, principal: Principal, request: PlaceOrderRequest) -> Self {
    Self {
      app_state,
      principal,
      request,
      lines: Vec::new(),
      order: None,
      payment: None,
      handle: None,
    }
  }
}

/// Who is asking for a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
  Principal(Principal),
  /// Unauthenticated gateway notification; only the signature counts.
  Gateway,
}

#[derive(Clone)]
pub struct SettlementCtx {
  pub app_state: AppState,
  pub caller: Caller,
  pub order_id: Uuid,
  pub event: ConfirmationEvent,
  pub order: Option<Order>,
  pub payment: Option<Shared<PaymentCtx>>,
  pub settlement: Option<Settlement>,
  pub already_paid: bool,
  pub inventory_applied: bool,
  pub notified: bool,
}

impl SettlementCtx {
  pub fn new(app_state: AppState, caller: Caller, order_id: Uuid, event: ConfirmationEvent) -> Self {
    Self {
      app_state,
      caller,
      order_id,
      event,
      order: None,
      payment: None,
      settlement: None,
      already_paid: false,
      inventory_applied: false,
      notified: false,
    }
  }
}

#[derive(Clone)]
pub struct CancellationCtx {
  pub app_state: AppState,
  pub principal: Principal,
  pub order_id: Uuid,
  pub order: Option<Order>,
  /// Already cancelled but still holding stock from a restore that failed.
  pub resuming_restore: bool,
  pub inventory_restored: bool,
}

impl CancellationCtx {
  pub fn new(app_state: AppState, principal: Principal, order_id: Uuid) -> Self {
    Self {
      app_state,
      principal,
      order_id,
      order: None,
      resuming_restore: false,
      inventory_restored: false,
    }
  }
}

#[derive(Clone)]
pub struct StatusUpdateCtx {
  pub app_state: AppState,
  pub principal: Principal,
  pub order_id: Uuid,
  pub requested: String,
  pub target: Option<OrderStatus>,
  pub order: Option<Order>,
  pub cancellation: Option<Shared<CancellationCtx>>,
}

impl StatusUpdateCtx {
  pub fn new(app_state: AppState, principal: Principal, order_id: Uuid, requested: impl Into<String>) -> Self {
    Self {
      app_state,
      principal,
      order_id,
      requested: requested.into(),
      target: None,
      order: None,
      cancellation: None,
    }
  }
}
