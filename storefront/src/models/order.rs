// storefront/src/models/order.rs

//! The order record and its status machine.

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  /// Fulfilment moves an administrator may make. Only forward, only after
  /// settlement; `pending → confirmed` belongs to settlement and
  /// `cancelled` to the cancellation path.
  pub fn can_advance_to(self, next: OrderStatus) -> bool {
    if self == OrderStatus::Pending || self.is_terminal() || next == OrderStatus::Cancelled {
      return false;
    }
    next > self
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| AppError::InvalidStatus(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  CashOnDelivery,
  CardNetwork,
  RedirectGateway,
}

impl PaymentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentMethod::CashOnDelivery => "cash_on_delivery",
      PaymentMethod::CardNetwork => "card_network",
      PaymentMethod::RedirectGateway => "redirect_gateway",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
      "card_network" => Ok(PaymentMethod::CardNetwork),
      "redirect_gateway" => Ok(PaymentMethod::RedirectGateway),
      other => Err(AppError::Validation(format!("Unknown payment method '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
  pub full_name: String,
  pub email: String,
  pub phone: String,
  pub street: String,
  pub city: String,
  #[serde(default)]
  pub region: Option<String>,
  pub postal_code: String,
  pub country: String,
}

impl ShippingAddress {
  pub fn validate(&self) -> Result<(), AppError> {
    let required = [
      ("full_name", &self.full_name),
      ("email", &self.email),
      ("phone", &self.phone),
      ("street", &self.street),
      ("city", &self.city),
      ("postal_code", &self.postal_code),
      ("country", &self.country),
    ];
    let missing: Vec<&str> = required
      .iter()
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(field, _)| *field)
      .collect();
    if !missing.is_empty() {
      return Err(AppError::Validation(format!(
        "Missing shipping fields: {}",
        missing.join(", ")
      )));
    }
    if !self.email.contains('@') {
      return Err(AppError::Validation("Shipping email is not valid".to_string()));
    }
    Ok(())
  }

  /// Splits `full_name` at the first space.
  pub fn first_and_last_name(&self) -> (String, String) {
    let name = self.full_name.trim();
    match name.split_once(' ') {
      Some((first, last)) => (first.to_string(), last.trim().to_string()),
      None => (name.to_string(), String::new()),
    }
  }
}

/// A frozen copy of a catalog item at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
  pub product_id: Uuid,
  pub name: String,
  pub unit_price_cents: i64,
  pub size: Option<String>,
  pub quantity: i32,
  pub image_ref: Option<String>,
}

impl OrderItem {
  pub fn line_total_cents(&self) -> i64 {
    self.unit_price_cents * i64::from(self.quantity)
  }
}

/// Settlement record written by the payment adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
  pub transaction_id: String,
  pub status: String,
  pub updated_at: DateTime<Utc>,
  pub email_address: Option<String>,
  /// Masked card or wallet detail reported by the provider.
  pub method_detail: Option<String>,
  pub card_holder_name: Option<String>,
  pub message: Option<String>,
}

impl PaymentInfo {
  pub fn new(transaction_id: impl Into<String>, status: impl Into<String>) -> Self {
    Self {
      transaction_id: transaction_id.into(),
      status: status.into(),
      updated_at: Utc::now(),
      email_address: None,
      method_detail: None,
      card_holder_name: None,
      message: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<OrderItem>,
  pub shipping_address: ShippingAddress,
  pub payment_method: PaymentMethod,
  pub is_paid: bool,
  pub paid_at: Option<DateTime<Utc>>,
  pub status: OrderStatus,
  pub payment_info: Option<PaymentInfo>,
  /// Provider-side handle (card intent id) issued at initiation.
  pub payment_reference: Option<String>,
  pub subtotal_cents: i64,
  pub shipping_fee_cents: i64,
  pub total_amount_cents: i64,
  pub currency: String,
  /// True while this order's quantities are taken out of stock.
  pub inventory_committed: bool,
  pub created_at: DateTime<Utc>,
  pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
  /// Prices a new `pending` order. Totals are fixed here and never recomputed.
  pub fn new(
    user_id: Uuid,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    shipping_fee_cents: i64,
    currency: impl Into<String>,
  ) -> Self {
    let subtotal_cents = items.iter().map(OrderItem::line_total_cents).sum();
    Self {
      id: Uuid::new_v4(),
      user_id,
      items,
      shipping_address,
      payment_method,
      is_paid: false,
      paid_at: None,
      status: OrderStatus::Pending,
      payment_info: None,
      payment_reference: None,
      subtotal_cents,
      shipping_fee_cents,
      total_amount_cents: subtotal_cents + shipping_fee_cents,
      currency: currency.into(),
      inventory_committed: false,
      created_at: Utc::now(),
      delivered_at: None,
    }
  }

  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.user_id == user_id
  }
}
