// storefront/src/errors.rs

use crate::models::order::OrderStatus;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use stepflow::FlowError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
  // --- Validation ---
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Invalid order status: '{0}'")]
  InvalidStatus(String),

  #[error("Cannot move order from {from} to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  // --- Authorization ---
  #[error("Authentication required: {0}")]
  Unauthenticated(String),

  #[error("Access denied: {0}")]
  AccessDenied(String),

  #[error("Invalid gateway signature for order {0}")]
  InvalidSignature(String),

  // --- Resources ---
  #[error("Order not found: {0}")]
  OrderNotFound(Uuid),

  #[error("Product not found: {0}")]
  ProductNotFound(Uuid),

  // --- Business rules ---
  #[error("Cart has no orderable items")]
  EmptyCart,

  #[error("Product '{name}' is out of stock")]
  OutOfStock { product_id: Uuid, name: String },

  #[error("Insufficient stock for '{name}': requested {requested}, available {available}")]
  InsufficientStock {
    product_id: Uuid,
    name: String,
    requested: i32,
    available: i32,
  },

  #[error("Amount {amount_cents} is below the card minimum of {minimum_cents}")]
  AmountTooSmall { amount_cents: i64, minimum_cents: i64 },

  #[error("Order {0} cannot be cancelled")]
  OrderNotCancellable(Uuid),

  #[error("Payment not completed: {0}")]
  PaymentNotCompleted(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  // --- Fatal ---
  #[error("Invariant violated: {0}")]
  InvariantViolation(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Payment provider error: {0}")]
  Provider(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    AppError::Provider(err.to_string())
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InvalidStatus(_) | AppError::EmptyCart => StatusCode::BAD_REQUEST,
      AppError::OutOfStock { .. } | AppError::InsufficientStock { .. } | AppError::AmountTooSmall { .. } => {
        StatusCode::BAD_REQUEST
      }
      AppError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
      AppError::OrderNotFound(_) | AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
      AppError::PaymentNotCompleted(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::InvalidTransition { .. } | AppError::OrderNotCancellable(_) | AppError::Conflict(_) => {
        StatusCode::CONFLICT
      }
      AppError::Provider(_) => StatusCode::BAD_GATEWAY,
      AppError::InvariantViolation(_)
      | AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    let body = match self {
      AppError::AmountTooSmall {
        amount_cents,
        minimum_cents,
      } => json!({
        "error": self.to_string(),
        "amount_cents": amount_cents,
        "minimum_cents": minimum_cents,
        "suggested_methods": ["cash_on_delivery", "redirect_gateway"],
      }),
      AppError::InsufficientStock {
        product_id,
        requested,
        available,
        ..
      } => json!({
        "error": self.to_string(),
        "product_id": product_id,
        "requested": requested,
        "available": available,
      }),
      AppError::OutOfStock { product_id, .. } => json!({"error": self.to_string(), "product_id": product_id}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed"}),
      AppError::InvariantViolation(_) | AppError::Workflow { .. } | AppError::Internal(_) | AppError::Config(_) => {
        json!({"error": "An internal error occurred"})
      }
      _ => json!({"error": self.to_string()}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
