// storefront/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::payments::{GatewayNotification, Settlement};
use crate::services::orders;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct CardConfirmRequest {
  pub order_id: Uuid,
  #[serde(alias = "payment_intent_id")]
  pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CashConfirmRequest {
  pub order_id: Uuid,
}

pub async fn initiate_payment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = order_id.into_inner();
  let handle = orders::initiate_payment(app_state.get_ref(), auth_user.0, order_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "order_id": order_id, "payment": handle })))
}

#[instrument(
    name = "handler::confirm_card",
    skip(app_state, auth_user, payload),
    fields(user_id = %auth_user.0.user_id, order_id = %payload.order_id)
)]
pub async fn confirm_card_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CardConfirmRequest>,
) -> Result<HttpResponse, AppError> {
  let CardConfirmRequest {
    order_id,
    transaction_id,
  } = payload.into_inner();
  let settled = orders::confirm_card_payment(app_state.get_ref(), auth_user.0, order_id, transaction_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": if settled.duplicate { "Payment already confirmed." } else { "Payment confirmed." },
    "order": settled.order,
  })))
}

pub async fn confirm_cash_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CashConfirmRequest>,
) -> Result<HttpResponse, AppError> {
  let settled = orders::confirm_cash_on_delivery(app_state.get_ref(), auth_user.0, payload.order_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Cash on delivery order confirmed.",
    "order": settled.order,
  })))
}

fn plain(status: actix_web::http::StatusCode, body: &'static str) -> HttpResponse {
  HttpResponse::build(status).content_type("text/plain; charset=utf-8").body(body)
}

/// The gateway posts form fields and reads a plain-text acknowledgement; it
/// never receives a JSON error body.
#[instrument(
    name = "handler::gateway_notify",
    skip(app_state, form),
    fields(order_id = %form.order_id, status_code = %form.status_code)
)]
pub async fn gateway_notify_handler(
  app_state: web::Data<AppState>,
  form: web::Form<GatewayNotification>,
) -> HttpResponse {
  use actix_web::http::StatusCode;

  match orders::handle_gateway_notification(app_state.get_ref(), form.into_inner()).await {
    Ok(settled) => {
      match &settled.settlement {
        Some(Settlement::Paid(_)) => info!(order_id = %settled.order.id, "Gateway payment settled."),
        Some(Settlement::Pending(_)) => info!(order_id = %settled.order.id, "Gateway payment pending."),
        Some(Settlement::Failed(info)) => {
          warn!(order_id = %settled.order.id, status = %info.status, "Gateway reported a failed payment.")
        }
        None => info!(order_id = %settled.order.id, "Duplicate gateway notification ignored."),
      }
      plain(StatusCode::OK, "OK")
    }
    Err(AppError::InvalidSignature(_)) => plain(StatusCode::BAD_REQUEST, "Invalid hash"),
    Err(AppError::OrderNotFound(_)) => plain(StatusCode::NOT_FOUND, "Order not found"),
    Err(AppError::Validation(_)) => plain(StatusCode::BAD_REQUEST, "Invalid notification"),
    Err(e) => {
      warn!(error = %e, "Gateway notification could not be processed.");
      plain(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }
  }
}

pub async fn payment_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let status = orders::payment_status(app_state.get_ref(), auth_user.0, order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(status))
}
