// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::order::OrderStatus;
use crate::pipelines::contexts::PlaceOrderRequest;
use crate::services::orders::{self, DEFAULT_PAGE_SIZE};
use crate::state::AppState;
use crate::store::Page;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub status: Option<String>,
  pub user_id: Option<Uuid>,
}

impl ListOrdersQuery {
  pub fn page(&self) -> Page {
    Page::new(self.page, self.limit, DEFAULT_PAGE_SIZE)
  }

  /// `None`, empty and `all` mean no filter; anything else must be a status.
  pub fn status(&self) -> Result<Option<OrderStatus>, AppError> {
    match self.status.as_deref().map(str::trim) {
      None | Some("") | Some("all") => Ok(None),
      Some(value) => value.to_ascii_lowercase().parse::<OrderStatus>().map(Some),
    }
  }
}

#[instrument(
    name = "handler::place_order",
    skip(app_state, auth_user, payload),
    fields(user_id = %auth_user.0.user_id)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let placed = orders::place_order(app_state.get_ref(), auth_user.0, payload.into_inner()).await?;
  info!(order_id = %placed.order_id, "Checkout accepted.");
  Ok(HttpResponse::Created().json(json!({
    "message": if placed.is_paid { "Order placed and confirmed." } else { "Order placed; awaiting payment." },
    "order": placed,
  })))
}

pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = orders::list_my_orders(app_state.get_ref(), auth_user.0, query.page(), query.status()?).await?;
  Ok(HttpResponse::Ok().json(page))
}

pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = orders::get_order(app_state.get_ref(), auth_user.0, order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
    name = "handler::cancel_order",
    skip(app_state, auth_user),
    fields(user_id = %auth_user.0.user_id)
)]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = orders::cancel_order(app_state.get_ref(), auth_user.0, order_id.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Order cancelled.", "order": order })))
}
