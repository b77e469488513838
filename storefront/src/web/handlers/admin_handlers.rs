// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::order_handlers::ListOrdersQuery;
use crate::errors::AppError;
use crate::services::orders;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
  pub status: String,
}

#[instrument(
    name = "handler::update_order_status",
    skip(app_state, auth_user, payload),
    fields(user_id = %auth_user.0.user_id, requested = %payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  order_id: web::Path<Uuid>,
  payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
  let order =
    orders::update_order_status(app_state.get_ref(), auth_user.0, order_id.into_inner(), &payload.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Order status updated.", "order": order })))
}

pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = orders::list_orders(
    app_state.get_ref(),
    auth_user.0,
    query.page(),
    query.status()?,
    query.user_id,
  )
  .await?;
  Ok(HttpResponse::Ok().json(page))
}
