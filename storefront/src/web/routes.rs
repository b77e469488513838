// storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{admin_handlers, order_handlers, payment_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("", web::get().to(order_handlers::list_my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler))
          .route(
            "/{order_id}/status",
            web::put().to(admin_handlers::update_order_status_handler),
          ),
      )
      .service(
        web::scope("/payments")
          .route("/card/confirm", web::post().to(payment_handlers::confirm_card_handler))
          .route("/cod/confirm", web::post().to(payment_handlers::confirm_cash_handler))
          .route("/gateway/notify", web::post().to(payment_handlers::gateway_notify_handler))
          .route("/{order_id}/initiate", web::post().to(payment_handlers::initiate_payment_handler))
          .route("/{order_id}/status", web::get().to(payment_handlers::payment_status_handler)),
      )
      .service(web::scope("/admin").route("/orders", web::get().to(admin_handlers::list_orders_handler))),
  );
}
