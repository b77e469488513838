// tests/http_tests.rs
mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::*;
use serde_json::{json, Value};
use storefront::models::order::PaymentMethod;
use storefront::models::user::Principal;
use storefront::services::orders;
use storefront::web::configure_app_routes;
use uuid::Uuid;

macro_rules! app {
  ($h:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($h.state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn checkout_body(product_id: Uuid, quantity: i32, method: &str) -> Value {
  json!({
    "items": [{ "product_id": product_id, "quantity": quantity }],
    "shipping_address": {
      "full_name": "Nimal Perera",
      "email": "nimal@example.com",
      "phone": "+94771234567",
      "street": "42 Galle Road",
      "city": "Colombo",
      "postal_code": "00300",
      "country": "Sri Lanka"
    },
    "payment_method": method
  })
}

#[actix_web::test]
async fn health_check_answers() {
  let h = harness();
  let app = app!(h);
  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn checkout_requires_a_principal() {
  let h = harness();
  let tea = h.product("Ceylon Tea", 5_000, 10);
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .set_json(checkout_body(tea.id, 1, "cash_on_delivery"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn cash_on_delivery_checkout_over_http() {
  let h = harness();
  let tea = h.product("Ceylon Tea", 5_000, 10);
  let user = Uuid::new_v4();
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .insert_header(("X-User-ID", user.to_string()))
    .set_json(checkout_body(tea.id, 2, "cash_on_delivery"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["order"]["is_paid"], json!(true));
  assert_eq!(body["order"]["total_amount_cents"], json!(11_000));
  assert_eq!(body["order"]["payment"]["kind"], json!("none"));
  assert_eq!(h.stock(tea.id), 8);
}

#[actix_web::test]
async fn card_minimum_error_suggests_other_methods() {
  let h = harness();
  let tea = h.product("Ceylon Tea", 5_000, 10);
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .set_json(checkout_body(tea.id, 1, "card_network"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["minimum_cents"], json!(20_000));
  assert_eq!(body["suggested_methods"], json!(["cash_on_delivery", "redirect_gateway"]));
}

#[actix_web::test]
async fn gateway_notifications_get_plain_text_answers() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let shirt = h.product("Batik Shirt", 10_000, 5);
  let placed = orders::place_order(
    &h.state,
    user,
    request(PaymentMethod::RedirectGateway, Some(vec![entry(&shirt, 2)])),
  )
  .await
  .expect("gateway checkout");
  let order = h.order(placed.order_id).await;
  let app = app!(h);

  let mut forged = h.notification(&order, "2");
  forged.amount = "1.00".to_string();
  let req = test::TestRequest::post()
    .uri("/api/v1/payments/gateway/notify")
    .set_form(&forged)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(test::read_body(resp).await, "Invalid hash");
  assert!(!h.order(order.id).await.is_paid);

  for _ in 0..2 {
    let req = test::TestRequest::post()
      .uri("/api/v1/payments/gateway/notify")
      .set_form(h.notification(&order, "2"))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "OK");
  }
  assert!(h.order(order.id).await.is_paid);
  assert_eq!(h.stock(shirt.id), 3);
}

#[actix_web::test]
async fn unfinished_card_payment_maps_to_payment_required() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let shirt = h.product("Batik Shirt", 10_000, 5);
  let placed = orders::place_order(
    &h.state,
    user,
    request(PaymentMethod::CardNetwork, Some(vec![entry(&shirt, 2)])),
  )
  .await
  .expect("card checkout");
  let order = h.order(placed.order_id).await;
  let intent_id = order.payment_reference.clone().expect("intent id");
  h.cards.set_status(&intent_id, "processing");
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/card/confirm")
    .insert_header(("X-User-ID", user.user_id.to_string()))
    .set_json(json!({ "order_id": order.id, "payment_intent_id": intent_id }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
  assert_eq!(h.stock(shirt.id), 5);
}

#[actix_web::test]
async fn status_updates_check_role_and_value() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let tea = h.product("Ceylon Tea", 5_000, 10);
  let placed = orders::place_order(
    &h.state,
    user,
    request(PaymentMethod::CashOnDelivery, Some(vec![entry(&tea, 1)])),
  )
  .await
  .expect("checkout");
  let app = app!(h);
  let uri = format!("/api/v1/orders/{}/status", placed.order_id);

  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header(("X-User-ID", user.user_id.to_string()))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let admin = Uuid::new_v4().to_string();
  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header(("X-User-ID", admin.clone()))
    .insert_header(("X-User-Role", "admin"))
    .set_json(json!({ "status": "teleported" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header(("X-User-ID", admin))
    .insert_header(("X-User-Role", "admin"))
    .set_json(json!({ "status": "cancelled" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["order"]["status"], json!("cancelled"));
  assert_eq!(h.stock(tea.id), 10);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
  let h = harness();
  let app = app!(h);
  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/orders/{}", Uuid::new_v4()))
    .insert_header(("X-User-ID", Uuid::new_v4().to_string()))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
