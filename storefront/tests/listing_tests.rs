// tests/listing_tests.rs
mod common;

use common::*;
use storefront::errors::AppError;
use storefront::models::order::{OrderStatus, PaymentMethod};
use storefront::models::user::Principal;
use storefront::services::orders;
use storefront::store::Page;
use uuid::Uuid;

#[tokio::test]
async fn customers_page_through_their_own_orders() {
  let h = harness();
  let alice = Principal::customer(Uuid::new_v4());
  let bob = Principal::customer(Uuid::new_v4());
  let tea = h.product("Ceylon Tea", 5_000, 100);

  for _ in 0..3 {
    orders::place_order(
      &h.state,
      alice,
      request(PaymentMethod::CashOnDelivery, Some(vec![entry(&tea, 1)])),
    )
    .await
    .expect("alice checkout");
  }
  orders::place_order(
    &h.state,
    bob,
    request(PaymentMethod::RedirectGateway, Some(vec![entry(&tea, 1)])),
  )
  .await
  .expect("bob checkout");

  let first = orders::list_my_orders(&h.state, alice, Page::new(Some(1), Some(2), 10), None)
    .await
    .expect("page 1");
  assert_eq!(first.orders.len(), 2);
  assert!(first.orders.iter().all(|o| o.user_id == alice.user_id));
  assert!(first.orders[0].created_at >= first.orders[1].created_at);
  assert_eq!(first.pagination.total_orders, 3);
  assert_eq!(first.pagination.total_pages, 2);
  assert!(first.pagination.has_next_page);
  assert!(!first.pagination.has_prev_page);

  let second = orders::list_my_orders(&h.state, alice, Page::new(Some(2), Some(2), 10), None)
    .await
    .expect("page 2");
  assert_eq!(second.orders.len(), 1);
  assert!(!second.pagination.has_next_page);
  assert!(second.pagination.has_prev_page);

  let pending = orders::list_my_orders(&h.state, bob, Page::new(None, None, 10), Some(OrderStatus::Pending))
    .await
    .expect("bob pending");
  assert_eq!(pending.orders.len(), 1);
}

#[tokio::test]
async fn admin_listing_includes_status_totals_and_revenue() {
  let h = harness();
  let alice = Principal::customer(Uuid::new_v4());
  let admin = Principal::admin(Uuid::new_v4());
  let tea = h.product("Ceylon Tea", 5_000, 100);

  orders::place_order(
    &h.state,
    alice,
    request(PaymentMethod::CashOnDelivery, Some(vec![entry(&tea, 2)])),
  )
  .await
  .expect("cod");
  orders::place_order(
    &h.state,
    alice,
    request(PaymentMethod::RedirectGateway, Some(vec![entry(&tea, 1)])),
  )
  .await
  .expect("gateway");

  let err = orders::list_orders(&h.state, alice, Page::new(None, None, 10), None, None)
    .await
    .expect_err("customers cannot");
  assert!(matches!(err, AppError::AccessDenied(_)));

  let page = orders::list_orders(&h.state, admin, Page::new(None, None, 10), None, Some(alice.user_id))
    .await
    .expect("admin listing");
  assert_eq!(page.pagination.total_orders, 2);
  assert_eq!(page.summary.paid_revenue_cents, 11_000);
  let confirmed = page
    .summary
    .by_status
    .iter()
    .find(|t| t.status == OrderStatus::Confirmed)
    .expect("confirmed bucket");
  assert_eq!((confirmed.count, confirmed.total_value_cents), (1, 11_000));
  let pending = page
    .summary
    .by_status
    .iter()
    .find(|t| t.status == OrderStatus::Pending)
    .expect("pending bucket");
  assert_eq!((pending.count, pending.total_value_cents), (1, 6_000));
}

#[tokio::test]
async fn order_reads_are_owner_or_admin() {
  let h = harness();
  let alice = Principal::customer(Uuid::new_v4());
  let mallory = Principal::customer(Uuid::new_v4());
  let admin = Principal::admin(Uuid::new_v4());
  let tea = h.product("Ceylon Tea", 5_000, 100);
  let placed = orders::place_order(
    &h.state,
    alice,
    request(PaymentMethod::RedirectGateway, Some(vec![entry(&tea, 1)])),
  )
  .await
  .expect("checkout");

  assert!(orders::get_order(&h.state, alice, placed.order_id).await.is_ok());
  assert!(orders::get_order(&h.state, admin, placed.order_id).await.is_ok());
  let err = orders::get_order(&h.state, mallory, placed.order_id).await.expect_err("stranger");
  assert!(matches!(err, AppError::AccessDenied(_)));

  let status = orders::payment_status(&h.state, alice, placed.order_id).await.expect("status");
  assert!(!status.is_paid);
  assert_eq!(status.payment_method, PaymentMethod::RedirectGateway);
  assert_eq!(status.status, OrderStatus::Pending);
}
