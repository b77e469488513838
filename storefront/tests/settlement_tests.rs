// tests/settlement_tests.rs
mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use storefront::errors::AppError;
use storefront::models::order::{OrderStatus, PaymentMethod};
use storefront::models::user::Principal;
use std::collections::HashMap;
use storefront::payments::{PaymentHandle, PaymentIntent, Settlement};
use storefront::pipelines::settlement_pipeline::PAID_AFTER_CANCELLATION;
use storefront::services::notifier::LogNotifier;
use storefront::services::orders::{self, PlacedOrder};
use uuid::Uuid;

async fn card_order(h: &Harness, user: Principal, product_qty: i32) -> (PlacedOrder, String, Uuid) {
  let shirt = h.product("Batik Shirt", 10_000, 5);
  h.fill_cart(user.user_id, vec![entry(&shirt, product_qty)]);
  let placed = orders::place_order(&h.state, user, request(PaymentMethod::CardNetwork, None))
    .await
    .expect("card checkout");
  let PaymentHandle::ClientSecret { intent_id, .. } = &placed.payment else {
    panic!("expected a client secret");
  };
  let intent_id = intent_id.clone();
  (placed, intent_id, shirt.id)
}

async fn gateway_order(h: &Harness, user: Principal) -> (PlacedOrder, Uuid) {
  let shirt = h.product("Batik Shirt", 10_000, 5);
  h.fill_cart(user.user_id, vec![entry(&shirt, 2)]);
  let placed = orders::place_order(&h.state, user, request(PaymentMethod::RedirectGateway, None))
    .await
    .expect("gateway checkout");
  (placed, shirt.id)
}

#[tokio::test]
async fn card_confirmation_settles_once() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, user, 2).await;
  assert!(h.cards.set_status(&intent_id, "succeeded"));

  let first = orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id.clone())
    .await
    .expect("card settles");
  assert!(!first.duplicate);
  assert!(matches!(first.settlement, Some(Settlement::Paid(_))));
  assert!(first.order.is_paid);
  assert_eq!(first.order.status, OrderStatus::Confirmed);
  assert_eq!(h.stock(product_id), 3);
  assert_eq!(h.cart_len(user.user_id), 0);

  let second = orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id)
    .await
    .expect("duplicate is a no-op");
  assert!(second.duplicate);
  assert_eq!(second.order.payment_info, first.order.payment_info);
  assert_eq!(second.order.paid_at, first.order.paid_at);
  assert_eq!(h.stock(product_id), 3);
  assert_eq!(h.mail.sent().len(), 1);
}

#[tokio::test]
async fn unfinished_card_payment_is_not_settled() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, user, 2).await;
  h.cards.set_status(&intent_id, "processing");

  let err = orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id)
    .await
    .expect_err("processing is not paid");
  assert!(matches!(err, AppError::PaymentNotCompleted(_)));

  let order = h.order(placed.order_id).await;
  assert!(!order.is_paid);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(h.stock(product_id), 5);
  assert_eq!(h.cart_len(user.user_id), 1);
}

#[tokio::test]
async fn provider_timeout_counts_as_not_completed() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, user, 2).await;
  h.cards.set_status(&intent_id, "succeeded");
  h.cards.set_latency(Duration::from_millis(500));

  let err = orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id)
    .await
    .expect_err("slow provider");
  assert!(matches!(err, AppError::PaymentNotCompleted(_)));
  assert!(!h.order(placed.order_id).await.is_paid);
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn intent_of_another_order_is_rejected() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (first, _, _) = card_order(&h, user, 2).await;
  let (_, other_intent, _) = card_order(&h, user, 3).await;
  h.cards.set_status(&other_intent, "succeeded");

  let err = orders::confirm_card_payment(&h.state, user, first.order_id, other_intent)
    .await
    .expect_err("intent belongs elsewhere");
  assert!(matches!(err, AppError::PaymentNotCompleted(_)));
  assert!(!h.order(first.order_id).await.is_paid);
}

#[tokio::test]
async fn intent_in_another_currency_is_rejected() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, _, product_id) = card_order(&h, user, 2).await;
  h.cards.insert(PaymentIntent {
    id: "pi_usd_intent".to_string(),
    amount: placed.total_amount_cents,
    currency: "usd".to_string(),
    status: "succeeded".to_string(),
    client_secret: Some("pi_usd_intent_secret".to_string()),
    metadata: HashMap::from([("order_id".to_string(), placed.order_id.to_string())]),
  });

  let err = orders::confirm_card_payment(&h.state, user, placed.order_id, "pi_usd_intent".to_string())
    .await
    .expect_err("wrong currency");
  assert!(matches!(err, AppError::PaymentNotCompleted(_)));
  assert!(!h.order(placed.order_id).await.is_paid);
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn only_the_owner_may_confirm() {
  let h = harness();
  let owner = Principal::customer(Uuid::new_v4());
  let stranger = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, owner, 2).await;
  h.cards.set_status(&intent_id, "succeeded");

  let err = orders::confirm_card_payment(&h.state, stranger, placed.order_id, intent_id)
    .await
    .expect_err("not the owner");
  assert!(matches!(err, AppError::AccessDenied(_)));
  assert!(!h.order(placed.order_id).await.is_paid);
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn confirmation_must_match_the_order_method() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, _, _) = card_order(&h, user, 2).await;

  let err = orders::confirm_cash_on_delivery(&h.state, user, placed.order_id)
    .await
    .expect_err("card order");
  assert!(matches!(err, AppError::Validation(_)));

  let err = orders::confirm_card_payment(&h.state, user, Uuid::new_v4(), "pi_missing".to_string())
    .await
    .expect_err("no such order");
  assert!(matches!(err, AppError::OrderNotFound(_)));
}

#[tokio::test]
async fn concurrent_confirmations_decrement_once() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, user, 2).await;
  h.cards.set_status(&intent_id, "succeeded");

  let (a, b) = tokio::join!(
    orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id.clone()),
    orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id.clone()),
  );
  let (a, b) = (a.expect("first call"), b.expect("second call"));
  assert!(a.order.is_paid && b.order.is_paid);
  assert_eq!(a.duplicate as u8 + b.duplicate as u8, 1);
  assert_eq!(h.stock(product_id), 3);
}

#[tokio::test]
async fn oversold_confirmation_is_flagged_on_every_retry() {
  let h = harness();
  let shirt = h.product("Batik Shirt", 10_000, 5);
  let mut placed = Vec::new();
  for _ in 0..2 {
    let user = Principal::customer(Uuid::new_v4());
    h.fill_cart(user.user_id, vec![entry(&shirt, 3)]);
    let order = orders::place_order(&h.state, user, request(PaymentMethod::CardNetwork, None))
      .await
      .expect("card checkout");
    let PaymentHandle::ClientSecret { intent_id, .. } = &order.payment else {
      panic!("expected a client secret");
    };
    h.cards.set_status(intent_id, "succeeded");
    placed.push((user, order.order_id, intent_id.clone()));
  }

  let (first_user, first_id, first_intent) = placed[0].clone();
  orders::confirm_card_payment(&h.state, first_user, first_id, first_intent)
    .await
    .expect("first order takes the stock");
  assert_eq!(h.stock(shirt.id), 2);

  let (user, order_id, intent_id) = placed[1].clone();
  let err = orders::confirm_card_payment(&h.state, user, order_id, intent_id.clone())
    .await
    .expect_err("not enough stock left");
  assert!(matches!(err, AppError::InvariantViolation(_)));
  let order = h.order(order_id).await;
  assert!(order.is_paid);
  assert!(!order.inventory_committed);
  assert_eq!(h.cart_len(user.user_id), 0);
  assert_eq!(h.stock(shirt.id), 2);

  let err = orders::confirm_card_payment(&h.state, user, order_id, intent_id)
    .await
    .expect_err("retry is not a duplicate");
  assert!(matches!(err, AppError::InvariantViolation(_)));
  assert_eq!(h.stock(shirt.id), 2);
}

#[tokio::test]
async fn gateway_success_after_cancellation_is_recorded_for_refund() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, product_id) = gateway_order(&h, user).await;
  let order = orders::cancel_order(&h.state, user, placed.order_id).await.expect("cancel");

  let settled = orders::handle_gateway_notification(&h.state, h.notification(&order, "2"))
    .await
    .expect("gateway gets an acknowledgement");
  assert!(!settled.duplicate);
  let Some(Settlement::Failed(info)) = &settled.settlement else {
    panic!("expected a failed settlement");
  };
  assert_eq!(info.status, PAID_AFTER_CANCELLATION);
  assert!(!settled.order.is_paid);
  assert_eq!(settled.order.status, OrderStatus::Cancelled);

  let stored = h.order(placed.order_id).await;
  let recorded = stored.payment_info.expect("late payment recorded");
  assert_eq!(recorded.status, PAID_AFTER_CANCELLATION);
  assert!(recorded.message.as_deref().is_some_and(|m| m.contains("refund")));
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn card_success_after_cancellation_is_recorded_and_refused() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, intent_id, product_id) = card_order(&h, user, 2).await;
  orders::cancel_order(&h.state, user, placed.order_id).await.expect("cancel");
  h.cards.set_status(&intent_id, "succeeded");

  let err = orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id)
    .await
    .expect_err("cancelled orders cannot settle");
  assert!(matches!(err, AppError::Conflict(_)));
  let stored = h.order(placed.order_id).await;
  assert!(!stored.is_paid);
  assert_eq!(
    stored.payment_info.as_ref().map(|i| i.status.as_str()),
    Some(PAID_AFTER_CANCELLATION)
  );
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn gateway_success_settles_and_duplicates_are_ignored() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, product_id) = gateway_order(&h, user).await;
  let order = h.order(placed.order_id).await;

  let settled = orders::handle_gateway_notification(&h.state, h.notification(&order, "2"))
    .await
    .expect("signed success");
  assert!(settled.order.is_paid);
  let info = settled.order.payment_info.clone().expect("payment info");
  assert_eq!(info.status, "completed");
  assert_eq!(info.method_detail.as_deref(), Some("****-****-****-1292"));
  assert_eq!(h.stock(product_id), 3);
  assert_eq!(h.cart_len(user.user_id), 0);

  let again = orders::handle_gateway_notification(&h.state, h.notification(&order, "2"))
    .await
    .expect("duplicate accepted");
  assert!(again.duplicate);
  assert_eq!(again.order, settled.order);
  assert_eq!(h.stock(product_id), 3);
}

#[tokio::test]
async fn tampered_notifications_never_pay() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, product_id) = gateway_order(&h, user).await;
  let order = h.order(placed.order_id).await;

  let mut forged = h.notification(&order, "0");
  forged.status_code = "2".to_string();
  let err = orders::handle_gateway_notification(&h.state, forged)
    .await
    .expect_err("status changed after signing");
  assert!(matches!(err, AppError::InvalidSignature(_)));

  let mut foreign = h.notification(&order, "2");
  foreign.merchant_id = "9999999".to_string();
  let err = orders::handle_gateway_notification(&h.state, foreign)
    .await
    .expect_err("other merchant");
  assert!(matches!(err, AppError::InvalidSignature(_)));

  let mut lower = h.notification(&order, "2");
  lower.signature = lower.signature.to_lowercase();
  let stored = h.order(placed.order_id).await;
  assert!(!stored.is_paid);
  assert!(stored.payment_info.is_none());
  assert_eq!(h.stock(product_id), 5);

  orders::handle_gateway_notification(&h.state, lower)
    .await
    .expect("case-insensitive signature");
  assert!(h.order(placed.order_id).await.is_paid);
}

#[tokio::test]
async fn pending_and_failed_codes_are_recorded_without_settling() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, product_id) = gateway_order(&h, user).await;
  let order = h.order(placed.order_id).await;

  let pending = orders::handle_gateway_notification(&h.state, h.notification(&order, "0"))
    .await
    .expect("pending accepted");
  assert!(matches!(pending.settlement, Some(Settlement::Pending(_))));
  assert!(!pending.order.is_paid);
  assert_eq!(pending.order.payment_info.as_ref().map(|i| i.status.as_str()), Some("pending"));

  let failed = orders::handle_gateway_notification(&h.state, h.notification(&order, "-2"))
    .await
    .expect("failure accepted");
  assert!(matches!(failed.settlement, Some(Settlement::Failed(_))));
  assert!(!failed.order.is_paid);
  assert_eq!(failed.order.status, OrderStatus::Pending);
  assert_eq!(h.stock(product_id), 5);
  assert_eq!(h.cart_len(user.user_id), 1);
}

#[tokio::test]
async fn signed_success_for_the_wrong_amount_is_recorded_as_failed() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, product_id) = gateway_order(&h, user).await;
  let mut order = h.order(placed.order_id).await;
  order.total_amount_cents = 100;

  let settled = orders::handle_gateway_notification(&h.state, h.notification(&order, "2"))
    .await
    .expect("recorded");
  assert!(matches!(settled.settlement, Some(Settlement::Failed(_))));
  assert!(!h.order(placed.order_id).await.is_paid);
  assert_eq!(h.stock(product_id), 5);
}

#[tokio::test]
async fn notification_failure_does_not_undo_settlement() {
  let h = harness_with(
    test_config(),
    Arc::new(FailingNotifier),
    Arc::new(LogNotifier::new("orders@example.com")),
  );
  let user = Principal::customer(Uuid::new_v4());
  let shirt = h.product("Batik Shirt", 10_000, 5);

  let placed = orders::place_order(
    &h.state,
    user,
    request(PaymentMethod::CashOnDelivery, Some(vec![entry(&shirt, 2)])),
  )
  .await
  .expect("settles despite mail outage");
  assert!(placed.is_paid);
  assert_eq!(h.stock(shirt.id), 3);
}

#[tokio::test]
async fn reissued_card_handle_updates_the_reference() {
  let h = harness();
  let user = Principal::customer(Uuid::new_v4());
  let (placed, first_intent, _) = card_order(&h, user, 2).await;

  let handle = orders::initiate_payment(&h.state, user, placed.order_id)
    .await
    .expect("re-issued");
  let PaymentHandle::ClientSecret { intent_id, .. } = handle else {
    panic!("expected a client secret");
  };
  assert_ne!(intent_id, first_intent);
  assert_eq!(h.order(placed.order_id).await.payment_reference.as_deref(), Some(intent_id.as_str()));

  h.cards.set_status(&intent_id, "succeeded");
  orders::confirm_card_payment(&h.state, user, placed.order_id, intent_id)
    .await
    .expect("settles");
  let err = orders::initiate_payment(&h.state, user, placed.order_id)
    .await
    .expect_err("already paid");
  assert!(matches!(err, AppError::Conflict(_)));
}
