// tests/inventory_tests.rs
mod common;

use common::*;
use storefront::errors::AppError;
use storefront::models::order::OrderItem;
use storefront::models::product::Product;
use storefront::services::inventory::stock_lines;
use uuid::Uuid;

fn line(product: &Product, quantity: i32) -> OrderItem {
  OrderItem {
    product_id: product.id,
    name: product.name.clone(),
    unit_price_cents: product.price_cents,
    size: None,
    quantity,
    image_ref: None,
  }
}

#[tokio::test]
async fn in_stock_tracks_quantity_through_decrement_and_restore() {
  let h = harness();
  let mug = h.product("Clay Mug", 2_500, 3);
  let order_id = Uuid::new_v4();

  h.state.ledger.decrement(order_id, &[line(&mug, 3)]).await.expect("decrement");
  let after = h.store.product(mug.id).expect("mug");
  assert_eq!(after.stock_quantity, 0);
  assert!(!after.in_stock);

  h.state.ledger.restore(order_id, &[line(&mug, 1)]).await.expect("restore");
  let after = h.store.product(mug.id).expect("mug");
  assert_eq!(after.stock_quantity, 1);
  assert!(after.in_stock);

  h.state.ledger.decrement(order_id, &[line(&mug, 1)]).await.expect("decrement");
  let after = h.store.product(mug.id).expect("mug");
  assert_eq!(after.in_stock, after.stock_quantity > 0);
}

#[tokio::test]
async fn shortfall_is_an_invariant_violation_and_changes_nothing() {
  let h = harness();
  let mug = h.product("Clay Mug", 2_500, 3);
  let bowl = h.product("Clay Bowl", 3_000, 1);

  let err = h
    .state
    .ledger
    .decrement(Uuid::new_v4(), &[line(&mug, 2), line(&bowl, 2)])
    .await
    .expect_err("bowl short");
  assert!(matches!(err, AppError::InvariantViolation(_)));
  assert_eq!(h.stock(mug.id), 3);
  assert_eq!(h.stock(bowl.id), 1);
}

#[tokio::test]
async fn missing_product_is_an_invariant_violation() {
  let h = harness();
  let ghost = Product::new("Ghost", 1_000, 5);

  let err = h
    .state
    .ledger
    .decrement(Uuid::new_v4(), &[line(&ghost, 1)])
    .await
    .expect_err("not in catalog");
  assert!(matches!(err, AppError::InvariantViolation(_)));
}

#[test]
fn stock_lines_merge_sizes_of_one_product() {
  let mug = Product::new("Clay Mug", 2_500, 3);
  let bowl = Product::new("Clay Bowl", 3_000, 1);
  let mut large = line(&mug, 2);
  large.size = Some("L".to_string());

  let lines = stock_lines(&[line(&mug, 1), line(&bowl, 1), large]);
  assert_eq!(lines.len(), 2);
  let mug_line = lines.iter().find(|l| l.product_id == mug.id).expect("mug line");
  assert_eq!(mug_line.quantity, 3);
}
