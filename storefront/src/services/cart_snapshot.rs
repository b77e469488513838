// storefront/src/services/cart_snapshot.rs

//! Turns cart entries into frozen order lines. Reads the catalog only.

use crate::errors::{AppError, Result};
use crate::models::cart::CartEntry;
use crate::models::order::OrderItem;
use crate::models::product::Product;
use crate::store::Catalog;
use futures_util::future::try_join_all;
use std::collections::HashMap;
use tracing::{instrument, warn};
use uuid::Uuid;

#[instrument(name = "cart_snapshot", skip(catalog, entries), fields(entries = entries.len()), err(Display))]
pub async fn snapshot_lines(catalog: &dyn Catalog, entries: &[CartEntry]) -> Result<Vec<OrderItem>> {
  let entries: Vec<&CartEntry> = entries
    .iter()
    .filter(|e| {
      if e.quantity <= 0 {
        warn!(product_id = %e.product_id, quantity = e.quantity, "Dropping cart entry with no quantity.");
      }
      e.quantity > 0
    })
    .collect();
  if entries.is_empty() {
    return Err(AppError::EmptyCart);
  }

  let products: Vec<Product> = try_join_all(entries.iter().map(|e| async move {
    catalog
      .get_product(e.product_id)
      .await?
      .ok_or(AppError::ProductNotFound(e.product_id))
  }))
  .await?;

  let mut requested: HashMap<Uuid, i32> = HashMap::new();
  for (entry, product) in entries.iter().zip(&products) {
    if !product.in_stock {
      return Err(AppError::OutOfStock {
        product_id: product.id,
        name: product.name.clone(),
      });
    }
    let total = requested.entry(product.id).or_default();
    *total += entry.quantity;
    if *total > product.stock_quantity {
      return Err(AppError::InsufficientStock {
        product_id: product.id,
        name: product.name.clone(),
        requested: *total,
        available: product.stock_quantity,
      });
    }
  }

  Ok(
    entries
      .into_iter()
      .zip(products)
      .map(|(entry, product)| OrderItem {
        product_id: product.id,
        name: product.name,
        unit_price_cents: product.price_cents,
        size: entry.size.clone(),
        quantity: entry.quantity,
        image_ref: product.image_ref,
      })
      .collect(),
  )
}
