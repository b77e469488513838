// storefront/src/store/postgres.rs

//! PostgreSQL backend. Compare-and-swap methods are single conditional
//! `UPDATE`s; `rows_affected() == 1` means this call won.

use super::{
  CartStore, Catalog, InventoryStore, OrderFilter, OrderStore, OrderSummary, Page, StatusTotals, StockChange,
  StockLine, UserDirectory,
};
use crate::errors::{AppError, Result};
use crate::models::cart::{Cart, CartEntry};
use crate::models::order::{Order, OrderItem, OrderStatus, PaymentInfo, ShippingAddress};
use crate::models::product::Product;
use crate::models::user::{Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../schema.sql");

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, is_paid, paid_at, status, \
  payment_info, payment_reference, subtotal_cents, shipping_fee_cents, total_amount_cents, currency, \
  inventory_committed, created_at, delivered_at";

pub struct PgStore {
  pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  items: Json<Vec<OrderItem>>,
  shipping_address: Json<ShippingAddress>,
  payment_method: String,
  is_paid: bool,
  paid_at: Option<DateTime<Utc>>,
  status: String,
  payment_info: Option<Json<PaymentInfo>>,
  payment_reference: Option<String>,
  subtotal_cents: i64,
  shipping_fee_cents: i64,
  total_amount_cents: i64,
  currency: String,
  inventory_committed: bool,
  created_at: DateTime<Utc>,
  delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self> {
    let corrupt = |e: AppError| AppError::Internal(format!("Stored order {} is unreadable: {}", row.id, e));
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      items: row.items.0,
      shipping_address: row.shipping_address.0,
      payment_method: row.payment_method.parse().map_err(corrupt)?,
      is_paid: row.is_paid,
      paid_at: row.paid_at,
      status: row.status.parse().map_err(corrupt)?,
      payment_info: row.payment_info.map(|info| info.0),
      payment_reference: row.payment_reference,
      subtotal_cents: row.subtotal_cents,
      shipping_fee_cents: row.shipping_fee_cents,
      total_amount_cents: row.total_amount_cents,
      currency: row.currency,
      inventory_committed: row.inventory_committed,
      created_at: row.created_at,
      delivered_at: row.delivered_at,
    })
  }
}

impl PgStore {
  /// Connects and applies `schema.sql`.
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    Ok(Self { pool })
  }

  async fn swap(&self, sql: &str, id: Uuid) -> Result<bool> {
    let done = sqlx::query(sql).bind(id).execute(&self.pool).await?;
    Ok(done.rows_affected() == 1)
  }
}

#[async_trait]
impl Catalog for PgStore {
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, price_cents, stock_quantity, in_stock, image_ref FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }
}

#[async_trait]
impl InventoryStore for PgStore {
  #[instrument(name = "pg::decrement", skip(self, lines), fields(lines = lines.len()), err)]
  async fn decrement(&self, lines: &[StockLine]) -> Result<StockChange> {
    let mut tx = self.pool.begin().await?;
    for line in lines {
      let done = sqlx::query(
        "UPDATE products \
         SET stock_quantity = stock_quantity - $2, in_stock = (stock_quantity - $2) > 0 \
         WHERE id = $1 AND stock_quantity >= $2",
      )
      .bind(line.product_id)
      .bind(line.quantity)
      .execute(&mut *tx)
      .await?;
      if done.rows_affected() == 0 {
        let available: Option<i32> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
          .bind(line.product_id)
          .fetch_optional(&mut *tx)
          .await?;
        tx.rollback().await?;
        return Ok(match available {
          Some(available) => StockChange::Shortfall {
            product_id: line.product_id,
            requested: line.quantity,
            available,
          },
          None => StockChange::MissingProduct(line.product_id),
        });
      }
    }
    tx.commit().await?;
    Ok(StockChange::Applied)
  }

  #[instrument(name = "pg::restore", skip(self, lines), fields(lines = lines.len()), err)]
  async fn restore(&self, lines: &[StockLine]) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    for line in lines {
      sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity + $2, in_stock = (stock_quantity + $2) > 0 WHERE id = $1",
      )
      .bind(line.product_id)
      .bind(line.quantity)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn get_cart(&self, user_id: Uuid) -> Result<Cart> {
    let row: Option<(Json<Vec<CartEntry>>, i32, i64)> =
      sqlx::query_as("SELECT items, total_items, total_amount_cents FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(match row {
      Some((items, total_items, total_amount_cents)) => Cart {
        user_id,
        items: items.0,
        total_items,
        total_amount_cents,
      },
      None => Cart::empty(user_id),
    })
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE carts SET items = '[]'::jsonb, total_items = 0, total_amount_cents = 0 WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl UserDirectory for PgStore {
  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let row: Option<(Uuid, String, String, String)> =
      sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
    row
      .map(|(id, name, email, role)| -> Result<User> {
        let role = role.parse::<Role>().map_err(AppError::Internal)?;
        Ok(User { id, name, email, role })
      })
      .transpose()
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn insert(&self, order: &Order) -> Result<()> {
    sqlx::query(&format!(
      "INSERT INTO orders ({ORDER_COLUMNS}) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(Json(&order.items))
    .bind(Json(&order.shipping_address))
    .bind(order.payment_method.as_str())
    .bind(order.is_paid)
    .bind(order.paid_at)
    .bind(order.status.as_str())
    .bind(order.payment_info.as_ref().map(Json))
    .bind(order.payment_reference.as_deref())
    .bind(order.subtotal_cents)
    .bind(order.shipping_fee_cents)
    .bind(order.total_amount_cents)
    .bind(&order.currency)
    .bind(order.inventory_committed)
    .bind(order.created_at)
    .bind(order.delivered_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Order::try_from).transpose()
  }

  async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()> {
    sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
      .bind(id)
      .bind(reference)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn mark_paid(&self, id: Uuid, info: &PaymentInfo, paid_at: DateTime<Utc>) -> Result<bool> {
    let done = sqlx::query(
      "UPDATE orders SET is_paid = TRUE, paid_at = $2, payment_info = $3, status = 'confirmed', \
       inventory_committed = TRUE \
       WHERE id = $1 AND is_paid = FALSE AND status = 'pending'",
    )
    .bind(id)
    .bind(paid_at)
    .bind(Json(info))
    .execute(&self.pool)
    .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn record_payment_attempt(&self, id: Uuid, info: &PaymentInfo) -> Result<bool> {
    let done = sqlx::query("UPDATE orders SET payment_info = $2 WHERE id = $1 AND is_paid = FALSE")
      .bind(id)
      .bind(Json(info))
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus, at: DateTime<Utc>) -> Result<bool> {
    let done = sqlx::query(
      "UPDATE orders SET status = $3, \
       delivered_at = CASE WHEN $3 = 'delivered' THEN $4 ELSE delivered_at END \
       WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(at)
    .execute(&self.pool)
    .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn claim_inventory(&self, id: Uuid) -> Result<bool> {
    self
      .swap(
        "UPDATE orders SET inventory_committed = TRUE WHERE id = $1 AND inventory_committed = FALSE",
        id,
      )
      .await
  }

  async fn release_inventory(&self, id: Uuid) -> Result<bool> {
    self
      .swap(
        "UPDATE orders SET inventory_committed = FALSE WHERE id = $1 AND inventory_committed = TRUE",
        id,
      )
      .await
  }

  async fn list(&self, filter: &OrderFilter, page: Page) -> Result<(Vec<Order>, u64)> {
    let status = filter.status.map(OrderStatus::as_str);
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders \
       WHERE ($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR user_id = $2) \
       ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
    ))
    .bind(status)
    .bind(filter.user_id)
    .bind(i64::from(page.limit))
    .bind(page.offset() as i64)
    .fetch_all(&self.pool)
    .await?;
    let total: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR user_id = $2)",
    )
    .bind(status)
    .bind(filter.user_id)
    .fetch_one(&self.pool)
    .await?;
    let orders = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>>>()?;
    Ok((orders, total.max(0) as u64))
  }

  async fn status_summary(&self) -> Result<OrderSummary> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
      "SELECT status, COUNT(*)::bigint, COALESCE(SUM(total_amount_cents), 0)::bigint \
       FROM orders GROUP BY status ORDER BY status",
    )
    .fetch_all(&self.pool)
    .await?;
    let paid_revenue_cents: i64 =
      sqlx::query_scalar("SELECT COALESCE(SUM(total_amount_cents), 0)::bigint FROM orders WHERE is_paid")
        .fetch_one(&self.pool)
        .await?;
    let mut by_status = rows
      .into_iter()
      .map(|(status, count, total_value_cents)| -> Result<StatusTotals> {
        Ok(StatusTotals {
          status: status.parse()?,
          count,
          total_value_cents,
        })
      })
      .collect::<Result<Vec<_>>>()?;
    by_status.sort_by_key(|t| t.status);
    Ok(OrderSummary {
      by_status,
      paid_revenue_cents,
    })
  }
}
