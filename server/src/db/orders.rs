// zipline_server/src/db/orders.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;
use zipline::store::{OrderStore, StatusUpdate};
use zipline::{Order, OrderItem, OrderStatus, StatusHistoryEntry, StoreResult};

use super::{backend, PgStore};
use crate::models::order::ORDER_COLUMNS;
use crate::models::{DbOrderStatus, OrderItemRow, OrderRow};

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "db::create_order", skip(self, order, items), fields(order_id = %order.id))]
  async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
    let mut tx = self.pool.begin().await.map_err(backend)?;

    sqlx::query(
      "INSERT INTO orders (id, user_id, status, subtotal, tip, total_amount, delivery_address, \
       delivery_instructions, campus_delivery, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(DbOrderStatus::from(order.status))
    .bind(order.subtotal)
    .bind(order.tip)
    .bind(order.total_amount)
    .bind(&order.delivery_address)
    .bind(&order.delivery_instructions)
    .bind(order.campus_delivery)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(backend)?;

    for item in items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, line_total) \
         VALUES ($1, $2, $3, $4, $5, $6)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.line_total)
      .execute(&mut *tx)
      .await
      .map_err(backend)?;
    }

    tx.commit().await.map_err(backend)
  }

  #[instrument(name = "db::conditional_update_status", skip(self, update), fields(order_id = %update.order_id))]
  async fn conditional_update_status(&self, update: &StatusUpdate) -> StoreResult<bool> {
    let result = sqlx::query(
      "UPDATE orders SET \
         status = $3, \
         fulfilled_by = COALESCE(fulfilled_by, $4), \
         payment_reference = COALESCE($5, payment_reference), \
         completion_photo_url = COALESCE($6, completion_photo_url), \
         updated_at = now() \
       WHERE id = $1 AND status = $2 AND ($7::uuid IS NULL OR fulfilled_by = $7)",
    )
    .bind(update.order_id)
    .bind(DbOrderStatus::from(update.expected_status))
    .bind(DbOrderStatus::from(update.new_status))
    .bind(update.set_fulfiller)
    .bind(&update.payment_reference)
    .bind(&update.completion_photo_url)
    .bind(update.expected_fulfiller)
    .execute(&self.pool)
    .await
    .map_err(backend)?;

    Ok(result.rows_affected() == 1)
  }

  async fn append_status_history(&self, entry: &StatusHistoryEntry) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO order_status_history (order_id, status, reason, metadata, recorded_at) \
       VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.order_id)
    .bind(DbOrderStatus::from(entry.status))
    .bind(&entry.reason)
    .bind(&entry.metadata)
    .bind(entry.recorded_at)
    .execute(&self.pool)
    .await
    .map_err(backend)?;
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(row.map(Order::from))
  }

  async fn get_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
      "SELECT id, order_id, product_id, quantity, unit_price, line_total FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
  }

  async fn get_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE payment_reference = $1",
      ORDER_COLUMNS
    ))
    .bind(reference)
    .fetch_optional(&self.pool)
    .await
    .map_err(backend)?;
    Ok(row.map(Order::from))
  }

  async fn get_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE status = $1 ORDER BY created_at ASC",
      ORDER_COLUMNS
    ))
    .bind(DbOrderStatus::from(status))
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn get_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await
    .map_err(backend)?;
    Ok(rows.into_iter().map(Order::from).collect())
  }

  async fn record_fulfiller_completion(&self, fulfiller_id: Uuid, revenue: Decimal) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO fulfiller_stats (fulfiller_id, orders_handled, revenue, updated_at) \
       VALUES ($1, 1, $2, now()) \
       ON CONFLICT (fulfiller_id) DO UPDATE SET \
         orders_handled = fulfiller_stats.orders_handled + 1, \
         revenue = fulfiller_stats.revenue + EXCLUDED.revenue, \
         updated_at = now()",
    )
    .bind(fulfiller_id)
    .bind(revenue)
    .execute(&self.pool)
    .await
    .map_err(backend)?;
    Ok(())
  }
}
