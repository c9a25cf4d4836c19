// zipline_server/src/db/inventory.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;
use zipline::inventory::ORDER_PLACED_REASON;
use zipline::store::InventoryStore;
use zipline::{OrderItem, StoreError, StoreResult};

use super::{backend, PgStore};
use crate::models::ProductPrice;

#[async_trait]
impl InventoryStore for PgStore {
  async fn unit_prices(&self, product_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Decimal>> {
    let rows: Vec<ProductPrice> = sqlx::query_as("SELECT id, price FROM products WHERE id = ANY($1)")
      .bind(product_ids)
      .fetch_all(&self.pool)
      .await
      .map_err(backend)?;
    Ok(rows.into_iter().map(|row| (row.id, row.price)).collect())
  }

  /// The consumption marker, every decrement and every adjustment row
  /// commit together or not at all.
  #[instrument(name = "db::consume_for_order", skip(self, items), fields(item_count = items.len()))]
  async fn consume_for_order(&self, order_id: Uuid, items: &[OrderItem]) -> StoreResult<bool> {
    let mut tx = self.pool.begin().await.map_err(backend)?;

    let marker = sqlx::query("INSERT INTO inventory_consumptions (order_id) VALUES ($1) ON CONFLICT DO NOTHING")
      .bind(order_id)
      .execute(&mut *tx)
      .await
      .map_err(backend)?;
    if marker.rows_affected() == 0 {
      info!("Consumption marker already present.");
      return Ok(false);
    }

    for item in items {
      let new_quantity: Option<i32> = sqlx::query_scalar(
        "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() \
         WHERE id = $1 RETURNING stock_quantity",
      )
      .bind(item.product_id)
      .bind(item.quantity)
      .fetch_optional(&mut *tx)
      .await
      .map_err(backend)?;

      // Dropping `tx` rolls the whole consumption back.
      let Some(new_quantity) = new_quantity else {
        return Err(StoreError::NotFound {
          entity: "product",
          id: item.product_id.to_string(),
        });
      };

      sqlx::query(
        "INSERT INTO stock_adjustments (product_id, previous_quantity, new_quantity, reason, reference) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(item.product_id)
      .bind(new_quantity + item.quantity)
      .bind(new_quantity)
      .bind(ORDER_PLACED_REASON)
      .bind(order_id)
      .execute(&mut *tx)
      .await
      .map_err(backend)?;
    }

    tx.commit().await.map_err(backend)?;
    Ok(true)
  }
}
