// zipline_server/src/models/order_item.rs

use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;
use zipline::OrderItem;

#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub line_total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
  fn from(row: OrderItemRow) -> Self {
    OrderItem {
      id: row.id,
      order_id: row.order_id,
      product_id: row.product_id,
      quantity: row.quantity,
      unit_price: row.unit_price,
      line_total: row.line_total,
    }
  }
}
