// zipline_server/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;
use zipline::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum DbOrderStatus {
  Pending,
  InQueue,
  InProgress,
  Delivered,
  Cancelled,
  Disputed,
}

impl From<OrderStatus> for DbOrderStatus {
  fn from(status: OrderStatus) -> Self {
    match status {
      OrderStatus::Pending => DbOrderStatus::Pending,
      OrderStatus::InQueue => DbOrderStatus::InQueue,
      OrderStatus::InProgress => DbOrderStatus::InProgress,
      OrderStatus::Delivered => DbOrderStatus::Delivered,
      OrderStatus::Cancelled => DbOrderStatus::Cancelled,
      OrderStatus::Disputed => DbOrderStatus::Disputed,
    }
  }
}

impl From<DbOrderStatus> for OrderStatus {
  fn from(status: DbOrderStatus) -> Self {
    match status {
      DbOrderStatus::Pending => OrderStatus::Pending,
      DbOrderStatus::InQueue => OrderStatus::InQueue,
      DbOrderStatus::InProgress => OrderStatus::InProgress,
      DbOrderStatus::Delivered => OrderStatus::Delivered,
      DbOrderStatus::Cancelled => OrderStatus::Cancelled,
      DbOrderStatus::Disputed => OrderStatus::Disputed,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: DbOrderStatus,
  pub subtotal: Decimal,
  pub tip: Decimal,
  pub total_amount: Decimal,
  pub delivery_address: String,
  pub delivery_instructions: Option<String>,
  pub campus_delivery: bool,
  pub fulfilled_by: Option<Uuid>,
  pub payment_reference: Option<String>,
  pub completion_photo_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Column list matching `OrderRow`, for `SELECT`s.
pub const ORDER_COLUMNS: &str = "id, user_id, status, subtotal, tip, total_amount, delivery_address, \
  delivery_instructions, campus_delivery, fulfilled_by, payment_reference, completion_photo_url, created_at, updated_at";

impl From<OrderRow> for Order {
  fn from(row: OrderRow) -> Self {
    Order {
      id: row.id,
      user_id: row.user_id,
      status: row.status.into(),
      subtotal: row.subtotal,
      tip: row.tip,
      total_amount: row.total_amount,
      delivery_address: row.delivery_address,
      delivery_instructions: row.delivery_instructions,
      campus_delivery: row.campus_delivery,
      fulfilled_by: row.fulfilled_by,
      payment_reference: row.payment_reference,
      completion_photo_url: row.completion_photo_url,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}
