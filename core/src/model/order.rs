// zipline/src/model/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  pub subtotal: Decimal,
  pub tip: Decimal,
  /// `subtotal + tip`, fixed at creation and never recomputed.
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

/// Exclusive upper bound on any order amount (tip, subtotal, total).
pub fn max_order_amount() -> Decimal {
  Decimal::new(100_000_000, 0)
}

impl Order {
  /// Builds a `pending` order from already-priced line items. `None` when
  /// the sum overflows.
  pub fn price(id: Uuid, new_order: &NewOrder, items: &[OrderItem], now: DateTime<Utc>) -> Option<Self> {
    let subtotal = items
      .iter()
      .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total))?;
    let total_amount = subtotal.checked_add(new_order.tip)?;
    Some(Order {
      id,
      user_id: new_order.user_id,
      status: OrderStatus::Pending,
      subtotal,
      tip: new_order.tip,
      total_amount,
      delivery_address: new_order.delivery_address.clone(),
      delivery_instructions: new_order.delivery_instructions.clone(),
      campus_delivery: new_order.campus_delivery,
      fulfilled_by: None,
      payment_reference: None,
      completion_photo_url: None,
      created_at: now,
      updated_at: now,
    })
  }
}

/// Line item snapshot. Prices are captured at creation and never follow
/// later catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub line_total: Decimal,
}

impl OrderItem {
  /// `None` when `unit_price * quantity` overflows.
  pub fn snapshot(order_id: Uuid, product_id: Uuid, quantity: i32, unit_price: Decimal) -> Option<Self> {
    let line_total = unit_price.checked_mul(Decimal::from(quantity))?;
    Some(OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id,
      quantity,
      unit_price,
      line_total,
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Checkout input. Unit prices come from the catalog, not the client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub items: Vec<NewOrderItem>,
  #[serde(default)]
  pub tip: Decimal,
  pub delivery_address: String,
  #[serde(default)]
  pub delivery_instructions: Option<String>,
  #[serde(default)]
  pub campus_delivery: bool,
}

/// Append-only audit row; never read on the hot path.
#[derive(Debug, Clone, Serialize)]
pub struct StatusHistoryEntry {
  pub order_id: Uuid,
  pub status: OrderStatus,
  pub reason: String,
  pub metadata: serde_json::Value,
  pub recorded_at: DateTime<Utc>,
}
