// zipline/src/notify/content.rs

//! Notification wording. Everything here is pure.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::gateway::{Priority, PushMessage};
use crate::model::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  /// To the zipper cohort when an order is paid and waiting.
  NewOrderAvailable,
  /// To the customer on their own order's progress.
  OrderStatusUpdate,
  Test,
}

impl NotificationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NotificationKind::NewOrderAvailable => "new_order",
      NotificationKind::OrderStatusUpdate => "order_status_update",
      NotificationKind::Test => "test",
    }
  }
}

/// Title and body for an order in `status`. Total over every status.
pub fn for_status(order_id: Uuid, status: OrderStatus) -> (String, String) {
  let short_id = short_order_id(order_id);
  match status {
    OrderStatus::InQueue => (
      "New order available".to_string(),
      format!("Order #{} is paid and waiting for a zipper.", short_id),
    ),
    OrderStatus::InProgress => (
      "Your order is being prepared".to_string(),
      format!("A zipper has picked up order #{}.", short_id),
    ),
    OrderStatus::Delivered => (
      "Order delivered".to_string(),
      format!("Order #{} has been delivered. Enjoy!", short_id),
    ),
    OrderStatus::Cancelled => (
      "Order cancelled".to_string(),
      format!("Order #{} was cancelled.", short_id),
    ),
    _ => (
      "Order status updated".to_string(),
      format!("Order #{} is now {}.", short_id, status.customer_label()),
    ),
  }
}

pub fn order_message(order: &Order, status: OrderStatus, kind: NotificationKind, now: DateTime<Utc>) -> PushMessage {
  let (title, body) = for_status(order.id, status);
  let mut data = BTreeMap::new();
  data.insert("order_id".to_string(), order.id.to_string());
  data.insert("status".to_string(), status.as_str().to_string());
  data.insert("type".to_string(), kind.as_str().to_string());
  data.insert("timestamp".to_string(), now.to_rfc3339());
  data.insert("order_total".to_string(), order.total_amount.to_string());
  PushMessage {
    title,
    body,
    data,
    priority: Priority::High,
    sound: "default".to_string(),
    badge: 1,
  }
}

pub fn test_message(title: &str, body: &str, now: DateTime<Utc>) -> PushMessage {
  let mut data = BTreeMap::new();
  data.insert("type".to_string(), NotificationKind::Test.as_str().to_string());
  data.insert("test_id".to_string(), format!("test_{}", now.timestamp()));
  data.insert("timestamp".to_string(), now.to_rfc3339());
  PushMessage {
    title: title.to_string(),
    body: body.to_string(),
    data,
    priority: Priority::Normal,
    sound: "default".to_string(),
    badge: 0,
  }
}

fn short_order_id(order_id: Uuid) -> String {
  order_id.simple().to_string()[..8].to_uppercase()
}
