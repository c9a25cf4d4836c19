// zipline/src/store/mod.rs

//! Persistence seams. Every call is an I/O suspension point.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{Audience, DeviceRegistration, Order, OrderItem, OrderStatus, PaymentEvent, Role, StatusHistoryEntry};

pub use memory::MemoryStore;

/// A compare-and-swap on an order's status.
///
/// Backends must apply it as one isolated write, e.g.
/// `UPDATE orders SET ... WHERE id = $1 AND status = $2 [AND fulfilled_by = $3]`
/// and report whether a row was affected.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
  pub order_id: Uuid,
  pub expected_status: OrderStatus,
  pub new_status: OrderStatus,
  /// Extra precondition on the current assignee.
  pub expected_fulfiller: Option<Uuid>,
  /// Written only while `fulfilled_by` is still empty.
  pub set_fulfiller: Option<Uuid>,
  pub payment_reference: Option<String>,
  pub completion_photo_url: Option<String>,
}

impl StatusUpdate {
  pub fn new(order_id: Uuid, expected_status: OrderStatus, new_status: OrderStatus) -> Self {
    StatusUpdate {
      order_id,
      expected_status,
      new_status,
      expected_fulfiller: None,
      set_fulfiller: None,
      payment_reference: None,
      completion_photo_url: None,
    }
  }

  pub fn assign_to(mut self, fulfiller_id: Uuid) -> Self {
    self.set_fulfiller = Some(fulfiller_id);
    self
  }

  pub fn held_by(mut self, fulfiller_id: Uuid) -> Self {
    self.expected_fulfiller = Some(fulfiller_id);
    self
  }

  pub fn with_payment_reference(mut self, reference: Option<String>) -> Self {
    self.payment_reference = reference;
    self
  }

  pub fn with_completion_photo(mut self, url: Option<String>) -> Self {
    self.completion_photo_url = url;
    self
  }

  /// Whether the precondition holds for `order` as currently stored.
  pub fn matches(&self, order: &Order) -> bool {
    order.id == self.order_id
      && order.status == self.expected_status
      && self.expected_fulfiller.map_or(true, |expected| order.fulfilled_by == Some(expected))
  }

  /// Applies the write to an in-memory copy of the order.
  pub fn apply_to(&self, order: &mut Order, now: DateTime<Utc>) {
    order.status = self.new_status;
    if let Some(fulfiller) = self.set_fulfiller {
      order.fulfilled_by.get_or_insert(fulfiller);
    }
    if let Some(reference) = &self.payment_reference {
      order.payment_reference = Some(reference.clone());
    }
    if let Some(url) = &self.completion_photo_url {
      order.completion_photo_url = Some(url.clone());
    }
    order.updated_at = now;
  }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists the order and all its items, or nothing.
  async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()>;

  /// The only status mutation path. `Ok(false)` means the precondition did not hold.
  async fn conditional_update_status(&self, update: &StatusUpdate) -> StoreResult<bool>;

  async fn append_status_history(&self, entry: &StatusHistoryEntry) -> StoreResult<()>;

  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;

  async fn get_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;

  async fn get_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>>;

  async fn get_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>>;

  async fn get_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

  /// Bumps the fulfiller's handled-order count and revenue.
  async fn record_fulfiller_completion(&self, fulfiller_id: Uuid, revenue: Decimal) -> StoreResult<()>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
  /// Current catalog prices; unknown products are absent from the map.
  async fn unit_prices(&self, product_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Decimal>>;

  /// Decrements stock for every item and writes one adjustment per item,
  /// atomically. Returns `false` when this order was already consumed.
  async fn consume_for_order(&self, order_id: Uuid, items: &[OrderItem]) -> StoreResult<bool>;
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
  /// Insert or refresh, keyed on (user, device).
  async fn upsert_device(&self, registration: &DeviceRegistration) -> StoreResult<()>;

  /// Tokens refreshed at or after `fresh_since`.
  async fn active_tokens(&self, audience: Audience, fresh_since: DateTime<Utc>) -> StoreResult<Vec<String>>;

  /// Deletes registrations refreshed before `older_than`; returns the count.
  async fn purge_stale(&self, older_than: DateTime<Utc>) -> StoreResult<u64>;

  /// The profile role that `Audience::Role` matches on. `None` for users
  /// without a profile.
  async fn role_of(&self, user_id: Uuid) -> StoreResult<Option<Role>>;
}

#[async_trait]
pub trait PaymentEventLog: Send + Sync {
  async fn has_processed(&self, event_id: &str) -> StoreResult<bool>;

  /// Returns `false` if the event id was already recorded.
  async fn record(&self, event: &PaymentEvent) -> StoreResult<bool>;
}
