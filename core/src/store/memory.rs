// zipline/src/store/memory.rs

//! In-process store backing every trait in `store`. Each operation takes one
//! lock, so the status compare-and-swap is linearizable across tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::inventory::{StockAdjustment, ORDER_PLACED_REASON};
use crate::model::{Audience, DeviceRegistration, Order, OrderItem, OrderStatus, PaymentEvent, Role, StatusHistoryEntry};
use crate::store::{DeviceStore, InventoryStore, OrderStore, PaymentEventLog, StatusUpdate};

/// Operations a test can make fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
  CreateOrder,
  StatusUpdate,
  StatusHistory,
  Inventory,
  FulfillerStats,
  ReadOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FulfillerStats {
  pub orders_handled: u64,
  pub revenue: Decimal,
}

#[derive(Debug, Clone, Copy)]
struct Product {
  price: Decimal,
  stock: i32,
}

#[derive(Default)]
struct State {
  orders: HashMap<Uuid, Order>,
  items: HashMap<Uuid, Vec<OrderItem>>,
  history: Vec<StatusHistoryEntry>,
  products: HashMap<Uuid, Product>,
  adjustments: Vec<StockAdjustment>,
  consumed_orders: HashSet<Uuid>,
  devices: HashMap<(Uuid, String), DeviceRegistration>,
  roles: HashMap<Uuid, Role>,
  events: HashMap<String, PaymentEvent>,
  fulfiller_stats: HashMap<Uuid, FulfillerStats>,
  fail_points: HashSet<FailPoint>,
}

impl State {
  fn check(&self, point: FailPoint) -> StoreResult<()> {
    if self.fail_points.contains(&point) {
      return Err(StoreError::backend(anyhow::anyhow!("injected failure at {:?}", point)));
    }
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<State>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_product(&self, product_id: Uuid, price: Decimal, stock: i32) {
    self.state.lock().products.insert(product_id, Product { price, stock });
  }

  pub fn set_price(&self, product_id: Uuid, price: Decimal) {
    if let Some(product) = self.state.lock().products.get_mut(&product_id) {
      product.price = price;
    }
  }

  pub fn stock(&self, product_id: Uuid) -> Option<i32> {
    self.state.lock().products.get(&product_id).map(|p| p.stock)
  }

  /// Stands in for the profile table that maps users to roles.
  pub fn assign_role(&self, user_id: Uuid, role: Role) {
    self.state.lock().roles.insert(user_id, role);
  }

  pub fn fail(&self, point: FailPoint) {
    self.state.lock().fail_points.insert(point);
  }

  pub fn heal(&self, point: FailPoint) {
    self.state.lock().fail_points.remove(&point);
  }

  pub fn status_history(&self, order_id: Uuid) -> Vec<StatusHistoryEntry> {
    self
      .state
      .lock()
      .history
      .iter()
      .filter(|entry| entry.order_id == order_id)
      .cloned()
      .collect()
  }

  pub fn adjustments_for(&self, order_id: Uuid) -> Vec<StockAdjustment> {
    self
      .state
      .lock()
      .adjustments
      .iter()
      .filter(|adj| adj.reference == order_id)
      .cloned()
      .collect()
  }

  pub fn fulfiller_stats(&self, fulfiller_id: Uuid) -> FulfillerStats {
    self
      .state
      .lock()
      .fulfiller_stats
      .get(&fulfiller_id)
      .copied()
      .unwrap_or_default()
  }

  pub fn device_count(&self) -> usize {
    self.state.lock().devices.len()
  }

  pub fn payment_event_count(&self) -> usize {
    self.state.lock().events.len()
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
    let mut state = self.state.lock();
    state.check(FailPoint::CreateOrder)?;
    if state.orders.contains_key(&order.id) {
      return Err(StoreError::backend(anyhow::anyhow!("duplicate order id {}", order.id)));
    }
    state.orders.insert(order.id, order.clone());
    state.items.insert(order.id, items.to_vec());
    Ok(())
  }

  async fn conditional_update_status(&self, update: &StatusUpdate) -> StoreResult<bool> {
    let mut state = self.state.lock();
    state.check(FailPoint::StatusUpdate)?;
    let Some(order) = state.orders.get_mut(&update.order_id) else {
      return Ok(false);
    };
    if !update.matches(order) {
      return Ok(false);
    }
    update.apply_to(order, Utc::now());
    Ok(true)
  }

  async fn append_status_history(&self, entry: &StatusHistoryEntry) -> StoreResult<()> {
    let mut state = self.state.lock();
    state.check(FailPoint::StatusHistory)?;
    state.history.push(entry.clone());
    Ok(())
  }

  async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
    let state = self.state.lock();
    state.check(FailPoint::ReadOrder)?;
    Ok(state.orders.get(&order_id).cloned())
  }

  async fn get_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
    Ok(self.state.lock().items.get(&order_id).cloned().unwrap_or_default())
  }

  async fn get_order_by_payment_reference(&self, reference: &str) -> StoreResult<Option<Order>> {
    Ok(
      self
        .state
        .lock()
        .orders
        .values()
        .find(|order| order.payment_reference.as_deref() == Some(reference))
        .cloned(),
    )
  }

  async fn get_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .state
      .lock()
      .orders
      .values()
      .filter(|order| order.status == status)
      .cloned()
      .collect();
    orders.sort_by_key(|order| order.created_at);
    Ok(orders)
  }

  async fn get_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .state
      .lock()
      .orders
      .values()
      .filter(|order| order.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn record_fulfiller_completion(&self, fulfiller_id: Uuid, revenue: Decimal) -> StoreResult<()> {
    let mut state = self.state.lock();
    state.check(FailPoint::FulfillerStats)?;
    let stats = state.fulfiller_stats.entry(fulfiller_id).or_default();
    stats.orders_handled += 1;
    stats.revenue += revenue;
    Ok(())
  }
}

#[async_trait]
impl InventoryStore for MemoryStore {
  async fn unit_prices(&self, product_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Decimal>> {
    let state = self.state.lock();
    Ok(
      product_ids
        .iter()
        .filter_map(|id| state.products.get(id).map(|p| (*id, p.price)))
        .collect(),
    )
  }

  async fn consume_for_order(&self, order_id: Uuid, items: &[OrderItem]) -> StoreResult<bool> {
    let mut state = self.state.lock();
    state.check(FailPoint::Inventory)?;
    if state.consumed_orders.contains(&order_id) {
      return Ok(false);
    }
    if let Some(missing) = items.iter().find(|item| !state.products.contains_key(&item.product_id)) {
      return Err(StoreError::NotFound {
        entity: "product",
        id: missing.product_id.to_string(),
      });
    }

    let now = Utc::now();
    let mut adjustments = Vec::with_capacity(items.len());
    for item in items {
      if let Some(product) = state.products.get_mut(&item.product_id) {
        let previous_quantity = product.stock;
        product.stock -= item.quantity;
        adjustments.push(StockAdjustment {
          product_id: item.product_id,
          previous_quantity,
          new_quantity: product.stock,
          reason: ORDER_PLACED_REASON.to_string(),
          reference: order_id,
          recorded_at: now,
        });
      }
    }
    state.adjustments.extend(adjustments);
    state.consumed_orders.insert(order_id);
    Ok(true)
  }
}

#[async_trait]
impl DeviceStore for MemoryStore {
  async fn upsert_device(&self, registration: &DeviceRegistration) -> StoreResult<()> {
    self.state.lock().devices.insert(
      (registration.user_id, registration.device_id.clone()),
      registration.clone(),
    );
    Ok(())
  }

  async fn active_tokens(&self, audience: Audience, fresh_since: DateTime<Utc>) -> StoreResult<Vec<String>> {
    let state = self.state.lock();
    let mut tokens: Vec<String> = state
      .devices
      .values()
      .filter(|reg| reg.refreshed_at >= fresh_since)
      .filter(|reg| match audience {
        Audience::User(user_id) => reg.user_id == user_id,
        Audience::Role(role) => state.roles.get(&reg.user_id) == Some(&role),
        Audience::Everyone => true,
      })
      .map(|reg| reg.token.clone())
      .collect();
    tokens.sort();
    tokens.dedup();
    Ok(tokens)
  }

  async fn purge_stale(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
    let mut state = self.state.lock();
    let before = state.devices.len();
    state.devices.retain(|_, reg| reg.refreshed_at >= older_than);
    Ok((before - state.devices.len()) as u64)
  }

  async fn role_of(&self, user_id: Uuid) -> StoreResult<Option<Role>> {
    Ok(self.state.lock().roles.get(&user_id).copied())
  }
}

#[async_trait]
impl PaymentEventLog for MemoryStore {
  async fn has_processed(&self, event_id: &str) -> StoreResult<bool> {
    Ok(self.state.lock().events.contains_key(event_id))
  }

  async fn record(&self, event: &PaymentEvent) -> StoreResult<bool> {
    let mut state = self.state.lock();
    if state.events.contains_key(&event.event_id) {
      return Ok(false);
    }
    state.events.insert(event.event_id.clone(), event.clone());
    Ok(true)
  }
}
