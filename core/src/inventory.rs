// zipline/src/inventory.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::alert::{AlertSink, OpsAlert};
use crate::error::StoreResult;
use crate::store::{InventoryStore, OrderStore};

pub const ORDER_PLACED_REASON: &str = "order_placed";

/// Audit row written for every stock decrement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockAdjustment {
  pub product_id: Uuid,
  pub previous_quantity: i32,
  pub new_quantity: i32,
  pub reason: String,
  /// The order that caused the adjustment; also the idempotency key.
  pub reference: Uuid,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionOutcome {
  Applied,
  AlreadyApplied,
}

/// Applies the stock decrements owed by a confirmed order, at most once.
pub struct InventoryAdjuster {
  orders: Arc<dyn OrderStore>,
  inventory: Arc<dyn InventoryStore>,
  alerts: Arc<dyn AlertSink>,
}

impl InventoryAdjuster {
  pub fn new(orders: Arc<dyn OrderStore>, inventory: Arc<dyn InventoryStore>, alerts: Arc<dyn AlertSink>) -> Self {
    Self {
      orders,
      inventory,
      alerts,
    }
  }

  /// Failures raise an ops alert before being returned; callers treat them as
  /// non-fatal to the order transition.
  #[instrument(name = "inventory::apply_order_consumption", skip(self), err)]
  pub async fn apply_order_consumption(&self, order_id: Uuid) -> StoreResult<ConsumptionOutcome> {
    let result = self.consume(order_id).await;
    match &result {
      Ok(ConsumptionOutcome::Applied) => info!(%order_id, "Inventory consumed for order."),
      Ok(ConsumptionOutcome::AlreadyApplied) => {
        info!(%order_id, "Inventory already consumed for order; skipping.")
      }
      Err(e) => {
        warn!(%order_id, error = %e, "Inventory consumption failed.");
        self.alerts.raise(OpsAlert {
          kind: "inventory_consumption_failed",
          order_id: Some(order_id),
          message: format!("Stock not decremented for order {}: {}", order_id, e),
        });
      }
    }
    result
  }

  async fn consume(&self, order_id: Uuid) -> StoreResult<ConsumptionOutcome> {
    let items = self.orders.get_order_items(order_id).await?;
    if self.inventory.consume_for_order(order_id, &items).await? {
      Ok(ConsumptionOutcome::Applied)
    } else {
      Ok(ConsumptionOutcome::AlreadyApplied)
    }
  }
}
