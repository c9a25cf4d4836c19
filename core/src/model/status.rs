// zipline/src/model/status.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle states.
///
/// ```text
/// pending -> in_queue -> in_progress -> delivered
///    |          |            |             |
///    +----------+------------+--> cancelled |
///                            +-------------+--> disputed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  InQueue,
  InProgress,
  Delivered,
  Cancelled,
  Disputed,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::InQueue,
    OrderStatus::InProgress,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Disputed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::InQueue => "in_queue",
      OrderStatus::InProgress => "in_progress",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Disputed => "disputed",
    }
  }

  /// No further status, fulfiller or amount change is allowed, except the
  /// provider-driven `delivered -> disputed`.
  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Disputed)
  }

  pub fn is_cancellable(&self) -> bool {
    matches!(self, OrderStatus::Pending | OrderStatus::InQueue | OrderStatus::InProgress)
  }

  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, InQueue)
        | (InQueue, InProgress)
        | (InProgress, Delivered)
        | (Pending, Cancelled)
        | (InQueue, Cancelled)
        | (InProgress, Cancelled)
        | (InProgress, Disputed)
        | (Delivered, Disputed)
    )
  }

  /// The coarse status customers see.
  pub fn customer_label(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "placed",
      OrderStatus::InQueue => "queued",
      OrderStatus::InProgress => "preparing",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Disputed => "under review",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| UnknownStatus(s.to_string()))
  }
}
