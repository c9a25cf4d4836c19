// zipline/src/lifecycle/context.rs

//! Per-transition state shared by the steps of one pipeline run.

use serde::Serialize;
use uuid::Uuid;

use crate::inventory::ConsumptionOutcome;
use crate::model::{Order, OrderStatus};
use crate::notify::DispatchSummary;
use crate::store::StatusUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
  ConfirmPayment,
  StoreCreditPayment,
  FailPayment,
  Accept,
  Complete,
  Cancel,
  Dispute,
}

impl TransitionKind {
  pub fn target(&self) -> OrderStatus {
    match self {
      TransitionKind::ConfirmPayment | TransitionKind::StoreCreditPayment => OrderStatus::InQueue,
      TransitionKind::FailPayment | TransitionKind::Cancel => OrderStatus::Cancelled,
      TransitionKind::Accept => OrderStatus::InProgress,
      TransitionKind::Complete => OrderStatus::Delivered,
      TransitionKind::Dispute => OrderStatus::Disputed,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      TransitionKind::ConfirmPayment => "payment_succeeded",
      TransitionKind::StoreCreditPayment => "store_credit_payment",
      TransitionKind::FailPayment => "payment_failed",
      TransitionKind::Accept => "fulfiller_accepted",
      TransitionKind::Complete => "fulfiller_completed",
      TransitionKind::Cancel => "cancellation_requested",
      TransitionKind::Dispute => "dispute_opened",
    }
  }

  /// Paid transitions owe stock.
  pub fn consumes_inventory(&self) -> bool {
    matches!(self, TransitionKind::ConfirmPayment | TransitionKind::StoreCreditPayment)
  }
}

#[derive(Debug, Clone)]
pub struct TransitionCtx {
  pub kind: TransitionKind,
  /// Who asked for the transition; `None` for provider-driven events.
  pub actor: Option<Uuid>,
  pub reason: String,
  pub metadata: serde_json::Value,
  /// The order as read before the write.
  pub before: Order,
  pub update: StatusUpdate,
  /// Filled by `commit_transition`.
  pub applied: bool,
  pub after: Option<Order>,
  pub current_status: Option<OrderStatus>,
  /// Filled by the best-effort steps that ran successfully.
  pub inventory: Option<ConsumptionOutcome>,
  pub notification: Option<DispatchSummary>,
  pub refunded: bool,
}

impl TransitionCtx {
  pub fn new(kind: TransitionKind, before: Order, update: StatusUpdate, actor: Option<Uuid>) -> Self {
    Self {
      kind,
      actor,
      reason: kind.as_str().to_string(),
      metadata: serde_json::Value::Null,
      before,
      update,
      applied: false,
      after: None,
      current_status: None,
      inventory: None,
      notification: None,
      refunded: false,
    }
  }

  pub fn with_reason(mut self, reason: Option<String>) -> Self {
    if let Some(reason) = reason {
      self.reason = reason;
    }
    self
  }

  pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
    self.metadata = metadata;
    self
  }
}

/// Result of a transition attempt. A lost race is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
  Applied(Order),
  NotApplied { current_status: OrderStatus },
}

impl TransitionOutcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, TransitionOutcome::Applied(_))
  }

  pub fn order(&self) -> Option<&Order> {
    match self {
      TransitionOutcome::Applied(order) => Some(order),
      TransitionOutcome::NotApplied { .. } => None,
    }
  }
}
