// zipline/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::model::OrderStatus;

/// Failures raised by the step runner itself, as opposed to step handlers.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },
}

/// Persistence failures. A lost compare-and-swap is NOT an error; it is the
/// `false` returned by `OrderStore::conditional_update_status`.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("Store backend failure. Source: {source}")]
  Backend {
    #[source]
    source: AnyhowError,
  },
}

impl StoreError {
  pub fn backend(err: impl Into<AnyhowError>) -> Self {
    StoreError::Backend { source: err.into() }
  }

  pub fn order_not_found(id: Uuid) -> Self {
    StoreError::NotFound {
      entity: "order",
      id: id.to_string(),
    }
  }
}

/// Failures from the payment processor or the push messaging provider.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("Gateway unavailable: {0}")]
  Unavailable(String),

  #[error("Invalid amount: {0}")]
  InvalidAmount(String),

  #[error("Gateway rejected request: {0}")]
  Rejected(String),
}

#[derive(Debug, Error)]
pub enum WebhookError {
  #[error("Webhook signature invalid: {0}")]
  SignatureInvalid(&'static str),

  #[error("Webhook body malformed: {0}")]
  Malformed(String),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Order not found: {0}")]
  OrderNotFound(Uuid),

  #[error("Invalid transition for order {order_id}: {from} -> {to}")]
  InvalidTransition {
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
  },

  #[error("Order {order_id} is not assigned to fulfiller {fulfiller_id}")]
  NotAssignedFulfiller { order_id: Uuid, fulfiller_id: Uuid },

  #[error("User {user_id} may not modify order {order_id}")]
  Forbidden { order_id: Uuid, user_id: Uuid },

  #[error(transparent)]
  Webhook(#[from] WebhookError),

  #[error("Payment Gateway Error: {0}")]
  Gateway(#[from] GatewayError),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Pipeline Error: {0}")]
  Pipeline(#[from] PipelineError),

  #[error("Timed out: {0}")]
  Timeout(&'static str),
}

impl LifecycleError {
  /// Fatal persistence failures are the only ones a webhook provider should retry.
  pub fn is_retryable(&self) -> bool {
    matches!(self, LifecycleError::Store(StoreError::Backend { .. }))
  }
}

pub type LifecycleResult<T, E = LifecycleError> = std::result::Result<T, E>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
