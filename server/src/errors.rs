// zipline_server/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use zipline::{LifecycleError, OrderStatus, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// A lost compare-and-swap. Not a failure of the request, but the caller
  /// did not get the transition it asked for.
  #[error("Transition not applied; order is {current_status}")]
  NotApplied { current_status: OrderStatus },

  #[error("Invalid Transition: {0}")]
  InvalidTransition(String),

  #[error("Webhook Rejected: {0}")]
  Webhook(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Storage Error: {0}")]
  Store(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<LifecycleError> for AppError {
  fn from(err: LifecycleError) -> Self {
    match err {
      LifecycleError::Validation(m) => AppError::Validation(m),
      LifecycleError::OrderNotFound(id) => AppError::NotFound(format!("Order {} not found.", id)),
      e @ LifecycleError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
      e @ (LifecycleError::NotAssignedFulfiller { .. } | LifecycleError::Forbidden { .. }) => {
        AppError::Forbidden(e.to_string())
      }
      LifecycleError::Webhook(e) => AppError::Webhook(e.to_string()),
      LifecycleError::Gateway(e) => AppError::Payment(e.to_string()),
      LifecycleError::Store(StoreError::NotFound { entity, id }) => {
        AppError::NotFound(format!("{} {} not found.", entity, id))
      }
      LifecycleError::Store(e) => AppError::Store(e.to_string()),
      e @ (LifecycleError::Pipeline(_) | LifecycleError::Timeout(_)) => AppError::Internal(e.to_string()),
    }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    AppError::from(LifecycleError::Store(err))
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Webhook(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::NotApplied { .. } => StatusCode::CONFLICT,
      AppError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Payment(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Store(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let mut builder = HttpResponse::build(status);
    match self {
      AppError::NotApplied { current_status } => {
        builder.json(json!({"applied": false, "currentStatus": current_status}))
      }
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::InvalidTransition(m)
      | AppError::Webhook(m) => builder.json(json!({"error": m})),
      AppError::Payment(m) => builder.json(json!({"error": "Payment provider error", "detail": m})),
      AppError::Config(m) => builder.json(json!({"error": "Configuration issue", "detail": m})),
      AppError::Sqlx(_) | AppError::Store(_) => builder.json(json!({"error": "Database operation failed"})),
      AppError::Internal(m) => builder.json(json!({"error": "An internal error occurred", "detail": m})),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
