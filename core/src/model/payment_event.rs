// zipline/src/model/payment_event.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// One processed payment-provider webhook delivery. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentEvent {
  pub event_id: String,
  pub event_type: String,
  pub payment_intent_id: Option<String>,
  pub order_id: Option<Uuid>,
  pub amount: Option<Decimal>,
  pub currency: Option<String>,
  pub received_at: DateTime<Utc>,
}
