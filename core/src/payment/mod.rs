// zipline/src/payment/mod.rs

//! Payment processor seam: intent creation, refunds, and webhook parsing.

pub mod mock;
pub mod webhook;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::Order;

pub use mock::MockPaymentGateway;
pub use webhook::{verify_and_parse, WebhookEvent, WebhookEventKind};

/// Metadata key carrying the order id on every intent. It is the only join
/// key between a webhook event and its order.
pub const ORDER_ID_METADATA_KEY: &str = "order_id";

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentRequest {
  pub amount: Decimal,
  pub currency: String,
  pub description: String,
  pub metadata: HashMap<String, String>,
}

impl PaymentIntentRequest {
  pub fn for_order(order: &Order, currency: &str) -> Self {
    let mut metadata = HashMap::new();
    metadata.insert(ORDER_ID_METADATA_KEY.to_string(), order.id.to_string());
    PaymentIntentRequest {
      amount: order.total_amount,
      currency: currency.to_string(),
      description: format!("Campus delivery order {}", order.id),
      metadata,
    }
  }

  pub fn order_id(&self) -> Option<Uuid> {
    self
      .metadata
      .get(ORDER_ID_METADATA_KEY)
      .and_then(|raw| Uuid::parse_str(raw).ok())
  }

  /// Amount in the currency's minor unit (cents).
  pub fn minor_units(&self) -> Result<i64, GatewayError> {
    to_minor_units(self.amount)
  }
}

pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
  if amount <= Decimal::ZERO {
    return Err(GatewayError::InvalidAmount(format!("amount must be > 0, got {}", amount)));
  }
  let cents = amount * Decimal::ONE_HUNDRED;
  if !cents.fract().is_zero() {
    return Err(GatewayError::InvalidAmount(format!(
      "amount {} has more than two decimal places",
      amount
    )));
  }
  i64::try_from(cents).map_err(|_| GatewayError::InvalidAmount(format!("amount {} out of range", amount)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
  pub id: String,
  pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Fails with `InvalidAmount` unless amount > 0.
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, GatewayError>;

  async fn refund(&self, payment_intent_id: &str) -> Result<(), GatewayError>;
}
