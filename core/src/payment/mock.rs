// zipline/src/payment/mock.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{PaymentGateway, PaymentIntent, PaymentIntentRequest};
use crate::error::GatewayError;

/// In-process gateway for development and tests. Records every call.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
  unavailable: AtomicBool,
  intents: Mutex<Vec<PaymentIntentRequest>>,
  refunds: Mutex<Vec<String>>,
}

impl MockPaymentGateway {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn intents(&self) -> Vec<PaymentIntentRequest> {
    self.intents.lock().clone()
  }

  pub fn refunds(&self) -> Vec<String> {
    self.refunds.lock().clone()
  }

  fn ensure_available(&self) -> Result<(), GatewayError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(GatewayError::Unavailable("mock gateway switched off".to_string()));
    }
    Ok(())
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(name = "mock_payment::create_intent", skip(self, request), fields(amount = %request.amount, currency = %request.currency))]
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
    request.minor_units()?;
    self.ensure_available()?;

    let intent_id = format!("mock_pi_{}", Uuid::new_v4().simple());
    self.intents.lock().push(request.clone());
    info!(payment_intent_id = %intent_id, "Mock payment intent created.");
    Ok(PaymentIntent {
      client_secret: format!("{}_secret_{}", intent_id, Uuid::new_v4().simple()),
      id: intent_id,
    })
  }

  #[instrument(name = "mock_payment::refund", skip(self))]
  async fn refund(&self, payment_intent_id: &str) -> Result<(), GatewayError> {
    self.ensure_available()?;
    self.refunds.lock().push(payment_intent_id.to_string());
    info!("Mock refund issued.");
    Ok(())
  }
}
