// zipline_server/src/services/mod.rs

//! Outbound integrations: the payment processor and push delivery.

pub mod fcm;
pub mod stripe;

use std::sync::Arc;
use zipline::notify::{LoggingMessagingGateway, MessagingGateway};
use zipline::payment::{MockPaymentGateway, PaymentGateway};

use crate::config::AppConfig;
pub use fcm::FcmGateway;
pub use stripe::StripeGateway;

/// Real processor when a secret key is configured, the mock otherwise.
pub fn payment_gateway(config: &AppConfig, client: reqwest::Client) -> Arc<dyn PaymentGateway> {
  match &config.stripe_secret_key {
    Some(secret_key) => Arc::new(StripeGateway::new(client, secret_key.clone())),
    None => {
      tracing::warn!("STRIPE_SECRET_KEY not set; using the mock payment gateway.");
      Arc::new(MockPaymentGateway::new())
    }
  }
}

pub fn messaging_gateway(config: &AppConfig, client: reqwest::Client) -> Arc<dyn MessagingGateway> {
  match (&config.fcm_project_id, &config.fcm_access_token) {
    (Some(project_id), Some(access_token)) => {
      Arc::new(FcmGateway::new(client, project_id.clone(), access_token.clone()))
    }
    _ => {
      tracing::warn!("FCM credentials not set; push messages will only be logged.");
      Arc::new(LoggingMessagingGateway)
    }
  }
}
