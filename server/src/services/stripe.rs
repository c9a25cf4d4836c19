// zipline_server/src/services/stripe.rs

//! Payment processor over the Stripe REST API (form-encoded, no SDK).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, instrument};
use zipline::payment::{PaymentGateway, PaymentIntent, PaymentIntentRequest};
use zipline::GatewayError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeGateway {
  client: reqwest::Client,
  secret_key: String,
  api_base: String,
}

#[derive(Deserialize)]
struct IntentResponse {
  id: String,
  client_secret: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
  error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
  message: Option<String>,
}

impl StripeGateway {
  pub fn new(client: reqwest::Client, secret_key: String) -> Self {
    Self::with_api_base(client, secret_key, STRIPE_API_BASE)
  }

  pub fn with_api_base(client: reqwest::Client, secret_key: String, api_base: impl Into<String>) -> Self {
    Self {
      client,
      secret_key,
      api_base: api_base.into(),
    }
  }

  async fn post_form(&self, path: &str, form: &[(String, String)]) -> Result<reqwest::Response, GatewayError> {
    let response = self
      .client
      .post(format!("{}{}", self.api_base, path))
      .basic_auth(&self.secret_key, None::<&str>)
      .form(form)
      .send()
      .await
      .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(%status, path, "Stripe request failed: {}", body);
    if status.is_server_error() {
      return Err(GatewayError::Unavailable(format!("Stripe returned {}", status)));
    }
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
      .ok()
      .and_then(|envelope| envelope.error.message)
      .unwrap_or_else(|| format!("Stripe returned {}", status));
    Err(GatewayError::Rejected(message))
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "stripe::create_payment_intent", skip(self, request), fields(amount = %request.amount, currency = %request.currency))]
  async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
    let amount = request.minor_units()?;

    let mut form = vec![
      ("amount".to_string(), amount.to_string()),
      ("currency".to_string(), request.currency.clone()),
      ("description".to_string(), request.description.clone()),
      ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    for (key, value) in &request.metadata {
      form.push((format!("metadata[{}]", key), value.clone()));
    }

    let intent: IntentResponse = self
      .post_form("/payment_intents", &form)
      .await?
      .json()
      .await
      .map_err(|e| GatewayError::Rejected(format!("Unreadable payment intent response: {}", e)))?;

    let client_secret = intent
      .client_secret
      .ok_or_else(|| GatewayError::Rejected("Payment intent has no client secret".to_string()))?;
    info!(payment_intent_id = %intent.id, "Stripe payment intent created.");
    Ok(PaymentIntent {
      id: intent.id,
      client_secret,
    })
  }

  #[instrument(name = "stripe::refund", skip(self))]
  async fn refund(&self, payment_intent_id: &str) -> Result<(), GatewayError> {
    let form = vec![("payment_intent".to_string(), payment_intent_id.to_string())];
    self.post_form("/refunds", &form).await?;
    info!("Stripe refund created.");
    Ok(())
  }
}
