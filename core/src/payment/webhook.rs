// zipline/src/payment/webhook.rs

//! Payment webhook verification and typed parsing.
//!
//! Signature header format: `t=<unix seconds>,v1=<hex hmac-sha256>` where the
//! MAC covers `"<t>.<raw body>"`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::ORDER_ID_METADATA_KEY;
use crate::error::WebhookError;
use crate::model::PaymentEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
  PaymentSucceeded,
  PaymentFailed,
  PaymentCanceled,
  DisputeCreated,
  /// Anything else the provider sends. Logged and acknowledged.
  Unknown(String),
}

impl WebhookEventKind {
  fn from_type(event_type: &str) -> Self {
    match event_type {
      "payment_intent.succeeded" => WebhookEventKind::PaymentSucceeded,
      "payment_intent.payment_failed" => WebhookEventKind::PaymentFailed,
      "payment_intent.canceled" => WebhookEventKind::PaymentCanceled,
      "charge.dispute.created" => WebhookEventKind::DisputeCreated,
      other => WebhookEventKind::Unknown(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
  pub id: String,
  pub event_type: String,
  pub kind: WebhookEventKind,
  pub payment_intent_id: Option<String>,
  pub order_id: Option<Uuid>,
  pub amount: Option<Decimal>,
  pub currency: Option<String>,
}

impl WebhookEvent {
  pub fn to_log_entry(&self, received_at: DateTime<Utc>) -> PaymentEvent {
    PaymentEvent {
      event_id: self.id.clone(),
      event_type: self.event_type.clone(),
      payment_intent_id: self.payment_intent_id.clone(),
      order_id: self.order_id,
      amount: self.amount,
      currency: self.currency.clone(),
      received_at,
    }
  }
}

#[derive(Deserialize)]
struct RawEvent {
  id: String,
  #[serde(rename = "type")]
  event_type: String,
  data: RawData,
}

#[derive(Deserialize)]
struct RawData {
  object: RawObject,
}

#[derive(Deserialize)]
struct RawObject {
  id: Option<String>,
  object: Option<String>,
  amount: Option<i64>,
  currency: Option<String>,
  #[serde(default)]
  metadata: HashMap<String, String>,
  /// Present on dispute objects.
  payment_intent: Option<String>,
}

/// Checks the signature against `secret`, then parses the body.
pub fn verify_and_parse(
  raw_body: &[u8],
  signature_header: &str,
  secret: &str,
  now: DateTime<Utc>,
  tolerance: Duration,
) -> Result<WebhookEvent, WebhookError> {
  verify_signature(raw_body, signature_header, secret, now, tolerance)?;
  parse_event(raw_body)
}

pub fn verify_signature(
  payload: &[u8],
  sig_header: &str,
  secret: &str,
  now: DateTime<Utc>,
  tolerance: Duration,
) -> Result<(), WebhookError> {
  let mut timestamp = "";
  let mut signatures = Vec::new();
  for part in sig_header.split(',') {
    let part = part.trim();
    if let Some(t) = part.strip_prefix("t=") {
      timestamp = t;
    } else if let Some(v) = part.strip_prefix("v1=") {
      signatures.push(v);
    }
  }
  if timestamp.is_empty() || signatures.is_empty() {
    return Err(WebhookError::SignatureInvalid("malformed signature header"));
  }

  let ts: i64 = timestamp
    .parse()
    .map_err(|_| WebhookError::SignatureInvalid("invalid timestamp"))?;
  let age = (now.timestamp() - ts).unsigned_abs();
  if age > tolerance.as_secs() {
    return Err(WebhookError::SignatureInvalid("timestamp outside tolerance"));
  }

  // Providers may send several v1 entries during secret rotation.
  let matched = signatures.iter().any(|sig| {
    let Ok(sig_bytes) = hex::decode(sig) else {
      return false;
    };
    signed_mac(secret, timestamp, payload)
      .map(|mac| mac.verify_slice(&sig_bytes).is_ok())
      .unwrap_or(false)
  });
  if matched {
    Ok(())
  } else {
    Err(WebhookError::SignatureInvalid("signature mismatch"))
  }
}

/// Produces a header that `verify_signature` accepts. Used by the mock
/// gateway tooling and tests.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
  let ts = timestamp.to_string();
  let digest = signed_mac(secret, &ts, payload)
    .map(|mac| hex::encode(mac.finalize().into_bytes()))
    .unwrap_or_default();
  format!("t={},v1={}", ts, digest)
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Option<Hmac<Sha256>> {
  let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
  mac.update(timestamp.as_bytes());
  mac.update(b".");
  mac.update(payload);
  Some(mac)
}

pub fn parse_event(raw_body: &[u8]) -> Result<WebhookEvent, WebhookError> {
  let raw: RawEvent = serde_json::from_slice(raw_body).map_err(|e| WebhookError::Malformed(e.to_string()))?;
  let object = raw.data.object;

  let payment_intent_id = match object.object.as_deref() {
    Some("payment_intent") => object.id.clone(),
    _ => object.payment_intent.clone(),
  };
  let order_id = object
    .metadata
    .get(ORDER_ID_METADATA_KEY)
    .and_then(|raw_id| Uuid::parse_str(raw_id).ok());

  Ok(WebhookEvent {
    kind: WebhookEventKind::from_type(&raw.event_type),
    id: raw.id,
    event_type: raw.event_type,
    payment_intent_id,
    order_id,
    amount: object.amount.map(|minor| Decimal::new(minor, 2)),
    currency: object.currency,
  })
}
