// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every fixture.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;
use zipline::alert::{AlertSink, OpsAlert};
use zipline::notify::{MessagingGateway, PushMessage};
use zipline::payment::webhook::sign_payload;
use zipline::payment::MockPaymentGateway;
use zipline::{
  DeviceRegistration, GatewayError, LifecycleConfig, LifecycleDeps, LifecycleEngine, MemoryStore, NewOrder,
  NewOrderItem, Order, Platform, Role, TransitionOutcome,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Gateways and sinks that remember what they were asked to do ---

#[derive(Default)]
pub struct RecordingMessagingGateway {
  sent: Mutex<Vec<(String, PushMessage)>>,
  failing_tokens: Mutex<HashSet<String>>,
  delay: Mutex<Option<Duration>>,
}

impl RecordingMessagingGateway {
  pub fn fail_token(&self, token: &str) {
    self.failing_tokens.lock().insert(token.to_string());
  }

  pub fn fail_everything(&self) {
    self.failing_tokens.lock().insert("*".to_string());
  }

  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock() = Some(delay);
  }

  pub fn sent(&self) -> Vec<(String, PushMessage)> {
    self.sent.lock().clone()
  }

  pub fn sent_tokens(&self) -> Vec<String> {
    let mut tokens: Vec<String> = self.sent.lock().iter().map(|(token, _)| token.clone()).collect();
    tokens.sort();
    tokens
  }
}

#[async_trait]
impl MessagingGateway for RecordingMessagingGateway {
  async fn send(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError> {
    let delay = *self.delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    let failing = {
      let failing = self.failing_tokens.lock();
      failing.contains("*") || failing.contains(token)
    };
    if failing {
      return Err(GatewayError::Rejected(format!("token {} unregistered", token)));
    }
    self.sent.lock().push((token.to_string(), message.clone()));
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingAlertSink {
  alerts: Mutex<Vec<OpsAlert>>,
}

impl RecordingAlertSink {
  pub fn alerts(&self) -> Vec<OpsAlert> {
    self.alerts.lock().clone()
  }
}

impl AlertSink for RecordingAlertSink {
  fn raise(&self, alert: OpsAlert) {
    self.alerts.lock().push(alert);
  }
}

// --- Engine harness ---

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub payments: Arc<MockPaymentGateway>,
  pub messaging: Arc<RecordingMessagingGateway>,
  pub alerts: Arc<RecordingAlertSink>,
  pub engine: Arc<LifecycleEngine>,
  /// $15.99 each, 100 in stock.
  pub burrito: Uuid,
  /// $2.50 each, 100 in stock.
  pub soda: Uuid,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_config(test_config())
  }

  pub fn with_config(config: LifecycleConfig) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(MockPaymentGateway::new());
    let messaging = Arc::new(RecordingMessagingGateway::default());
    let alerts = Arc::new(RecordingAlertSink::default());

    let deps = LifecycleDeps {
      orders: store.clone(),
      inventory: store.clone(),
      devices: store.clone(),
      payment_events: store.clone(),
      payments: payments.clone(),
      messaging: messaging.clone(),
      alerts: alerts.clone(),
    };
    let engine = Arc::new(LifecycleEngine::new(deps, config).expect("pipeline builds"));

    let burrito = Uuid::new_v4();
    let soda = Uuid::new_v4();
    store.add_product(burrito, dec("15.99"), 100);
    store.add_product(soda, dec("2.50"), 100);

    Harness {
      store,
      payments,
      messaging,
      alerts,
      engine,
      burrito,
      soda,
    }
  }

  pub fn new_order(&self, customer: Uuid, items: &[(Uuid, i32)], tip: &str) -> NewOrder {
    NewOrder {
      user_id: customer,
      items: items
        .iter()
        .map(|(product_id, quantity)| NewOrderItem {
          product_id: *product_id,
          quantity: *quantity,
        })
        .collect(),
      tip: dec(tip),
      delivery_address: "Dorm 4, Room 210".to_string(),
      delivery_instructions: None,
      campus_delivery: true,
    }
  }

  /// One burrito plus a $2.00 tip: $17.99 total.
  pub async fn place_order(&self, customer: Uuid) -> Order {
    let new_order = self.new_order(customer, &[(self.burrito, 1)], "2.00");
    self.engine.create_order(new_order).await.expect("order created").order
  }

  /// A placed order whose payment has been confirmed (`in_queue`).
  pub async fn paid_order(&self, customer: Uuid) -> Order {
    let order = self.place_order(customer).await;
    let outcome = self
      .engine
      .confirm_payment(order.id, Some(format!("pi_{}", order.id.simple())))
      .await
      .expect("payment confirmed");
    applied(outcome)
  }

  /// A fresh user holding the zipper role.
  pub fn zipper(&self) -> Uuid {
    let zipper = Uuid::new_v4();
    self.store.assign_role(zipper, Role::Zipper);
    zipper
  }

  /// A paid order accepted by `zipper` (`in_progress`). Grants `zipper` the
  /// role first.
  pub async fn accepted_order(&self, customer: Uuid, zipper: Uuid) -> Order {
    self.store.assign_role(zipper, Role::Zipper);
    let order = self.paid_order(customer).await;
    applied(self.engine.accept_order(order.id, zipper).await.expect("order accepted"))
  }

  pub async fn register(&self, user_id: Uuid, token: &str, role: Option<Role>) {
    if let Some(role) = role {
      self.store.assign_role(user_id, role);
    }
    self
      .engine
      .dispatcher()
      .register_device(&registration(user_id, token, Utc::now()))
      .await
      .expect("device registered");
  }

  pub fn signed(&self, body: &str) -> String {
    sign_payload(body.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp())
  }
}

pub fn test_config() -> LifecycleConfig {
  LifecycleConfig {
    notification_timeout: Duration::from_millis(500),
    ..LifecycleConfig::default()
  }
  .with_webhook_secret(WEBHOOK_SECRET)
}

pub fn registration(user_id: Uuid, token: &str, refreshed_at: chrono::DateTime<Utc>) -> DeviceRegistration {
  DeviceRegistration {
    user_id,
    device_id: format!("device-{}", token),
    platform: Platform::Ios,
    token: token.to_string(),
    app_version: Some("1.4.0".to_string()),
    refreshed_at,
  }
}

pub fn dec(raw: &str) -> Decimal {
  raw.parse().expect("valid decimal literal")
}

pub fn applied(outcome: TransitionOutcome) -> Order {
  match outcome {
    TransitionOutcome::Applied(order) => order,
    other => panic!("expected Applied, got {:?}", other),
  }
}

// --- Webhook bodies in the processor's event shape ---

pub fn payment_intent_event(event_id: &str, event_type: &str, order_id: Option<Uuid>, amount_cents: i64) -> String {
  let metadata = match order_id {
    Some(id) => serde_json::json!({ "order_id": id.to_string() }),
    None => serde_json::json!({}),
  };
  serde_json::json!({
    "id": event_id,
    "type": event_type,
    "data": {
      "object": {
        "id": format!("pi_{}", event_id),
        "object": "payment_intent",
        "amount": amount_cents,
        "currency": "usd",
        "metadata": metadata,
      }
    }
  })
  .to_string()
}

pub fn dispute_event(event_id: &str, payment_intent_id: &str) -> String {
  serde_json::json!({
    "id": event_id,
    "type": "charge.dispute.created",
    "data": {
      "object": {
        "id": format!("dp_{}", event_id),
        "object": "dispute",
        "amount": 1799,
        "currency": "usd",
        "payment_intent": payment_intent_id,
      }
    }
  })
  .to_string()
}
