// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;
use zipline::notify::LoggingMessagingGateway;
use zipline::payment::webhook::sign_payload;
use zipline::payment::MockPaymentGateway;
use zipline::{LifecycleDeps, LifecycleEngine, MemoryStore, Role, TracingAlertSink};
use zipline_server::web::configure_app_routes;
use zipline_server::{AppConfig, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_http_test";

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

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused".to_string(),
    run_migrations: false,
    webhook_secret: WEBHOOK_SECRET.to_string(),
    stripe_secret_key: None,
    default_currency: "usd".to_string(),
    fcm_project_id: None,
    fcm_access_token: None,
    notification_timeout: Duration::from_millis(500),
    token_sweep_interval: Duration::from_secs(3600),
  }
}

/// The real routes over the in-memory store and the mock processor.
pub struct TestServer {
  pub store: Arc<MemoryStore>,
  pub payments: Arc<MockPaymentGateway>,
  pub state: AppState,
  pub burrito: Uuid,
}

impl TestServer {
  pub fn new() -> Self {
    setup_tracing();
    let config = Arc::new(test_config());
    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(MockPaymentGateway::new());
    let burrito = Uuid::new_v4();
    store.add_product(burrito, dec("15.99"), 50);

    let deps = LifecycleDeps {
      orders: store.clone(),
      inventory: store.clone(),
      devices: store.clone(),
      payment_events: store.clone(),
      payments: payments.clone(),
      messaging: Arc::new(LoggingMessagingGateway),
      alerts: Arc::new(TracingAlertSink),
    };
    let engine = LifecycleEngine::new(deps, config.lifecycle_config()).expect("engine builds");
    let state = AppState::new(Arc::new(engine), config);
    Self {
      store,
      payments,
      state,
      burrito,
    }
  }

  pub fn app(
    &self,
  ) -> App<
    impl ServiceFactory<
      ServiceRequest,
      Config = (),
      Response = ServiceResponse<impl MessageBody>,
      Error = actix_web::Error,
      InitError = (),
    >,
  > {
    App::new()
      .app_data(web::Data::new(self.state.clone()))
      .configure(configure_app_routes)
  }

  /// A fresh user holding the zipper role.
  pub fn zipper(&self) -> Uuid {
    let zipper = Uuid::new_v4();
    self.store.assign_role(zipper, Role::Zipper);
    zipper
  }

  /// Body for one burrito plus a $2.00 tip: $17.99.
  pub fn order_body(&self) -> serde_json::Value {
    serde_json::json!({
      "items": [{"product_id": self.burrito, "quantity": 1}],
      "tip": "2.00",
      "delivery_address": "Dorm 4, Room 210",
      "campus_delivery": true,
    })
  }
}

pub fn dec(raw: &str) -> Decimal {
  Decimal::from_str(raw).expect("valid decimal")
}

pub fn signed(body: &str) -> String {
  sign_payload(body.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp())
}

pub fn payment_succeeded(event_id: &str, order_id: Uuid) -> String {
  serde_json::json!({
    "id": event_id,
    "type": "payment_intent.succeeded",
    "data": {
      "object": {
        "id": format!("pi_{}", event_id),
        "object": "payment_intent",
        "amount": 1799,
        "currency": "usd",
        "metadata": { "order_id": order_id.to_string() },
      }
    }
  })
  .to_string()
}
