// zipline/src/lib.rs

//! Zipline: the order lifecycle engine behind a campus delivery service.
//!
//! The crate owns the parts of the backend that have to be right under
//! concurrency and retries:
//!  - The order status state machine, guarded by a compare-and-swap.
//!  - Signed payment webhooks, de-duplicated by event id.
//!  - Idempotent stock consumption for paid orders.
//!  - Best-effort push notification fan-out to registered devices.
//!
//! Each transition runs as a small step pipeline: one required commit step,
//! then best-effort side effects whose failures are logged and dropped.
//! Storage, payments and push delivery are traits injected by the host;
//! `store::MemoryStore` and `payment::MockPaymentGateway` implement them
//! in-process.

pub mod alert;
pub mod config;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod payment;
pub mod pipeline;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::alert::{AlertSink, OpsAlert, TracingAlertSink};
pub use crate::config::LifecycleConfig;
pub use crate::error::{
  GatewayError, LifecycleError, LifecycleResult, PipelineError, StoreError, StoreResult, WebhookError,
};
pub use crate::inventory::{ConsumptionOutcome, InventoryAdjuster, StockAdjustment};
pub use crate::lifecycle::{
  CheckoutReceipt, LifecycleDeps, LifecycleEngine, TransitionKind, TransitionOutcome, WebhookDisposition,
};
pub use crate::model::{
  Audience, DeviceRegistration, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentEvent, Platform, Role,
  StatusHistoryEntry,
};
pub use crate::notify::{DispatchSummary, MessagingGateway, NotificationDispatcher, PushMessage};
pub use crate::payment::{PaymentGateway, PaymentIntent, PaymentIntentRequest};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::store::{DeviceStore, InventoryStore, MemoryStore, OrderStore, PaymentEventLog, StatusUpdate};
