// zipline/src/lifecycle/mod.rs

//! The order state machine.
//!
//! Every status change goes through `OrderStore::conditional_update_status`,
//! a compare-and-swap keyed on the status the caller last saw. Two fulfillers
//! racing to accept the same order therefore produce exactly one `Applied`
//! and one `NotApplied { current_status: InProgress }`. The engine is
//! stateless per request; it holds only injected collaborators.

pub mod context;
pub mod steps;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::alert::AlertSink;
use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, LifecycleResult, PipelineError};
use crate::inventory::InventoryAdjuster;
use crate::model::{max_order_amount, NewOrder, Order, OrderItem, OrderStatus, Role, StatusHistoryEntry};
use crate::notify::{MessagingGateway, NotificationDispatcher};
use crate::payment::{self, PaymentGateway, PaymentIntent, PaymentIntentRequest, WebhookEvent, WebhookEventKind};
use crate::pipeline::{ContextData, PipelineResult};
use crate::store::{DeviceStore, InventoryStore, OrderStore, PaymentEventLog, StatusUpdate};

pub use context::{TransitionCtx, TransitionKind, TransitionOutcome};
use steps::{StepServices, TransitionPipeline};

/// Everything the engine talks to. Constructed by the host and passed in;
/// the engine keeps no global clients.
#[derive(Clone)]
pub struct LifecycleDeps {
  pub orders: Arc<dyn OrderStore>,
  pub inventory: Arc<dyn InventoryStore>,
  pub devices: Arc<dyn DeviceStore>,
  pub payment_events: Arc<dyn PaymentEventLog>,
  pub payments: Arc<dyn PaymentGateway>,
  pub messaging: Arc<dyn MessagingGateway>,
  pub alerts: Arc<dyn AlertSink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
  pub order: Order,
  pub items: Vec<OrderItem>,
  /// Absent when the processor could not be reached; the order stays
  /// `pending` and the client can ask for a new intent.
  #[serde(skip)]
  pub payment_intent: Option<PaymentIntent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
  Processed {
    event_id: String,
    order_id: Uuid,
    applied: bool,
  },
  /// Event id already in the payment event log.
  Duplicate { event_id: String },
  /// Unknown type, or no order to act on.
  Ignored { event_id: String, reason: String },
}

pub struct LifecycleEngine {
  orders: Arc<dyn OrderStore>,
  inventory: Arc<dyn InventoryStore>,
  devices: Arc<dyn DeviceStore>,
  payment_events: Arc<dyn PaymentEventLog>,
  payments: Arc<dyn PaymentGateway>,
  dispatcher: Arc<NotificationDispatcher>,
  config: LifecycleConfig,
  pipeline: TransitionPipeline,
}

impl LifecycleEngine {
  pub fn new(deps: LifecycleDeps, config: LifecycleConfig) -> Result<Self, PipelineError> {
    let dispatcher = Arc::new(NotificationDispatcher::new(
      deps.devices.clone(),
      deps.messaging.clone(),
      &config,
    ));
    let services = Arc::new(StepServices {
      orders: deps.orders.clone(),
      payments: deps.payments.clone(),
      inventory: InventoryAdjuster::new(deps.orders.clone(), deps.inventory.clone(), deps.alerts.clone()),
      dispatcher: dispatcher.clone(),
      config: config.clone(),
    });
    let pipeline = steps::build_pipeline(services)?;

    Ok(Self {
      orders: deps.orders,
      inventory: deps.inventory,
      devices: deps.devices,
      payment_events: deps.payment_events,
      payments: deps.payments,
      dispatcher,
      config,
      pipeline,
    })
  }

  pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
    &self.dispatcher
  }

  pub fn config(&self) -> &LifecycleConfig {
    &self.config
  }

  // --- Checkout ---

  /// Prices the items from the catalog, persists order and items atomically
  /// as `pending`, then opens a payment intent tagged with the order id.
  #[instrument(name = "lifecycle::create_order", skip(self, new_order), fields(user_id = %new_order.user_id), err)]
  pub async fn create_order(&self, new_order: NewOrder) -> LifecycleResult<CheckoutReceipt> {
    validate_new_order(&new_order)?;

    let product_ids: Vec<Uuid> = new_order.items.iter().map(|item| item.product_id).collect();
    let prices = self.inventory.unit_prices(&product_ids).await?;

    let order_id = Uuid::new_v4();
    let mut items = Vec::with_capacity(new_order.items.len());
    for item in &new_order.items {
      let unit_price = prices
        .get(&item.product_id)
        .copied()
        .ok_or_else(|| LifecycleError::Validation(format!("Unknown product: {}", item.product_id)))?;
      let line = OrderItem::snapshot(order_id, item.product_id, item.quantity, unit_price)
        .ok_or_else(|| amount_too_large(item.product_id))?;
      items.push(line);
    }

    let now = Utc::now();
    let order = Order::price(order_id, &new_order, &items, now)
      .ok_or_else(|| LifecycleError::Validation("Order total is too large".to_string()))?;
    if order.total_amount <= Decimal::ZERO {
      return Err(LifecycleError::Validation("Order total must be greater than zero".to_string()));
    }
    if order.total_amount >= max_order_amount() {
      return Err(LifecycleError::Validation(format!(
        "Order total must be below {}",
        max_order_amount()
      )));
    }

    self.orders.create_order(&order, &items).await?;
    info!(order_id = %order.id, total = %order.total_amount, "Order created.");

    let history = StatusHistoryEntry {
      order_id: order.id,
      status: OrderStatus::Pending,
      reason: "order_created".to_string(),
      metadata: serde_json::json!({ "item_count": items.len() }),
      recorded_at: now,
    };
    if let Err(e) = self.orders.append_status_history(&history).await {
      warn!(order_id = %order.id, error = %e, "Status history write failed.");
    }

    let payment_intent = match self.open_payment_intent(&order).await {
      Ok(intent) => Some(intent),
      Err(e) => {
        warn!(order_id = %order.id, error = %e, "Payment intent creation failed; order left pending.");
        None
      }
    };

    Ok(CheckoutReceipt {
      order,
      items,
      payment_intent,
    })
  }

  /// A fresh payment intent for an order still awaiting payment.
  #[instrument(name = "lifecycle::create_payment_intent", skip(self), err)]
  pub async fn create_payment_intent(&self, order_id: Uuid) -> LifecycleResult<PaymentIntent> {
    let order = self.load(order_id).await?;
    if order.status != OrderStatus::Pending {
      return Err(LifecycleError::InvalidTransition {
        order_id,
        from: order.status,
        to: OrderStatus::InQueue,
      });
    }
    Ok(self.open_payment_intent(&order).await?)
  }

  async fn open_payment_intent(&self, order: &Order) -> Result<PaymentIntent, crate::error::GatewayError> {
    let request = PaymentIntentRequest::for_order(order, &self.config.currency);
    self.payments.create_payment_intent(&request).await
  }

  // --- Payment webhook ---

  /// Verifies, de-duplicates and routes one webhook delivery. Errors other
  /// than signature/body problems mean "retry later".
  #[instrument(name = "lifecycle::handle_webhook", skip_all, fields(body_len = raw_body.len()), err)]
  pub async fn handle_webhook(&self, raw_body: &[u8], signature_header: &str) -> LifecycleResult<WebhookDisposition> {
    let now = Utc::now();
    let event = payment::verify_and_parse(
      raw_body,
      signature_header,
      &self.config.webhook_secret,
      now,
      self.config.webhook_tolerance,
    )?;
    info!(event_id = %event.id, event_type = %event.event_type, "Payment webhook verified.");

    if self.payment_events.has_processed(&event.id).await? {
      info!(event_id = %event.id, "Duplicate webhook delivery; no-op.");
      return Ok(WebhookDisposition::Duplicate { event_id: event.id });
    }

    let disposition = self.route_webhook_event(&event).await?;

    // Logged only after processing so a failed attempt is redelivered. A
    // replay that slips past this check is still a no-op at the status guard.
    match self.payment_events.record(&event.to_log_entry(now)).await {
      Ok(true) => {}
      Ok(false) => info!(event_id = %event.id, "Webhook event logged concurrently."),
      Err(e) => warn!(event_id = %event.id, error = %e, "Payment event log write failed."),
    }
    Ok(disposition)
  }

  async fn route_webhook_event(&self, event: &WebhookEvent) -> LifecycleResult<WebhookDisposition> {
    let ignored = |reason: &str| -> LifecycleResult<WebhookDisposition> {
      warn!(event_id = %event.id, reason, "Webhook event ignored.");
      Ok(WebhookDisposition::Ignored {
        event_id: event.id.clone(),
        reason: reason.to_string(),
      })
    };

    let order_id = match (&event.kind, event.order_id) {
      (WebhookEventKind::Unknown(_), _) => return ignored("unhandled event type"),
      (_, Some(order_id)) => order_id,
      (WebhookEventKind::DisputeCreated, None) => {
        let Some(reference) = event.payment_intent_id.as_deref() else {
          return ignored("dispute without payment intent");
        };
        match self.orders.get_order_by_payment_reference(reference).await? {
          Some(order) => order.id,
          None => return ignored("no order for disputed payment"),
        }
      }
      (_, None) => return ignored("missing order_id metadata"),
    };

    let result = match event.kind {
      WebhookEventKind::PaymentSucceeded => {
        self.warn_on_amount_mismatch(order_id, event).await;
        self.confirm_payment(order_id, event.payment_intent_id.clone()).await
      }
      WebhookEventKind::PaymentFailed | WebhookEventKind::PaymentCanceled => self.fail_payment(order_id).await,
      WebhookEventKind::DisputeCreated => self.open_dispute(order_id).await,
      WebhookEventKind::Unknown(_) => return ignored("unhandled event type"),
    };

    match result {
      Ok(outcome) => Ok(WebhookDisposition::Processed {
        event_id: event.id.clone(),
        order_id,
        applied: outcome.is_applied(),
      }),
      Err(LifecycleError::OrderNotFound(_)) => ignored("order not found"),
      Err(e) => Err(e),
    }
  }

  async fn warn_on_amount_mismatch(&self, order_id: Uuid, event: &WebhookEvent) {
    let Some(amount) = event.amount else { return };
    if let Ok(Some(order)) = self.orders.get_order(order_id).await {
      if order.total_amount != amount {
        warn!(
          %order_id,
          expected = %order.total_amount,
          received = %amount,
          "Webhook amount differs from order total."
        );
      }
    }
  }

  // --- Transitions ---

  /// `pending -> in_queue` after the processor confirms payment. Replays and
  /// late deliveries find the order past `pending` and do nothing.
  #[instrument(name = "lifecycle::confirm_payment", skip(self), err)]
  pub async fn confirm_payment(
    &self,
    order_id: Uuid,
    payment_reference: Option<String>,
  ) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if order.status != OrderStatus::Pending {
      info!(%order_id, status = %order.status, "Order already past pending; payment confirmation is a no-op.");
      return Ok(TransitionOutcome::NotApplied {
        current_status: order.status,
      });
    }
    let update = StatusUpdate::new(order_id, OrderStatus::Pending, OrderStatus::InQueue)
      .with_payment_reference(payment_reference);
    self
      .run_transition(TransitionCtx::new(TransitionKind::ConfirmPayment, order, update, None))
      .await
  }

  /// Manual checkout paid with store credit. Same guard and side effects as
  /// a processor-confirmed payment; no payment reference is recorded.
  #[instrument(name = "lifecycle::confirm_store_credit_payment", skip(self), err)]
  pub async fn confirm_store_credit_payment(&self, order_id: Uuid, requested_by: Uuid) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if order.user_id != requested_by {
      return Err(LifecycleError::Forbidden {
        order_id,
        user_id: requested_by,
      });
    }
    if order.status != OrderStatus::Pending {
      return Ok(TransitionOutcome::NotApplied {
        current_status: order.status,
      });
    }
    let update = StatusUpdate::new(order_id, OrderStatus::Pending, OrderStatus::InQueue);
    let ctx = TransitionCtx::new(TransitionKind::StoreCreditPayment, order, update, Some(requested_by))
      .with_metadata(serde_json::json!({ "method": "store_credit" }));
    self.run_transition(ctx).await
  }

  /// `pending -> cancelled` on a failed or canceled payment. No stock is
  /// touched and the customer is not notified.
  #[instrument(name = "lifecycle::fail_payment", skip(self), err)]
  pub async fn fail_payment(&self, order_id: Uuid) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if order.status != OrderStatus::Pending {
      info!(%order_id, status = %order.status, "Payment failure for order past pending; ignored.");
      return Ok(TransitionOutcome::NotApplied {
        current_status: order.status,
      });
    }
    let update = StatusUpdate::new(order_id, OrderStatus::Pending, OrderStatus::Cancelled);
    self
      .run_transition(TransitionCtx::new(TransitionKind::FailPayment, order, update, None))
      .await
  }

  /// `in_queue -> in_progress`, assigning the order to `fulfiller_id`, who
  /// must hold the zipper role. Losing the race yields `NotApplied`.
  #[instrument(name = "lifecycle::accept_order", skip(self), err)]
  pub async fn accept_order(&self, order_id: Uuid, fulfiller_id: Uuid) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if self.devices.role_of(fulfiller_id).await? != Some(Role::Zipper) {
      return Err(LifecycleError::Forbidden {
        order_id,
        user_id: fulfiller_id,
      });
    }
    match order.status {
      OrderStatus::InQueue => {}
      OrderStatus::InProgress => {
        return Ok(TransitionOutcome::NotApplied {
          current_status: order.status,
        })
      }
      from => {
        return Err(LifecycleError::InvalidTransition {
          order_id,
          from,
          to: OrderStatus::InProgress,
        })
      }
    }
    let update = StatusUpdate::new(order_id, OrderStatus::InQueue, OrderStatus::InProgress).assign_to(fulfiller_id);
    self
      .run_transition(TransitionCtx::new(TransitionKind::Accept, order, update, Some(fulfiller_id)))
      .await
  }

  /// `in_progress -> delivered`, only by the assigned fulfiller.
  #[instrument(name = "lifecycle::complete_order", skip(self, photo_url), err)]
  pub async fn complete_order(
    &self,
    order_id: Uuid,
    fulfiller_id: Uuid,
    photo_url: Option<String>,
  ) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if order.status != OrderStatus::InProgress {
      return Err(LifecycleError::InvalidTransition {
        order_id,
        from: order.status,
        to: OrderStatus::Delivered,
      });
    }
    if order.fulfilled_by != Some(fulfiller_id) {
      return Err(LifecycleError::NotAssignedFulfiller { order_id, fulfiller_id });
    }
    let update = StatusUpdate::new(order_id, OrderStatus::InProgress, OrderStatus::Delivered)
      .held_by(fulfiller_id)
      .with_completion_photo(photo_url);
    self
      .run_transition(TransitionCtx::new(TransitionKind::Complete, order, update, Some(fulfiller_id)))
      .await
  }

  /// Cancels a `pending`, `in_queue` or `in_progress` order on behalf of its
  /// owner or its assigned fulfiller. Anything else is an invalid transition.
  #[instrument(name = "lifecycle::cancel_order", skip(self, reason), err)]
  pub async fn cancel_order(
    &self,
    order_id: Uuid,
    requested_by: Uuid,
    reason: Option<String>,
  ) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if order.user_id != requested_by && order.fulfilled_by != Some(requested_by) {
      return Err(LifecycleError::Forbidden {
        order_id,
        user_id: requested_by,
      });
    }
    if !order.status.is_cancellable() {
      return Err(LifecycleError::InvalidTransition {
        order_id,
        from: order.status,
        to: OrderStatus::Cancelled,
      });
    }
    let update = StatusUpdate::new(order_id, order.status, OrderStatus::Cancelled);
    let ctx = TransitionCtx::new(TransitionKind::Cancel, order, update, Some(requested_by)).with_reason(reason);
    self.run_transition(ctx).await
  }

  /// `in_progress | delivered -> disputed`. Other states log and ignore.
  #[instrument(name = "lifecycle::open_dispute", skip(self), err)]
  pub async fn open_dispute(&self, order_id: Uuid) -> LifecycleResult<TransitionOutcome> {
    let order = self.load(order_id).await?;
    if !order.status.can_transition_to(OrderStatus::Disputed) {
      warn!(%order_id, status = %order.status, "Dispute for order in a non-disputable state; ignored.");
      return Ok(TransitionOutcome::NotApplied {
        current_status: order.status,
      });
    }
    let update = StatusUpdate::new(order_id, order.status, OrderStatus::Disputed);
    self
      .run_transition(TransitionCtx::new(TransitionKind::Dispute, order, update, None))
      .await
  }

  async fn run_transition(&self, ctx: TransitionCtx) -> LifecycleResult<TransitionOutcome> {
    let update = &ctx.update;
    if !update.expected_status.can_transition_to(update.new_status) {
      return Err(LifecycleError::InvalidTransition {
        order_id: update.order_id,
        from: update.expected_status,
        to: update.new_status,
      });
    }

    let ctx_data = ContextData::new(ctx);
    let result = self.pipeline.run(ctx_data.clone()).await?;
    let final_ctx = ctx_data.snapshot();
    match (result, final_ctx.after) {
      (PipelineResult::Completed, Some(order)) => Ok(TransitionOutcome::Applied(order)),
      _ => Ok(TransitionOutcome::NotApplied {
        current_status: final_ctx.current_status.unwrap_or(final_ctx.before.status),
      }),
    }
  }

  // --- Reads ---

  pub async fn role_of(&self, user_id: Uuid) -> LifecycleResult<Option<Role>> {
    Ok(self.devices.role_of(user_id).await?)
  }

  pub async fn get_order(&self, order_id: Uuid) -> LifecycleResult<Order> {
    self.load(order_id).await
  }

  pub async fn order_items(&self, order_id: Uuid) -> LifecycleResult<Vec<OrderItem>> {
    Ok(self.orders.get_order_items(order_id).await?)
  }

  pub async fn orders_by_status(&self, status: OrderStatus) -> LifecycleResult<Vec<Order>> {
    Ok(self.orders.get_orders_by_status(status).await?)
  }

  pub async fn orders_for_user(&self, user_id: Uuid) -> LifecycleResult<Vec<Order>> {
    Ok(self.orders.get_orders_for_user(user_id).await?)
  }

  async fn load(&self, order_id: Uuid) -> LifecycleResult<Order> {
    self
      .orders
      .get_order(order_id)
      .await?
      .ok_or(LifecycleError::OrderNotFound(order_id))
  }
}

fn amount_too_large(product_id: Uuid) -> LifecycleError {
  LifecycleError::Validation(format!("Line total for product {} is too large", product_id))
}

fn validate_new_order(new_order: &NewOrder) -> LifecycleResult<()> {
  if new_order.items.is_empty() {
    return Err(LifecycleError::Validation("Order must contain at least one item".to_string()));
  }
  if let Some(item) = new_order.items.iter().find(|item| item.quantity <= 0) {
    return Err(LifecycleError::Validation(format!(
      "Quantity for product {} must be positive",
      item.product_id
    )));
  }
  let mut seen = HashSet::new();
  if let Some(item) = new_order.items.iter().find(|item| !seen.insert(item.product_id)) {
    return Err(LifecycleError::Validation(format!(
      "Product {} listed more than once",
      item.product_id
    )));
  }
  if new_order.tip < Decimal::ZERO {
    return Err(LifecycleError::Validation("Tip cannot be negative".to_string()));
  }
  if new_order.tip >= max_order_amount() {
    return Err(LifecycleError::Validation(format!("Tip must be below {}", max_order_amount())));
  }
  // Totals are charged in cents; a sub-cent tip could never be paid.
  if new_order.tip.normalize().scale() > 2 {
    return Err(LifecycleError::Validation(
      "Tip cannot have more than two decimal places".to_string(),
    ));
  }
  if new_order.delivery_address.trim().is_empty() {
    return Err(LifecycleError::Validation("Delivery address is required".to_string()));
  }
  Ok(())
}
