// zipline/src/lifecycle/steps.rs

//! The transition pipeline: one required commit, then best-effort effects.
//!
//! Only `commit_transition` can fail a transition. Everything after it runs
//! against an already-committed status and is logged and dropped on error.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::context::{TransitionCtx, TransitionKind};
use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, LifecycleResult, PipelineError};
use crate::inventory::InventoryAdjuster;
use crate::model::{Audience, Role, StatusHistoryEntry};
use crate::notify::{content, NotificationDispatcher, NotificationKind};
use crate::payment::PaymentGateway;
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};
use crate::store::OrderStore;

pub const COMMIT_TRANSITION: &str = "commit_transition";
pub const APPEND_STATUS_HISTORY: &str = "append_status_history";
pub const CONSUME_INVENTORY: &str = "consume_inventory";
pub const REFUND_PAYMENT: &str = "refund_payment";
pub const RECORD_FULFILLER_STATS: &str = "record_fulfiller_stats";
pub const DISPATCH_NOTIFICATIONS: &str = "dispatch_notifications";

pub type TransitionPipeline = Pipeline<TransitionCtx, LifecycleError>;

/// Collaborators the steps close over.
pub(crate) struct StepServices {
  pub orders: Arc<dyn OrderStore>,
  pub payments: Arc<dyn PaymentGateway>,
  pub inventory: InventoryAdjuster,
  pub dispatcher: Arc<NotificationDispatcher>,
  pub config: LifecycleConfig,
}

fn skip_unless(pred: fn(&TransitionCtx) -> bool) -> Option<SkipCondition<TransitionCtx>> {
  Some(Arc::new(move |ctx: &ContextData<TransitionCtx>| {
    let guard = ctx.read();
    !(guard.applied && pred(&*guard))
  }))
}

pub(crate) fn build_pipeline(services: Arc<StepServices>) -> Result<TransitionPipeline, PipelineError> {
  let mut p = TransitionPipeline::new(&[
    (COMMIT_TRANSITION, false, None),
    (APPEND_STATUS_HISTORY, true, skip_unless(|_| true)),
    (CONSUME_INVENTORY, true, skip_unless(|ctx| ctx.kind.consumes_inventory())),
    (
      REFUND_PAYMENT,
      true,
      skip_unless(|ctx| ctx.kind == TransitionKind::Cancel && ctx.before.payment_reference.is_some()),
    ),
    (
      RECORD_FULFILLER_STATS,
      true,
      skip_unless(|ctx| ctx.kind == TransitionKind::Complete),
    ),
    (
      DISPATCH_NOTIFICATIONS,
      true,
      skip_unless(|ctx| notification_audience(ctx).is_some()),
    ),
  ]);

  let s = services.clone();
  p.on_step(COMMIT_TRANSITION, move |ctx| commit_transition(s.clone(), ctx))?;
  let s = services.clone();
  p.on_step(APPEND_STATUS_HISTORY, move |ctx| append_status_history(s.clone(), ctx))?;
  let s = services.clone();
  p.on_step(CONSUME_INVENTORY, move |ctx| consume_inventory(s.clone(), ctx))?;
  let s = services.clone();
  p.on_step(REFUND_PAYMENT, move |ctx| refund_payment(s.clone(), ctx))?;
  let s = services.clone();
  p.on_step(RECORD_FULFILLER_STATS, move |ctx| record_fulfiller_stats(s.clone(), ctx))?;
  let s = services;
  p.on_step(DISPATCH_NOTIFICATIONS, move |ctx| dispatch_notifications(s.clone(), ctx))?;

  Ok(p)
}

/// Who hears about a committed transition, and as what.
fn notification_audience(ctx: &TransitionCtx) -> Option<(Audience, NotificationKind)> {
  let owner = ctx.before.user_id;
  match ctx.kind {
    TransitionKind::ConfirmPayment | TransitionKind::StoreCreditPayment => {
      Some((Audience::Role(Role::Zipper), NotificationKind::NewOrderAvailable))
    }
    TransitionKind::Accept | TransitionKind::Complete => {
      Some((Audience::User(owner), NotificationKind::OrderStatusUpdate))
    }
    TransitionKind::Cancel if ctx.actor != Some(owner) => {
      Some((Audience::User(owner), NotificationKind::OrderStatusUpdate))
    }
    _ => None,
  }
}

/// The compare-and-swap. `Stop` when another writer got there first.
async fn commit_transition(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let update = ctx.read().update.clone();
  let applied = services.orders.conditional_update_status(&update).await?;

  if applied {
    let mut guard = ctx.write();
    let mut after = guard.before.clone();
    update.apply_to(&mut after, Utc::now());
    guard.applied = true;
    guard.current_status = Some(after.status);
    guard.after = Some(after);
    info!(
      order_id = %update.order_id,
      from = %update.expected_status,
      to = %update.new_status,
      "Order transition committed."
    );
    return Ok(PipelineControl::Continue);
  }

  let current_status = services
    .orders
    .get_order(update.order_id)
    .await?
    .map(|order| order.status)
    .ok_or(LifecycleError::OrderNotFound(update.order_id))?;
  info!(
    order_id = %update.order_id,
    expected = %update.expected_status,
    current = %current_status,
    "Order transition not applied; precondition lost."
  );
  ctx.write().current_status = Some(current_status);
  Ok(PipelineControl::Stop)
}

async fn append_status_history(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let entry = {
    let guard = ctx.read();
    let mut metadata = guard.metadata.clone();
    if metadata.is_null() {
      metadata = serde_json::json!({});
    }
    if let (Some(obj), Some(actor)) = (metadata.as_object_mut(), guard.actor) {
      obj.insert("actor".to_string(), serde_json::json!(actor));
    }
    StatusHistoryEntry {
      order_id: guard.update.order_id,
      status: guard.update.new_status,
      reason: guard.reason.clone(),
      metadata,
      recorded_at: Utc::now(),
    }
  };
  services.orders.append_status_history(&entry).await?;
  Ok(PipelineControl::Continue)
}

async fn consume_inventory(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let order_id = ctx.read().update.order_id;
  let outcome = services.inventory.apply_order_consumption(order_id).await?;
  ctx.write().inventory = Some(outcome);
  Ok(PipelineControl::Continue)
}

async fn refund_payment(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let (order_id, reference) = {
    let guard = ctx.read();
    (guard.update.order_id, guard.before.payment_reference.clone())
  };
  if let Some(reference) = reference {
    services.payments.refund(&reference).await?;
    info!(%order_id, payment_intent_id = %reference, "Refund initiated for cancelled order.");
    ctx.write().refunded = true;
  }
  Ok(PipelineControl::Continue)
}

async fn record_fulfiller_stats(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let (fulfiller, revenue) = {
    let guard = ctx.read();
    (guard.before.fulfilled_by, guard.before.total_amount)
  };
  if let Some(fulfiller) = fulfiller {
    services.orders.record_fulfiller_completion(fulfiller, revenue).await?;
  }
  Ok(PipelineControl::Continue)
}

async fn dispatch_notifications(
  services: Arc<StepServices>,
  ctx: ContextData<TransitionCtx>,
) -> LifecycleResult<PipelineControl> {
  let (audience, kind, order) = {
    let guard = ctx.read();
    let Some((audience, kind)) = notification_audience(&*guard) else {
      return Ok(PipelineControl::Continue);
    };
    let order = guard.after.clone().unwrap_or_else(|| guard.before.clone());
    (audience, kind, order)
  };

  let now = Utc::now();
  let message = content::order_message(&order, order.status, kind, now);
  let send = services.dispatcher.notify(audience, &message, now);
  match tokio::time::timeout(services.config.notification_timeout, send).await {
    Ok(result) => {
      let summary = result?;
      ctx.write().notification = Some(summary);
      Ok(PipelineControl::Continue)
    }
    Err(_) => {
      warn!(order_id = %order.id, "Notification dispatch timed out; dropping.");
      Err(LifecycleError::Timeout("notification dispatch"))
    }
  }
}
