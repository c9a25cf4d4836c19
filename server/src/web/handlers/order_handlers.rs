// zipline_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;
use zipline::{NewOrder, NewOrderItem, Order, OrderStatus, TransitionOutcome};

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct CreateOrderRequest {
  pub items: Vec<NewOrderItem>,
  #[serde(default)]
  pub tip: Decimal,
  pub delivery_address: String,
  #[serde(default)]
  pub delivery_instructions: Option<String>,
  #[serde(default)]
  pub campus_delivery: bool,
}

impl CreateOrderRequest {
  fn into_new_order(self, user_id: Uuid) -> NewOrder {
    NewOrder {
      user_id,
      items: self.items,
      tip: self.tip,
      delivery_address: self.delivery_address,
      delivery_instructions: self.delivery_instructions,
      campus_delivery: self.campus_delivery,
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub status: Option<OrderStatus>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CompleteOrderRequest {
  #[serde(default)]
  pub photo_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CancelOrderRequest {
  #[serde(default)]
  pub reason: Option<String>,
}

/// 200 with the updated order, or the 409 conflict body.
fn transition_response(outcome: TransitionOutcome) -> Result<HttpResponse> {
  match outcome {
    TransitionOutcome::Applied(order) => Ok(HttpResponse::Ok().json(json!({"applied": true, "order": order}))),
    TransitionOutcome::NotApplied { current_status } => Err(AppError::NotApplied { current_status }),
  }
}

/// Owners and assigned fulfillers may read an order; queued orders are
/// visible to everyone so zippers can pick them.
fn can_view(order: &Order, user_id: Uuid) -> bool {
  order.user_id == user_id || order.fulfilled_by == Some(user_id) || order.status == OrderStatus::InQueue
}

// --- Handlers ---

#[instrument(
    name = "handler::create_order",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, item_count = req_payload.items.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let new_order = req_payload.into_inner().into_new_order(auth_user.user_id);
  let receipt = app_state.engine.create_order(new_order).await?;

  info!(order_id = %receipt.order.id, total = %receipt.order.total_amount, "Order created.");
  let (payment_intent_id, client_secret) = match &receipt.payment_intent {
    Some(intent) => (Some(intent.id.clone()), Some(intent.client_secret.clone())),
    None => (None, None),
  };
  Ok(HttpResponse::Created().json(json!({
    "order": receipt.order,
    "items": receipt.items,
    "payment_intent_id": payment_intent_id,
    "client_secret": client_secret,
    "currency": app_state.config.default_currency,
  })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let order_id = path.into_inner();
  let order = app_state.engine.get_order(order_id).await?;
  if !can_view(&order, auth_user.user_id) {
    return Err(AppError::Forbidden(format!("Order {} is not visible to this user.", order_id)));
  }
  let items = app_state.engine.order_items(order_id).await?;
  Ok(HttpResponse::Ok().json(json!({"order": order, "items": items})))
}

/// Defaults to the queue zippers browse.
#[instrument(name = "handler::list_orders", skip(app_state, _auth_user))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let status = query.status.unwrap_or(OrderStatus::InQueue);
  let orders = app_state.engine.orders_by_status(status).await?;
  Ok(HttpResponse::Ok().json(json!({"status": status, "orders": orders})))
}

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse> {
  let orders = app_state.engine.orders_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({"orders": orders})))
}

#[instrument(name = "handler::accept_order", skip(app_state, auth_user), fields(fulfiller_id = %auth_user.user_id))]
pub async fn accept_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let outcome = app_state.engine.accept_order(path.into_inner(), auth_user.user_id).await?;
  transition_response(outcome)
}

#[instrument(name = "handler::complete_order", skip(app_state, req_payload, auth_user), fields(fulfiller_id = %auth_user.user_id))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<CompleteOrderRequest>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let photo_url = req_payload.and_then(|payload| payload.into_inner().photo_url);
  let outcome = app_state
    .engine
    .complete_order(path.into_inner(), auth_user.user_id, photo_url)
    .await?;
  transition_response(outcome)
}

#[instrument(name = "handler::cancel_order", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: Option<web::Json<CancelOrderRequest>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let reason = req_payload.and_then(|payload| payload.into_inner().reason);
  let outcome = app_state
    .engine
    .cancel_order(path.into_inner(), auth_user.user_id, reason)
    .await?;
  transition_response(outcome)
}

#[instrument(name = "handler::store_credit", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn store_credit_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let outcome = app_state
    .engine
    .confirm_store_credit_payment(path.into_inner(), auth_user.user_id)
    .await?;
  transition_response(outcome)
}

/// Fresh intent for a `pending` order whose checkout could not reach the
/// processor.
#[instrument(name = "handler::payment_intent", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn payment_intent_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let order_id = path.into_inner();
  let order = app_state.engine.get_order(order_id).await?;
  if order.user_id != auth_user.user_id {
    return Err(AppError::Forbidden(format!("Order {} belongs to another user.", order_id)));
  }
  let intent = app_state.engine.create_payment_intent(order_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "order_id": order_id,
    "payment_intent_id": intent.id,
    "client_secret": intent.client_secret,
  })))
}
