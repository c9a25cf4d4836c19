// zipline_server/src/web/handlers/notification_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;
use zipline::Audience;

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct TestNotificationRequest {
  pub title: String,
  pub body: String,
  /// Defaults to the caller. Anyone else, or `all_users`, needs the
  /// zipper role.
  #[serde(default)]
  pub user_id: Option<Uuid>,
  #[serde(default)]
  pub all_users: bool,
}

#[instrument(name = "handler::test_notification", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn test_notification_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<TestNotificationRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let payload = req_payload.into_inner();
  if payload.title.trim().is_empty() || payload.body.trim().is_empty() {
    return Err(AppError::Validation("title and body are required.".to_string()));
  }

  if payload.all_users || payload.user_id.is_some_and(|target| target != auth_user.user_id) {
    auth_user.require_zipper(&app_state.engine).await?;
  }
  let audience = if payload.all_users {
    Audience::Everyone
  } else {
    Audience::User(payload.user_id.unwrap_or(auth_user.user_id))
  };
  let summary = app_state
    .engine
    .dispatcher()
    .send_test_notification(audience, &payload.title, &payload.body, Utc::now())
    .await?;

  info!(successful = summary.successful, failed = summary.failed, "Test notification sent.");
  Ok(HttpResponse::Ok().json(json!({
    "sent": summary.successful,
    "failed": summary.failed,
    "total": summary.total(),
  })))
}
