// zipline_server/src/web/handlers/device_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use zipline::{Audience, DeviceRegistration, Platform};

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct RegisterDeviceRequest {
  pub device_id: String,
  pub platform: Platform,
  pub token: String,
  #[serde(default)]
  pub app_version: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ActiveDevicesQuery {
  #[serde(default)]
  pub all_users: bool,
}

#[instrument(
    name = "handler::register_device",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, platform = ?req_payload.platform)
)]
pub async fn register_device_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterDeviceRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let payload = req_payload.into_inner();
  if payload.device_id.trim().is_empty() || payload.token.trim().is_empty() {
    return Err(AppError::Validation("device_id and token are required.".to_string()));
  }

  let registration = DeviceRegistration {
    user_id: auth_user.user_id,
    device_id: payload.device_id,
    platform: payload.platform,
    token: payload.token,
    app_version: payload.app_version,
    refreshed_at: Utc::now(),
  };
  app_state.engine.dispatcher().register_device(&registration).await?;
  Ok(HttpResponse::Ok().json(json!({
    "registered": true,
    "device_id": registration.device_id,
    "refreshed_at": registration.refreshed_at,
  })))
}

/// Fresh tokens for the caller, or for every user with `?all_users=true`
/// (zippers only).
#[instrument(name = "handler::active_devices", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn active_devices_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ActiveDevicesQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let audience = if query.all_users {
    auth_user.require_zipper(&app_state.engine).await?;
    Audience::Everyone
  } else {
    Audience::User(auth_user.user_id)
  };
  let tokens = app_state
    .engine
    .dispatcher()
    .resolve_active_tokens(audience, Utc::now())
    .await?;
  Ok(HttpResponse::Ok().json(json!({"count": tokens.len(), "tokens": tokens})))
}
