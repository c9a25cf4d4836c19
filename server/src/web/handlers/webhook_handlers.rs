// zipline_server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use zipline::WebhookDisposition;

use crate::errors::{AppError, Result};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Always answers 200 once the event is verified, so the processor stops
/// retrying. Only store failures come back as 500 and get retried.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(payload_bytes = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok())
    .ok_or_else(|| {
      warn!("Payment webhook without a signature header.");
      AppError::Webhook("Missing Stripe-Signature header.".to_string())
    })?;

  let disposition = app_state.engine.handle_webhook(&body, signature).await.map_err(|e| {
    if e.is_retryable() {
      error!(error = %e, "Webhook processing hit a store failure; the processor will retry.");
    }
    AppError::from(e)
  })?;

  let response = match disposition {
    WebhookDisposition::Processed {
      event_id,
      order_id,
      applied,
    } => {
      info!(%event_id, %order_id, applied, "Webhook processed.");
      json!({"received": true, "status": "processed", "event_id": event_id, "order_id": order_id, "applied": applied})
    }
    WebhookDisposition::Duplicate { event_id } => {
      info!(%event_id, "Webhook already processed.");
      json!({"received": true, "status": "duplicate", "event_id": event_id})
    }
    WebhookDisposition::Ignored { event_id, reason } => {
      info!(%event_id, %reason, "Webhook ignored.");
      json!({"received": true, "status": "ignored", "event_id": event_id, "reason": reason})
    }
  };
  Ok(HttpResponse::Ok().json(response))
}
