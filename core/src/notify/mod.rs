// zipline/src/notify/mod.rs

//! Push notification dispatch: token resolution, fan-out, and stale-token
//! housekeeping. Delivery is best-effort throughout.

pub mod content;
pub mod gateway;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::LifecycleConfig;
use crate::error::StoreResult;
use crate::model::{Audience, DeviceRegistration};
use crate::store::DeviceStore;

pub use content::NotificationKind;
pub use gateway::{LoggingMessagingGateway, MessagingGateway, Priority, PushMessage};

/// Per-call delivery tally. Partial failure is still a successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
  pub successful: usize,
  pub failed: usize,
}

impl DispatchSummary {
  pub fn total(&self) -> usize {
    self.successful + self.failed
  }
}

pub struct NotificationDispatcher {
  devices: Arc<dyn DeviceStore>,
  gateway: Arc<dyn MessagingGateway>,
  freshness: ChronoDuration,
  retention: ChronoDuration,
}

impl NotificationDispatcher {
  pub fn new(devices: Arc<dyn DeviceStore>, gateway: Arc<dyn MessagingGateway>, config: &LifecycleConfig) -> Self {
    Self {
      devices,
      gateway,
      freshness: config.token_freshness,
      retention: config.token_retention,
    }
  }

  #[instrument(name = "notify::register_device", skip(self, registration), fields(user_id = %registration.user_id, device_id = %registration.device_id))]
  pub async fn register_device(&self, registration: &DeviceRegistration) -> StoreResult<()> {
    self.devices.upsert_device(registration).await?;
    debug!("Device registration refreshed.");
    Ok(())
  }

  /// Tokens refreshed within the freshness window. Empty is a valid answer.
  pub async fn resolve_active_tokens(&self, audience: Audience, now: DateTime<Utc>) -> StoreResult<Vec<String>> {
    self.devices.active_tokens(audience, now - self.freshness).await
  }

  /// Sends to every token concurrently; each send stands alone.
  #[instrument(name = "notify::dispatch", skip(self, tokens, message), fields(token_count = tokens.len(), title = %message.title))]
  pub async fn dispatch(&self, tokens: &[String], message: &PushMessage) -> DispatchSummary {
    if tokens.is_empty() {
      debug!("No active tokens; nothing to send.");
      return DispatchSummary::default();
    }

    let sends = tokens.iter().map(|token| async move {
      match self.gateway.send(token, message).await {
        Ok(()) => true,
        Err(e) => {
          warn!(error = %e, "Push send failed for one token.");
          false
        }
      }
    });
    let results = join_all(sends).await;

    let successful = results.iter().filter(|ok| **ok).count();
    let summary = DispatchSummary {
      successful,
      failed: results.len() - successful,
    };
    info!(successful = summary.successful, failed = summary.failed, "Dispatch finished.");
    summary
  }

  /// Resolve and dispatch in one call.
  pub async fn notify(&self, audience: Audience, message: &PushMessage, now: DateTime<Utc>) -> StoreResult<DispatchSummary> {
    let tokens = self.resolve_active_tokens(audience, now).await?;
    Ok(self.dispatch(&tokens, message).await)
  }

  /// Sends a test notification to one user or to every user with a fresh
  /// token.
  #[instrument(name = "notify::send_test", skip(self, title, body))]
  pub async fn send_test_notification(
    &self,
    audience: Audience,
    title: &str,
    body: &str,
    now: DateTime<Utc>,
  ) -> StoreResult<DispatchSummary> {
    let message = content::test_message(title, body, now);
    self.notify(audience, &message, now).await
  }

  /// Deletes registrations older than the retention window.
  #[instrument(name = "notify::sweep_stale_registrations", skip(self))]
  pub async fn sweep_stale_registrations(&self, now: DateTime<Utc>) -> StoreResult<u64> {
    let purged = self.devices.purge_stale(now - self.retention).await?;
    if purged > 0 {
      info!(purged, "Stale device registrations removed.");
    }
    Ok(purged)
  }
}
