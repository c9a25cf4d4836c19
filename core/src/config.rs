// zipline/src/config.rs

use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// Engine settings. Built by the host application (the server reads them from
/// the environment); `Default` matches production behaviour.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
  pub currency: String,
  /// Shared secret for payment webhook signatures.
  pub webhook_secret: String,
  /// Maximum accepted age of a signed webhook.
  pub webhook_tolerance: Duration,
  /// Upper bound on one notification fan-out; on expiry the send is dropped.
  pub notification_timeout: Duration,
  /// Registrations older than this are not sent to.
  pub token_freshness: ChronoDuration,
  /// Registrations older than this are deleted by the sweep.
  pub token_retention: ChronoDuration,
}

impl Default for LifecycleConfig {
  fn default() -> Self {
    Self {
      currency: "usd".to_string(),
      webhook_secret: String::new(),
      webhook_tolerance: Duration::from_secs(300),
      notification_timeout: Duration::from_secs(5),
      token_freshness: ChronoDuration::days(7),
      token_retention: ChronoDuration::days(30),
    }
  }
}

impl LifecycleConfig {
  pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
    self.webhook_secret = secret.into();
    self
  }
}
