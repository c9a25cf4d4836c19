// zipline/src/notify/gateway.rs

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Normal,
  High,
}

/// Wire payload handed to the messaging provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
  pub title: String,
  pub body: String,
  /// String-valued, as push providers require.
  pub data: BTreeMap<String, String>,
  pub priority: Priority,
  pub sound: String,
  pub badge: u32,
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
  /// Delivers to a single device token.
  async fn send(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMessagingGateway;

#[async_trait]
impl MessagingGateway for LoggingMessagingGateway {
  async fn send(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError> {
    let token_preview: String = token.chars().take(12).collect();
    info!(
      token = %token_preview,
      title = %message.title,
      body = %message.body,
      "Push message (logging gateway)."
    );
    Ok(())
  }
}
