// zipline_server/src/services/fcm.rs

//! Push delivery through the FCM HTTP v1 API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use zipline::notify::{MessagingGateway, Priority, PushMessage};
use zipline::GatewayError;

const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";

pub struct FcmGateway {
  client: reqwest::Client,
  project_id: String,
  access_token: String,
}

impl FcmGateway {
  pub fn new(client: reqwest::Client, project_id: String, access_token: String) -> Self {
    Self {
      client,
      project_id,
      access_token,
    }
  }

  fn endpoint(&self) -> String {
    format!("{}/projects/{}/messages:send", FCM_API_BASE, self.project_id)
  }
}

/// The v1 request body for one device token.
pub fn message_body(token: &str, message: &PushMessage) -> Value {
  let android_priority = match message.priority {
    Priority::High => "high",
    Priority::Normal => "normal",
  };
  let apns_priority = match message.priority {
    Priority::High => "10",
    Priority::Normal => "5",
  };
  json!({
    "message": {
      "token": token,
      "notification": {
        "title": message.title,
        "body": message.body,
      },
      "data": message.data,
      "android": {
        "priority": android_priority,
        "notification": { "sound": message.sound },
      },
      "apns": {
        "headers": { "apns-priority": apns_priority },
        "payload": {
          "aps": { "sound": message.sound, "badge": message.badge },
        },
      },
    }
  })
}

#[async_trait]
impl MessagingGateway for FcmGateway {
  #[instrument(name = "fcm::send", skip_all, fields(title = %message.title))]
  async fn send(&self, token: &str, message: &PushMessage) -> Result<(), GatewayError> {
    let response = self
      .client
      .post(self.endpoint())
      .bearer_auth(&self.access_token)
      .json(&message_body(token, message))
      .send()
      .await
      .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
      debug!("FCM accepted message.");
      return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%status, "FCM rejected message: {}", body);
    if status.is_server_error() {
      Err(GatewayError::Unavailable(format!("FCM returned {}", status)))
    } else {
      Err(GatewayError::Rejected(format!("FCM returned {}", status)))
    }
  }
}
