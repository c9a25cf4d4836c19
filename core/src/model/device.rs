// zipline/src/model/device.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Customer,
  /// Fulfillment agent who accepts and delivers orders.
  Zipper,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Customer => "customer",
      Role::Zipper => "zipper",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
  Ios,
  Android,
  Web,
}

impl Platform {
  pub fn as_str(&self) -> &'static str {
    match self {
      Platform::Ios => "ios",
      Platform::Android => "android",
      Platform::Web => "web",
    }
  }
}

/// Who a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
  User(Uuid),
  Role(Role),
  /// Every user with a fresh registration.
  Everyone,
}

/// Push endpoint for one (user, device) pair. Re-registration refreshes the
/// row instead of adding one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistration {
  pub user_id: Uuid,
  pub device_id: String,
  pub platform: Platform,
  pub token: String,
  #[serde(default)]
  pub app_version: Option<String>,
  pub refreshed_at: DateTime<Utc>,
}
