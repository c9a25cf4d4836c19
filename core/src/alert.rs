// zipline/src/alert.rs

//! Operational alerts for failures that must not reach customers but do need
//! a human (e.g. stock not decremented for a paid order).

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpsAlert {
  pub kind: &'static str,
  pub order_id: Option<Uuid>,
  pub message: String,
}

pub trait AlertSink: Send + Sync {
  fn raise(&self, alert: OpsAlert);
}

/// Emits alerts as `error` events on the `ops_alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
  fn raise(&self, alert: OpsAlert) {
    tracing::error!(
      target: "ops_alert",
      kind = alert.kind,
      order_id = ?alert.order_id,
      "{}",
      alert.message
    );
  }
}
