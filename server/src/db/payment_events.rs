// zipline_server/src/db/payment_events.rs

use async_trait::async_trait;
use zipline::store::PaymentEventLog;
use zipline::{PaymentEvent, StoreResult};

use super::{backend, PgStore};

#[async_trait]
impl PaymentEventLog for PgStore {
  async fn has_processed(&self, event_id: &str) -> StoreResult<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_events WHERE event_id = $1)")
      .bind(event_id)
      .fetch_one(&self.pool)
      .await
      .map_err(backend)
  }

  async fn record(&self, event: &PaymentEvent) -> StoreResult<bool> {
    let result = sqlx::query(
      "INSERT INTO payment_events (event_id, event_type, payment_intent_id, order_id, amount, currency, received_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(&event.event_id)
    .bind(&event.event_type)
    .bind(&event.payment_intent_id)
    .bind(event.order_id)
    .bind(event.amount)
    .bind(&event.currency)
    .bind(event.received_at)
    .execute(&self.pool)
    .await
    .map_err(backend)?;
    Ok(result.rows_affected() == 1)
  }
}
