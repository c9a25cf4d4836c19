// zipline_server/src/db/mod.rs

//! Postgres implementations of the engine's store traits.
//!
//! Queries are runtime-checked (`sqlx::query`/`query_as`), so the crate
//! builds without a live database.

mod devices;
mod inventory;
mod orders;
mod payment_events;

use sqlx::PgPool;
use zipline::StoreError;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn backend(err: sqlx::Error) -> StoreError {
  tracing::error!(error = %err, "Database operation failed.");
  StoreError::backend(err)
}
