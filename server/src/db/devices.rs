// zipline_server/src/db/devices.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;
use sqlx::Postgres;
use zipline::store::DeviceStore;
use uuid::Uuid;
use zipline::{Audience, DeviceRegistration, Role, StoreResult};

use super::{backend, PgStore};
use crate::models::{DbPlatform, DbRole};

#[async_trait]
impl DeviceStore for PgStore {
  async fn upsert_device(&self, registration: &DeviceRegistration) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO device_registrations (user_id, device_id, platform, token, app_version, refreshed_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (user_id, device_id) DO UPDATE SET \
         platform = EXCLUDED.platform, \
         token = EXCLUDED.token, \
         app_version = EXCLUDED.app_version, \
         refreshed_at = EXCLUDED.refreshed_at",
    )
    .bind(registration.user_id)
    .bind(&registration.device_id)
    .bind(DbPlatform::from(registration.platform))
    .bind(&registration.token)
    .bind(&registration.app_version)
    .bind(registration.refreshed_at)
    .execute(&self.pool)
    .await
    .map_err(backend)?;
    Ok(())
  }

  async fn active_tokens(&self, audience: Audience, fresh_since: DateTime<Utc>) -> StoreResult<Vec<String>> {
    let query: QueryScalar<'_, Postgres, String, PgArguments> = match audience {
      Audience::User(user_id) => sqlx::query_scalar(
        "SELECT DISTINCT token FROM device_registrations \
         WHERE user_id = $1 AND refreshed_at >= $2 ORDER BY token",
      )
      .bind(user_id)
      .bind(fresh_since),
      Audience::Role(role) => sqlx::query_scalar(
        "SELECT DISTINCT d.token FROM device_registrations d \
         JOIN profiles p ON p.id = d.user_id \
         WHERE p.role = $1 AND d.refreshed_at >= $2 ORDER BY d.token",
      )
      .bind(DbRole::from(role))
      .bind(fresh_since),
      Audience::Everyone => sqlx::query_scalar(
        "SELECT DISTINCT token FROM device_registrations WHERE refreshed_at >= $1 ORDER BY token",
      )
      .bind(fresh_since),
    };
    query.fetch_all(&self.pool).await.map_err(backend)
  }

  async fn purge_stale(&self, older_than: DateTime<Utc>) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM device_registrations WHERE refreshed_at < $1")
      .bind(older_than)
      .execute(&self.pool)
      .await
      .map_err(backend)?;
    Ok(result.rows_affected())
  }

  async fn role_of(&self, user_id: Uuid) -> StoreResult<Option<Role>> {
    let role: Option<DbRole> = sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(backend)?;
    Ok(role.map(Role::from))
  }
}
