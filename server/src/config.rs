// zipline_server/src/config.rs

use crate::errors::{AppError, Result};
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use zipline::LifecycleConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub run_migrations: bool,

  // Payment processor. Without a secret key the mock gateway is used.
  pub webhook_secret: String,
  pub stripe_secret_key: Option<String>,
  pub default_currency: String,

  // Push delivery. Without both values messages are only logged.
  pub fcm_project_id: Option<String>,
  pub fcm_access_token: Option<String>,

  pub notification_timeout: Duration,
  pub token_sweep_interval: Duration,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional_env = |var_name: &str| get_env(var_name).ok().filter(|value| !value.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let run_migrations = get_env("RUN_MIGRATIONS")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATIONS value: {}", e)))?;

    let webhook_secret = get_env("PAYMENT_WEBHOOK_SECRET")?;
    let stripe_secret_key = optional_env("STRIPE_SECRET_KEY");
    let default_currency = get_env("DEFAULT_CURRENCY").unwrap_or_else(|_| "usd".to_string());

    let fcm_project_id = optional_env("FCM_PROJECT_ID");
    let fcm_access_token = optional_env("FCM_ACCESS_TOKEN");

    let notification_timeout_ms = get_env("NOTIFICATION_TIMEOUT_MS")
      .unwrap_or_else(|_| "5000".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid NOTIFICATION_TIMEOUT_MS: {}", e)))?;
    let token_sweep_interval_secs = get_env("TOKEN_SWEEP_INTERVAL_SECS")
      .unwrap_or_else(|_| "3600".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid TOKEN_SWEEP_INTERVAL_SECS: {}", e)))?;
    if token_sweep_interval_secs == 0 {
      return Err(AppError::Config("TOKEN_SWEEP_INTERVAL_SECS must be positive".to_string()));
    }

    tracing::info!(
      stripe = stripe_secret_key.is_some(),
      fcm = fcm_project_id.is_some() && fcm_access_token.is_some(),
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      run_migrations,
      webhook_secret,
      stripe_secret_key,
      default_currency,
      fcm_project_id,
      fcm_access_token,
      notification_timeout: Duration::from_millis(notification_timeout_ms),
      token_sweep_interval: Duration::from_secs(token_sweep_interval_secs),
    })
  }

  /// The slice of settings the lifecycle engine needs.
  pub fn lifecycle_config(&self) -> LifecycleConfig {
    LifecycleConfig {
      currency: self.default_currency.clone(),
      notification_timeout: self.notification_timeout,
      token_freshness: ChronoDuration::days(7),
      token_retention: ChronoDuration::days(30),
      ..LifecycleConfig::default()
    }
    .with_webhook_secret(self.webhook_secret.clone())
  }
}
