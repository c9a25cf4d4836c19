// zipline_server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use zipline::{LifecycleDeps, LifecycleEngine, TracingAlertSink};
use zipline_server::db::PgStore;
use zipline_server::web::configure_app_routes;
use zipline_server::{services, AppConfig, AppState};

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
  tracing::error!(error = %err, "{}", context);
  std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG overrides
    .with_span_events(FmtSpan::CLOSE);
  // LOG_FORMAT=json for log shippers.
  if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
    subscriber.json().init();
  } else {
    subscriber.init();
  }

  tracing::info!("Starting zipline server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| io_error("Failed to load application configuration", e))?);

  let db_pool = PgPool::connect(&app_config.database_url)
    .await
    .map_err(|e| io_error("Failed to connect to the database", e))?;
  tracing::info!("Successfully connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .map_err(|e| io_error("Failed to run database migrations", e))?;
    tracing::info!("Database migrations applied.");
  }

  let http_client = reqwest::Client::new();
  let store = Arc::new(PgStore::new(db_pool));
  let deps = LifecycleDeps {
    orders: store.clone(),
    inventory: store.clone(),
    devices: store.clone(),
    payment_events: store,
    payments: services::payment_gateway(&app_config, http_client.clone()),
    messaging: services::messaging_gateway(&app_config, http_client),
    alerts: Arc::new(TracingAlertSink),
  };
  let engine = Arc::new(
    LifecycleEngine::new(deps, app_config.lifecycle_config())
      .map_err(|e| io_error("Failed to build the lifecycle engine", e))?,
  );

  // Stale device registrations are purged in the background.
  let sweep_dispatcher = engine.dispatcher().clone();
  let sweep_every = app_config.token_sweep_interval;
  actix_rt::spawn(async move {
    let mut ticker = tokio::time::interval(sweep_every);
    loop {
      ticker.tick().await;
      if let Err(e) = sweep_dispatcher.sweep_stale_registrations(Utc::now()).await {
        tracing::warn!(error = %e, "Device registration sweep failed.");
      }
    }
  });

  let app_state = AppState::new(engine, app_config.clone());
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
