// zipline_server/src/state.rs
use crate::config::AppConfig;
use std::sync::Arc;
use zipline::LifecycleEngine;

#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<LifecycleEngine>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  pub fn new(engine: Arc<LifecycleEngine>, config: Arc<AppConfig>) -> Self {
    Self { engine, config }
  }
}
