// zipline_server/src/lib.rs

//! HTTP service around the `zipline` lifecycle engine: actix-web routes,
//! Postgres stores, and the Stripe and FCM gateways.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
