// zipline_server/src/web/handlers/mod.rs

pub mod device_handlers;
pub mod notification_handlers;
pub mod order_handlers;
pub mod webhook_handlers;
