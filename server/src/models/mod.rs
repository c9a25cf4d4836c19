// zipline_server/src/models/mod.rs

//! Row types for the Postgres schema and their conversions into the
//! engine's domain types.

pub mod device;
pub mod order;
pub mod order_item;
pub mod product;

pub use device::{DbPlatform, DbRole};
pub use order::{DbOrderStatus, OrderRow};
pub use order_item::OrderItemRow;
pub use product::ProductPrice;
