// zipline/src/model/mod.rs

//! Entities the lifecycle engine reads and writes.

pub mod device;
pub mod order;
pub mod payment_event;
pub mod status;

pub use device::{Audience, DeviceRegistration, Platform, Role};
pub use order::{max_order_amount, NewOrder, NewOrderItem, Order, OrderItem, StatusHistoryEntry};
pub use payment_event::PaymentEvent;
pub use status::OrderStatus;
