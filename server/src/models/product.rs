// zipline_server/src/models/product.rs

use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog price lookup; the rest of the product row is not needed here.
#[derive(Debug, Clone, FromRow)]
pub struct ProductPrice {
  pub id: Uuid,
  pub price: Decimal,
}
