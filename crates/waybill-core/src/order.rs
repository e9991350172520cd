//! Order records as extracted from a source document.
//!
//! These are transient, read-only values: the reader produces them, the
//! loader consumes them, nothing mutates them in between.

use rust_decimal::Decimal;

/// One sale transaction from the source document.
///
/// `id` is externally assigned and must be unique across the run; the store
/// uses it verbatim as the purchase primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
  pub id:                i64,
  /// Registration date, passed through to the store uninterpreted.
  pub registration_date: String,
  pub total_cost:        Decimal,
  pub customer:          Customer,
  /// Line items in document order; possibly empty.
  pub line_items:        Vec<LineItem>,
}

/// The buyer embedded in an order.
///
/// Store identity is the exact `(full_name, email)` pair; no case or
/// whitespace normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
  pub full_name: String,
  pub email:     String,
}

/// One product-quantity-price entry within an order.
///
/// `unit_price` is the price at time of sale; together with `product_name`
/// it forms the product's natural key, so the same name at a different price
/// is a different product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
  pub product_name: String,
  pub unit_price:   Decimal,
  pub quantity:     i64,
}
