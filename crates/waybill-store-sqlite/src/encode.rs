//! Encoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.

use rust_decimal::Decimal;

/// Money columns hold normalized decimal text (trailing zeros stripped) so
/// that exact text equality on a natural-key lookup agrees with numeric
/// equality: a line item priced `49.990` resolves to a product stored at
/// `49.99`.
pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }
