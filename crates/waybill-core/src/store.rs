//! The `OrderStore` / `StoreTransaction` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `waybill-store-sqlite`). The loader depends on this abstraction, not on
//! any concrete backend.

use rust_decimal::Decimal;

use crate::order::Customer;

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a relational order store.
///
/// A store hands out at most one transaction at a time; the transaction is
/// exclusively owned by the caller of [`begin`](OrderStore::begin) until it
/// is committed or rolled back.
pub trait OrderStore {
  type Error: std::error::Error + Send + Sync + 'static;
  type Tx<'conn>: StoreTransaction<Error = Self::Error>
  where
    Self: 'conn;

  /// Open the transaction that will span one whole import run.
  fn begin(&mut self) -> Result<Self::Tx<'_>, Self::Error>;
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// Operations available inside one store transaction.
///
/// The `resolve_or_create_*` lookups are check-then-act: they are not backed
/// by a uniqueness constraint and are only correct under a single writer.
/// Concurrent runs against the same store can duplicate customer or product
/// rows. Callers wanting stronger guarantees must swap in a backend with
/// atomic upsert semantics; the loader does not need to change for that.
///
/// `commit` and `rollback` are the only terminal operations; both consume
/// the transaction, so a finished transaction cannot be used again.
pub trait StoreTransaction {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Token proving identity-override mode is held. Dropping it releases the
  /// mode; there is no other way to release it.
  type IdentityOverride<'o>
  where
    Self: 'o;

  /// Look up a customer row by exact `(full_name, email)` match; insert one
  /// and read back the generated key if absent.
  fn resolve_or_create_customer(
    &self,
    customer: &Customer,
  ) -> Result<i64, Self::Error>;

  /// Look up a product row by exact `(name, start_price)` match; insert one
  /// and read back the generated key if absent.
  fn resolve_or_create_product(
    &self,
    name: &str,
    start_price: Decimal,
  ) -> Result<i64, Self::Error>;

  /// Enable identity-override mode on the purchases table.
  ///
  /// The mode stays enabled for the lifetime of the returned token and is
  /// released when the token drops, including when an insert between
  /// acquire and drop fails.
  fn identity_override(
    &self,
  ) -> Result<Self::IdentityOverride<'_>, Self::Error>;

  /// Insert a purchase row with an externally supplied `id`.
  ///
  /// Requires identity-override mode; fails otherwise, since the purchase
  /// key column is auto-generated by default.
  fn insert_purchase(
    &self,
    id: i64,
    customer_id: i64,
    purchase_date: &str,
    total_cost: Decimal,
  ) -> Result<(), Self::Error>;

  /// Insert a link row tying a purchase to a product.
  fn insert_purchase_item(
    &self,
    purchase_id: i64,
    product_id: i64,
    count: i64,
    price: Decimal,
  ) -> Result<(), Self::Error>;

  /// Make every write in this transaction durable.
  fn commit(self) -> Result<(), Self::Error>;

  /// Discard every write in this transaction.
  fn rollback(self) -> Result<(), Self::Error>;
}
