//! [`SqliteStore`] — the SQLite implementation of the order store traits.

use std::{cell::Cell, path::Path};

use rusqlite::OptionalExtension as _;
use rust_decimal::Decimal;
use waybill_core::{
  order::Customer,
  store::{OrderStore, StoreTransaction},
};

use crate::{Error, Result, encode::encode_decimal, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Waybill order store backed by a single SQLite file.
pub struct SqliteStore {
  pub(crate) conn: rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = rusqlite::Connection::open(path)?;
    let store = Self { conn };
    store.init_schema()?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub fn open_in_memory() -> Result<Self> {
    let conn = rusqlite::Connection::open_in_memory()?;
    let store = Self { conn };
    store.init_schema()?;
    Ok(store)
  }

  fn init_schema(&self) -> Result<()> {
    self.conn.execute_batch(SCHEMA)?;
    Ok(())
  }
}

impl OrderStore for SqliteStore {
  type Error = Error;
  type Tx<'conn>
    = SqliteTx<'conn>
  where
    Self: 'conn;

  fn begin(&mut self) -> Result<SqliteTx<'_>> {
    Ok(SqliteTx {
      tx:               self.conn.transaction()?,
      override_enabled: Cell::new(false),
    })
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// One import transaction. Dropping it without a commit rolls it back.
pub struct SqliteTx<'conn> {
  tx: rusqlite::Transaction<'conn>,
  /// Whether identity-override mode is currently held for the purchases
  /// table. Real store state: explicit-id inserts are refused while off.
  pub(crate) override_enabled: Cell<bool>,
}

/// Token proving identity-override mode is held; dropping it releases the
/// mode on every exit path.
pub struct IdentityOverride<'tx> {
  flag: &'tx Cell<bool>,
}

impl Drop for IdentityOverride<'_> {
  fn drop(&mut self) { self.flag.set(false); }
}

impl<'conn> StoreTransaction for SqliteTx<'conn> {
  type Error = Error;
  type IdentityOverride<'o>
    = IdentityOverride<'o>
  where
    Self: 'o;

  fn resolve_or_create_customer(&self, customer: &Customer) -> Result<i64> {
    let existing: Option<i64> = self
      .tx
      .query_row(
        "SELECT id FROM customers WHERE name = ?1 AND email = ?2",
        rusqlite::params![customer.full_name, customer.email],
        |row| row.get(0),
      )
      .optional()?;

    if let Some(id) = existing {
      return Ok(id);
    }

    self.tx.execute(
      "INSERT INTO customers (name, email) VALUES (?1, ?2)",
      rusqlite::params![customer.full_name, customer.email],
    )?;
    Ok(self.tx.last_insert_rowid())
  }

  fn resolve_or_create_product(
    &self,
    name: &str,
    start_price: Decimal,
  ) -> Result<i64> {
    let price_text = encode_decimal(start_price);

    let existing: Option<i64> = self
      .tx
      .query_row(
        "SELECT id FROM products WHERE name = ?1 AND start_price = ?2",
        rusqlite::params![name, price_text],
        |row| row.get(0),
      )
      .optional()?;

    if let Some(id) = existing {
      return Ok(id);
    }

    self.tx.execute(
      "INSERT INTO products (name, start_price) VALUES (?1, ?2)",
      rusqlite::params![name, price_text],
    )?;
    Ok(self.tx.last_insert_rowid())
  }

  fn identity_override(&self) -> Result<IdentityOverride<'_>> {
    self.override_enabled.set(true);
    Ok(IdentityOverride {
      flag: &self.override_enabled,
    })
  }

  fn insert_purchase(
    &self,
    id: i64,
    customer_id: i64,
    purchase_date: &str,
    total_cost: Decimal,
  ) -> Result<()> {
    if !self.override_enabled.get() {
      return Err(Error::IdentityOverrideDisabled);
    }
    self.tx.execute(
      "INSERT INTO purchases (id, customer_id, purchase_date, total_cost)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![id, customer_id, purchase_date, encode_decimal(total_cost)],
    )?;
    Ok(())
  }

  fn insert_purchase_item(
    &self,
    purchase_id: i64,
    product_id: i64,
    count: i64,
    price: Decimal,
  ) -> Result<()> {
    self.tx.execute(
      "INSERT INTO purchase_items (purchase_id, product_id, count, price)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![purchase_id, product_id, count, encode_decimal(price)],
    )?;
    Ok(())
  }

  fn commit(self) -> Result<()> {
    self.tx.commit()?;
    Ok(())
  }

  fn rollback(self) -> Result<()> {
    self.tx.rollback()?;
    Ok(())
  }
}
