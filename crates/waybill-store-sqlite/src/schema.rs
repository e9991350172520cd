//! SQL schema for the Waybill SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Customer and product dedup is a lookup-then-insert inside the import
/// transaction, so no UNIQUE constraint backs the natural keys; concurrent
/// runs against the same database can duplicate rows. The importer assumes
/// a single writer.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS customers (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name   TEXT NOT NULL,
    email  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    start_price TEXT NOT NULL    -- normalized decimal text
);

-- The purchase key is supplied by the source document, not generated here;
-- inserts run under identity-override mode.
CREATE TABLE IF NOT EXISTS purchases (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id   INTEGER NOT NULL REFERENCES customers(id),
    purchase_date TEXT NOT NULL,
    total_cost    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS purchase_items (
    purchase_id INTEGER NOT NULL REFERENCES purchases(id),
    product_id  INTEGER NOT NULL REFERENCES products(id),
    count       INTEGER NOT NULL,
    price       TEXT NOT NULL    -- unit price at time of sale
);

CREATE INDEX IF NOT EXISTS customers_key_idx       ON customers(name, email);
CREATE INDEX IF NOT EXISTS products_key_idx        ON products(name, start_price);
CREATE INDEX IF NOT EXISTS purchase_items_purchase_idx
    ON purchase_items(purchase_id);

PRAGMA user_version = 1;
";
