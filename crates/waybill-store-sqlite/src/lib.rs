//! SQLite backend for the Waybill order store.
//!
//! Implements the `waybill-core` store traits over a single
//! [`rusqlite::Connection`]; one import run maps to one SQLite transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{IdentityOverride, SqliteStore, SqliteTx};
