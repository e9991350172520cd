//! Error type for `waybill-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  /// An explicit-id purchase insert was attempted while identity-override
  /// mode was off. The purchase key column is auto-generated by default.
  #[error("explicit purchase ids require identity-override mode")]
  IdentityOverrideDisabled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
