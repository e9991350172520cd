//! Error types for `waybill-core`.

use thiserror::Error;

/// Failure of one whole import run.
///
/// `E` is the order source's error type (a malformed record in the input
/// document), `S` the store backend's. The `RollbackAfter*` variants carry
/// both the original failure and the rollback failure so neither masks the
/// other.
#[derive(Debug, Error)]
pub enum LoadError<E, S>
where
  E: std::error::Error + 'static,
  S: std::error::Error + 'static,
{
  /// The order source yielded a malformed record; the transaction was
  /// rolled back.
  #[error("order source failed: {0}")]
  Source(#[source] E),

  /// A store lookup, insert, or commit failed; the transaction was rolled
  /// back.
  #[error("store operation failed: {0}")]
  Store(#[source] S),

  /// The order source failed and the subsequent rollback attempt also
  /// failed.
  #[error("order source failed: {cause}; rollback also failed: {rollback}")]
  RollbackAfterSource { cause: E, rollback: S },

  /// A store operation failed and the subsequent rollback attempt also
  /// failed.
  #[error("store operation failed: {cause}; rollback also failed: {rollback}")]
  RollbackAfterStore { cause: S, rollback: S },
}
