//! Error types for the waybill-xml reader.

use thiserror::Error;

/// A malformed order record, or a document that is not well-formed XML.
/// Any of these aborts the whole import run.
#[derive(Debug, Error)]
pub enum Error {
  #[error("xml syntax error: {0}")]
  Xml(String),

  #[error("order record missing required field {0:?}")]
  MissingField(&'static str),

  #[error("invalid numeric value {value:?} in field {field:?}")]
  InvalidNumber {
    field: &'static str,
    value: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
