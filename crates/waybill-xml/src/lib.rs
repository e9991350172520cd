//! XML order-document reader for Waybill.
//!
//! Turns a loaded XML document into a lazy sequence of
//! [`Order`](waybill_core::order::Order) records. Pure extraction; no
//! database interaction happens here.

mod read;

pub mod error;

pub use error::{Error, Result};
pub use read::OrderReader;
