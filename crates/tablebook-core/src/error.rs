//! Error taxonomy for `tablebook-core`.
//!
//! Every failure reaching a caller is one of four kinds. Only
//! [`Error::Storage`] is worth retrying; the engine itself never retries.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{booking::BookingId, table::TableId};

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-policy input. Always caller-fixable.
  #[error("invalid request: {0}")]
  Validation(String),

  /// The (table, instant) pair already holds a booking.
  #[error("table {table_id} is already booked for {reserved_for}")]
  Conflict {
    table_id:     TableId,
    reserved_for: DateTime<Utc>,
  },

  /// Only raised by administrative lookups of a specific booking.
  #[error("booking not found: {0}")]
  NotFound(BookingId),

  /// The store was unreachable, timed out, or failed internally.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  /// Whether repeating the same call may succeed.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Storage(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
