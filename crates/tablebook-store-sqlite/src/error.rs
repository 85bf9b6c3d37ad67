//! Error type for `tablebook-store-sqlite`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tablebook_core::table::TableId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("store call timed out after {0:?}")]
  Timeout(Duration),

  #[error("cannot decode stored value: {0}")]
  Decode(String),

  #[error("unknown table {0}")]
  UnknownTable(TableId),

  /// The `(table_id, reserved_for)` pair is already taken.
  #[error("table {table_id} is already booked for {reserved_for}")]
  Conflict {
    table_id:     TableId,
    reserved_for: DateTime<Utc>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for tablebook_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Conflict { table_id, reserved_for } => {
        Self::Conflict { table_id, reserved_for }
      }
      Error::UnknownTable(id) => Self::Validation(format!("unknown table {id}")),
      other => Self::Storage(Box::new(other)),
    }
  }
}
