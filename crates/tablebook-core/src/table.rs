//! Table — one physical seating unit.

use serde::{Deserialize, Serialize};

/// Positive, stable identifier of a table.
pub type TableId = i64;

/// A table is created once at seed time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
  pub table_id: TableId,
  /// Optional zone label, e.g. "Main hall" or "Terrace".
  pub area:     Option<String>,
}
