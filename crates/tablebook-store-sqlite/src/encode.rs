//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as RFC 3339 UTC strings with a `Z` suffix so that text
//! comparison orders them chronologically. `reserved_for` is truncated to
//! whole seconds, which keeps the uniqueness constraint exact.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tablebook_core::{booking::Booking, calendar::Slot, table::Table};

use crate::{Error, Result};

// ─── Instants ────────────────────────────────────────────────────────────────

pub fn encode_instant(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn encode_created_at(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_instant(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("instant {s:?}: {e}")))
}

// ─── Dates and slots ─────────────────────────────────────────────────────────

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("day {s:?}: {e}")))
}

pub fn decode_slot(s: &str) -> Result<Slot> {
  s.parse().map_err(|e| Error::Decode(format!("slot {s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawBooking::from_row`].
pub const BOOKING_COLUMNS: &str = "booking_id, table_id, requester_id, requester_name, phone,
   party_size, day, slot_label, reserved_for, created_at";

/// Raw values read directly from a `bookings` row.
pub struct RawBooking {
  pub booking_id:     i64,
  pub table_id:       i64,
  pub requester_id:   Option<i64>,
  pub requester_name: String,
  pub phone:          String,
  pub party_size:     i64,
  pub day:            String,
  pub slot_label:     String,
  pub reserved_for:   String,
  pub created_at:     String,
}

impl RawBooking {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      booking_id:     row.get(0)?,
      table_id:       row.get(1)?,
      requester_id:   row.get(2)?,
      requester_name: row.get(3)?,
      phone:          row.get(4)?,
      party_size:     row.get(5)?,
      day:            row.get(6)?,
      slot_label:     row.get(7)?,
      reserved_for:   row.get(8)?,
      created_at:     row.get(9)?,
    })
  }

  pub fn into_booking(self) -> Result<Booking> {
    let party_size = u32::try_from(self.party_size)
      .map_err(|_| Error::Decode(format!("party size {}", self.party_size)))?;

    Ok(Booking {
      booking_id: self.booking_id,
      table_id: self.table_id,
      requester_id: self.requester_id,
      requester_name: self.requester_name,
      phone: self.phone,
      party_size,
      day: decode_day(&self.day)?,
      slot_label: decode_slot(&self.slot_label)?,
      reserved_for: decode_instant(&self.reserved_for)?,
      created_at: decode_instant(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `tables` row.
pub struct RawTable {
  pub table_id: i64,
  pub area:     Option<String>,
}

impl RawTable {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { table_id: row.get(0)?, area: row.get(1)? })
  }

  pub fn into_table(self) -> Table {
    Table { table_id: self.table_id, area: self.area }
  }
}
