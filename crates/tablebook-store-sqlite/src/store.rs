//! [`SqliteStore`] — the SQLite implementation of [`BookingStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
  },
  time::{Duration, Instant},
};

use chrono::{DateTime, NaiveDate, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, ffi};
use tracing::debug;

use tablebook_core::{
  booking::{Booking, BookingId, CancelScope, NewBooking, RequesterId},
  calendar::Slot,
  store::BookingStore,
  table::{Table, TableId},
};

use crate::{
  Error, Result,
  encode::{
    BOOKING_COLUMNS, RawBooking, RawTable, decode_slot, encode_created_at, encode_day,
    encode_instant,
  },
  schema::SCHEMA,
};

/// Bound applied to every store call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// Lifecycle of one queued call; see [`SqliteStore::call`].
const PENDING: u8 = 0;
const STARTED: u8 = 1;
const ABANDONED: u8 = 2;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A booking store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Separate
/// `open` calls on the same file get separate connections; they coordinate
/// through SQLite's write lock.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  timeout: Duration,
}

/// Result of the check-then-insert transaction.
enum InsertOutcome {
  Inserted(BookingId),
  Taken,
  UnknownTable,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_TIMEOUT).await
  }

  /// Like [`SqliteStore::open`], bounding every call (and lock wait) by
  /// `timeout`.
  pub async fn open_with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, timeout };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread within the configured timeout.
  ///
  /// A call still queued when the timeout fires is abandoned and never runs,
  /// so [`Error::Timeout`] always means nothing was written. A call that has
  /// already started is waited for; its lock waits are bounded by the time
  /// left before the deadline.
  pub(crate) async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let deadline = Instant::now() + self.timeout;
    let state = Arc::new(AtomicU8::new(PENDING));
    let claim = Arc::clone(&state);

    let job = self.conn.call(move |conn| {
      if claim
        .compare_exchange(PENDING, STARTED, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
      {
        return Ok(None);
      }
      let remaining = deadline.saturating_duration_since(Instant::now());
      conn.busy_timeout(remaining.max(Duration::from_millis(1)))?;
      f(conn).map(Some)
    });
    tokio::pin!(job);

    let outcome = match tokio::time::timeout(self.timeout, &mut job).await {
      Ok(res) => res?,
      Err(_) => {
        if state
          .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
          .is_ok()
        {
          return Err(Error::Timeout(self.timeout));
        }
        debug!(timeout = ?self.timeout, "store call overran; waiting for it to finish");
        job.await?
      }
    };
    outcome.ok_or(Error::Timeout(self.timeout))
  }
}

/// The extended result code of a constraint violation, if `err` is one.
fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
  match err {
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Some(e.extended_code)
    }
    _ => None,
  }
}

// ─── BookingStore impl ───────────────────────────────────────────────────────

impl BookingStore for SqliteStore {
  type Error = Error;

  // ── Tables ────────────────────────────────────────────────────────────────

  async fn add_table(&self, table: Table) -> Result<bool> {
    let inserted = self
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO tables (table_id, area) VALUES (?1, ?2)
           ON CONFLICT (table_id) DO NOTHING",
          rusqlite::params![table.table_id, table.area],
        )?;
        Ok(n == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn get_table(&self, table_id: TableId) -> Result<Option<Table>> {
    let raw: Option<RawTable> = self
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT table_id, area FROM tables WHERE table_id = ?1",
            rusqlite::params![table_id],
            RawTable::from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(raw.map(RawTable::into_table))
  }

  async fn list_tables(&self, area: Option<String>) -> Result<Vec<Table>> {
    let raws: Vec<RawTable> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT table_id, area FROM tables
           WHERE ?1 IS NULL OR area = ?1
           ORDER BY table_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![area], RawTable::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws.into_iter().map(RawTable::into_table).collect())
  }

  // ── Bookings — writes ─────────────────────────────────────────────────────

  async fn insert_booking(&self, input: NewBooking) -> Result<Booking> {
    // Truncated to what the column keeps, so the returned row equals a re-read.
    let created_at       = Utc::now().trunc_subsecs(6);
    let table_id         = input.table_id;
    let reserved_for     = input.reserved_for;
    let reserved_for_str = encode_instant(reserved_for);
    let created_at_str   = encode_created_at(created_at);
    let day_str          = encode_day(input.day);
    let slot_str         = input.slot_label.to_string();
    let requester_id     = input.requester_id;
    let requester_name   = input.requester_name.clone();
    let phone            = input.phone.clone();
    let party_size       = i64::from(input.party_size);

    // BEGIN IMMEDIATE takes the write lock up front, so a second writer on
    // another connection waits here instead of passing the check alongside
    // us. The UNIQUE constraint still backs the check.
    let outcome = self
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken: Option<BookingId> = tx
          .query_row(
            "SELECT booking_id FROM bookings WHERE table_id = ?1 AND reserved_for = ?2",
            rusqlite::params![table_id, reserved_for_str],
            |r| r.get(0),
          )
          .optional()?;
        if taken.is_some() {
          return Ok(InsertOutcome::Taken);
        }

        let inserted = tx.execute(
          "INSERT INTO bookings (
             table_id, requester_id, requester_name, phone, party_size,
             day, slot_label, reserved_for, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            table_id,
            requester_id,
            requester_name,
            phone,
            party_size,
            day_str,
            slot_str,
            reserved_for_str,
            created_at_str,
          ],
        );
        match inserted {
          Ok(_) => {}
          Err(e) => match constraint_code(&e) {
            Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => return Ok(InsertOutcome::Taken),
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
              return Ok(InsertOutcome::UnknownTable);
            }
            _ => return Err(e.into()),
          },
        }

        let booking_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(InsertOutcome::Inserted(booking_id))
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted(booking_id) => {
        debug!(booking_id, table_id, "inserted booking row");
        Ok(Booking {
          booking_id,
          table_id,
          requester_id: input.requester_id,
          requester_name: input.requester_name,
          phone: input.phone,
          party_size: input.party_size,
          day: input.day,
          slot_label: input.slot_label,
          reserved_for,
          created_at,
        })
      }
      InsertOutcome::Taken => Err(Error::Conflict { table_id, reserved_for }),
      InsertOutcome::UnknownTable => Err(Error::UnknownTable(table_id)),
    }
  }

  async fn delete_booking(
    &self,
    booking_id: BookingId,
    scope:      CancelScope,
  ) -> Result<Option<Booking>> {
    let owner = match scope {
      CancelScope::Owner(requester_id) => Some(requester_id),
      CancelScope::Admin => None,
    };

    let raw: Option<RawBooking> = self
      .call(move |conn| {
        let sql = format!(
          "DELETE FROM bookings
           WHERE booking_id = ?1 AND (?2 IS NULL OR requester_id = ?2)
           RETURNING {BOOKING_COLUMNS}"
        );
        Ok(conn
          .query_row(&sql, rusqlite::params![booking_id, owner], RawBooking::from_row)
          .optional()?)
      })
      .await?;

    debug!(booking_id, deleted = raw.is_some(), "delete booking");
    raw.map(RawBooking::into_booking).transpose()
  }

  // ── Bookings — reads ──────────────────────────────────────────────────────

  async fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
    let raw: Option<RawBooking> = self
      .call(move |conn| {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = ?1");
        Ok(conn
          .query_row(&sql, rusqlite::params![booking_id], RawBooking::from_row)
          .optional()?)
      })
      .await?;
    raw.map(RawBooking::into_booking).transpose()
  }

  async fn booked_slots(&self, table_id: TableId, day: NaiveDate) -> Result<Vec<Slot>> {
    let day_str = encode_day(day);

    let labels: Vec<String> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT slot_label FROM bookings
           WHERE table_id = ?1 AND day = ?2
           ORDER BY slot_label",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![table_id, day_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    labels.iter().map(|s| decode_slot(s)).collect()
  }

  async fn booked_tables(
    &self,
    day:  NaiveDate,
    slot: Slot,
    area: Option<String>,
  ) -> Result<Vec<TableId>> {
    let day_str  = encode_day(day);
    let slot_str = slot.to_string();

    let ids = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT b.table_id
           FROM bookings b
           JOIN tables t ON t.table_id = b.table_id
           WHERE b.day = ?1 AND b.slot_label = ?2
             AND (?3 IS NULL OR t.area = ?3)
           ORDER BY b.table_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![day_str, slot_str, area], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<TableId>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn next_booking_for(
    &self,
    requester_id: RequesterId,
    not_before:   DateTime<Utc>,
  ) -> Result<Option<Booking>> {
    let not_before_str = encode_instant(not_before);

    let raw: Option<RawBooking> = self
      .call(move |conn| {
        let sql = format!(
          "SELECT {BOOKING_COLUMNS} FROM bookings
           WHERE requester_id = ?1 AND reserved_for >= ?2
           ORDER BY reserved_for ASC, booking_id ASC
           LIMIT 1"
        );
        Ok(conn
          .query_row(
            &sql,
            rusqlite::params![requester_id, not_before_str],
            RawBooking::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawBooking::into_booking).transpose()
  }

  async fn list_bookings(&self, limit: usize) -> Result<Vec<Booking>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawBooking> = self
      .call(move |conn| {
        let sql = format!(
          "SELECT {BOOKING_COLUMNS} FROM bookings
           ORDER BY created_at DESC, booking_id DESC
           LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawBooking::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }
}
