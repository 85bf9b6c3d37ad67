//! The `BookingStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `tablebook-store-sqlite`). The engine in [`crate::reservations`] depends on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  booking::{Booking, BookingId, CancelScope, NewBooking, RequesterId},
  calendar::Slot,
  table::{Table, TableId},
};

/// Abstraction over the durable relation of tables and bookings.
///
/// Implementations own the no-double-booking invariant: no two bookings may
/// share `(table_id, reserved_for)`, and [`BookingStore::insert_booking`] must
/// keep it under concurrent callers. Errors are classified into the engine's
/// taxonomy through the `Into<crate::Error>` bound.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait BookingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Tables ────────────────────────────────────────────────────────────

  /// Insert a table unless one with the same id exists. Returns `true` if a
  /// row was inserted.
  fn add_table(
    &self,
    table: Table,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_table(
    &self,
    table_id: TableId,
  ) -> impl Future<Output = Result<Option<Table>, Self::Error>> + Send + '_;

  /// List tables ordered by id, optionally restricted to one area.
  fn list_tables(
    &self,
    area: Option<String>,
  ) -> impl Future<Output = Result<Vec<Table>, Self::Error>> + Send + '_;

  // ── Bookings — writes ─────────────────────────────────────────────────

  /// Atomically check for a booking at `(table_id, reserved_for)` and insert
  /// `input` if there is none. A taken pair is reported as a conflict error,
  /// whether detected by the check or by the store's uniqueness constraint.
  fn insert_booking(
    &self,
    input: NewBooking,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Delete a booking within `scope`, returning the removed row, or `None` if
  /// nothing matched.
  fn delete_booking(
    &self,
    booking_id: BookingId,
    scope: CancelScope,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  // ── Bookings — reads ──────────────────────────────────────────────────

  fn get_booking(
    &self,
    booking_id: BookingId,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  /// Slot labels already booked for `table_id` on the local date `day`.
  fn booked_slots(
    &self,
    table_id: TableId,
    day: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Slot>, Self::Error>> + Send + '_;

  /// Ids of tables holding a booking at `(day, slot)`, optionally restricted
  /// to tables in `area`.
  fn booked_tables(
    &self,
    day: NaiveDate,
    slot: Slot,
    area: Option<String>,
  ) -> impl Future<Output = Result<Vec<TableId>, Self::Error>> + Send + '_;

  /// The requester's booking with the soonest `reserved_for` at or after
  /// `not_before`.
  fn next_booking_for(
    &self,
    requester_id: RequesterId,
    not_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  /// Most recently created bookings first.
  fn list_bookings(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;
}
