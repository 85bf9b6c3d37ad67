//! [`Reservations`] — the booking engine.
//!
//! Stateless between calls: every operation reads the latest committed state
//! from the [`BookingStore`] and applies the [`BookingPolicy`]. The only
//! write paths are [`Reservations::create_booking`] and
//! [`Reservations::cancel_booking`].

use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
  Error, Result,
  booking::{Booking, BookingId, BookingRequest, CancelScope, NewBooking, RequesterId},
  calendar::Slot,
  clock::{Clock, SystemClock},
  policy::BookingPolicy,
  store::BookingStore,
  table::{Table, TableId},
};

/// Default number of rows returned by [`Reservations::list_bookings`].
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Upper bound on rows returned by [`Reservations::list_bookings`].
pub const MAX_HISTORY_LIMIT: usize = 500;

fn classify<E: Into<Error>>(err: E) -> Error { err.into() }

pub struct Reservations<S, C = SystemClock> {
  store:  Arc<S>,
  policy: BookingPolicy,
  clock:  C,
}

impl<S: BookingStore> Reservations<S> {
  pub fn new(store: Arc<S>, policy: BookingPolicy) -> Self {
    Self::with_clock(store, policy, SystemClock)
  }
}

impl<S: BookingStore, C: Clock> Reservations<S, C> {
  pub fn with_clock(store: Arc<S>, policy: BookingPolicy, clock: C) -> Self {
    Self { store, policy, clock }
  }

  pub fn policy(&self) -> &BookingPolicy { &self.policy }

  pub fn store(&self) -> &S { &self.store }

  // ── Tables ────────────────────────────────────────────────────────────

  pub async fn list_tables(&self, area: Option<String>) -> Result<Vec<Table>> {
    self.store.list_tables(area).await.map_err(classify)
  }

  // ── Availability ──────────────────────────────────────────────────────

  /// Calendar slots for `day` minus those already booked on `table_id` and
  /// minus those already past. An unknown table has no bookings, so it gets
  /// the full offerable calendar.
  pub async fn free_slots(&self, table_id: TableId, day: NaiveDate) -> Result<Vec<Slot>> {
    let open = self.policy.open_slots(day, self.clock.now());
    if open.is_empty() {
      return Ok(open);
    }

    let booked: BTreeSet<Slot> = self
      .store
      .booked_slots(table_id, day)
      .await
      .map_err(classify)?
      .into_iter()
      .collect();

    Ok(open.into_iter().filter(|s| !booked.contains(s)).collect())
  }

  /// Tables holding an active booking at exactly `(day, slot)`.
  pub async fn booked_tables(
    &self,
    day: NaiveDate,
    slot: Slot,
    area: Option<String>,
  ) -> Result<BTreeSet<TableId>> {
    self.ensure_on_calendar(slot)?;
    let reserved_for = self.policy.reserved_for(day, slot)?;
    if !self.policy.is_active(reserved_for, self.clock.now()) {
      return Ok(BTreeSet::new());
    }

    let tables = self
      .store
      .booked_tables(day, slot, area)
      .await
      .map_err(classify)?;
    Ok(tables.into_iter().collect())
  }

  // ── Booking ───────────────────────────────────────────────────────────

  /// Validate `request` and commit it as a new booking.
  ///
  /// Fails with [`Error::Validation`] for malformed or past requests and
  /// unknown tables, and with [`Error::Conflict`] if the table is already
  /// taken at that instant.
  pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking> {
    let input = self.validate(request)?;

    if self
      .store
      .get_table(input.table_id)
      .await
      .map_err(classify)?
      .is_none()
    {
      return Err(Error::validation(format!("unknown table {}", input.table_id)));
    }

    let table_id = input.table_id;
    let slot = input.slot_label;
    let booking = match self.store.insert_booking(input).await.map_err(classify) {
      Ok(booking) => booking,
      Err(err @ Error::Conflict { .. }) => {
        warn!(table_id, %slot, "booking conflict");
        return Err(err);
      }
      Err(err) => return Err(err),
    };

    info!(
      booking_id = booking.booking_id,
      table_id,
      day = %booking.day,
      %slot,
      requester_id = ?booking.requester_id,
      "booking created"
    );
    Ok(booking)
  }

  fn validate(&self, request: BookingRequest) -> Result<NewBooking> {
    let party_size = u32::try_from(request.party_size)
      .ok()
      .filter(|n| *n >= 1)
      .ok_or_else(|| {
        Error::validation(format!(
          "party size must be at least 1, got {}",
          request.party_size
        ))
      })?;

    let phone = request.phone.trim();
    if phone.is_empty() {
      return Err(Error::validation("phone is required"));
    }
    let requester_name = request.requester_name.trim();
    if requester_name.is_empty() {
      return Err(Error::validation("requester name is required"));
    }
    if request.table_id <= 0 {
      return Err(Error::validation(format!("invalid table id {}", request.table_id)));
    }

    self.ensure_on_calendar(request.slot_label)?;
    let reserved_for = self.policy.reserved_for(request.day, request.slot_label)?;
    if !self.policy.is_bookable(reserved_for, self.clock.now()) {
      warn!(day = %request.day, slot = %request.slot_label, "rejected booking in the past");
      return Err(Error::validation(format!(
        "{} {} is in the past",
        request.day, request.slot_label
      )));
    }

    Ok(NewBooking {
      table_id: request.table_id,
      requester_id: request.requester_id,
      requester_name: requester_name.to_owned(),
      phone: phone.to_owned(),
      party_size,
      day: request.day,
      slot_label: request.slot_label,
      reserved_for,
    })
  }

  fn ensure_on_calendar(&self, slot: Slot) -> Result<()> {
    let cal = &self.policy.calendar;
    if cal.contains(slot) {
      return Ok(());
    }
    Err(Error::validation(format!(
      "{slot} is not a bookable time ({}-{} every {} minutes)",
      cal.opening(),
      cal.closing(),
      cal.step_minutes()
    )))
  }

  // ── Cancellation ──────────────────────────────────────────────────────

  /// Remove a booking. Returns the removed row, or `None` if there was
  /// nothing to remove within `scope`; cancelling twice is not an error.
  pub async fn cancel_booking(
    &self,
    booking_id: BookingId,
    scope: CancelScope,
  ) -> Result<Option<Booking>> {
    let removed = self
      .store
      .delete_booking(booking_id, scope)
      .await
      .map_err(classify)?;

    match &removed {
      Some(b) => info!(
        booking_id,
        table_id = b.table_id,
        slot = %b.slot_label,
        ?scope,
        "booking cancelled"
      ),
      None => info!(booking_id, ?scope, "nothing to cancel"),
    }
    Ok(removed)
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  /// The requester's soonest booking that is still active.
  pub async fn active_booking_for(&self, requester_id: RequesterId) -> Result<Option<Booking>> {
    let since = self.policy.active_since(self.clock.now());
    self
      .store
      .next_booking_for(requester_id, since)
      .await
      .map_err(classify)
  }

  /// Administrative lookup of one booking.
  pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking> {
    self
      .store
      .get_booking(booking_id)
      .await
      .map_err(classify)?
      .ok_or(Error::NotFound(booking_id))
  }

  /// Booking history, most recently created first.
  pub async fn list_bookings(&self, limit: Option<usize>) -> Result<Vec<Booking>> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    self.store.list_bookings(limit).await.map_err(classify)
  }
}
