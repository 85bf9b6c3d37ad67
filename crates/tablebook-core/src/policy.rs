//! Restaurant-wide booking rules: opening hours, the fixed timezone all
//! instants are interpreted in, and the two time windows.

use chrono::{
  DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone,
  Utc,
};

use crate::{
  Error, Result,
  calendar::{Slot, SlotCalendar},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
  pub calendar:     SlotCalendar,
  /// The restaurant's fixed zone. Dates and slot labels are local to it;
  /// stored instants are UTC.
  pub timezone:     FixedOffset,
  /// How far ahead of a slot's start it stops being offered today.
  pub lead:         Duration,
  /// How long after its start a booking still counts as active.
  pub active_grace: Duration,
}

impl Default for BookingPolicy {
  fn default() -> Self {
    Self {
      calendar:     SlotCalendar::default(),
      timezone:     Utc.fix(),
      lead:         Duration::zero(),
      active_grace: Duration::minutes(90),
    }
  }
}

impl BookingPolicy {
  /// `now` expressed as restaurant wall-clock time.
  pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&self.timezone).naive_local()
  }

  pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
    self.local_now(now).date()
  }

  /// Combine a local date and slot into the absolute instant it denotes.
  pub fn reserved_for(&self, day: NaiveDate, slot: Slot) -> Result<DateTime<Utc>> {
    self
      .timezone
      .from_local_datetime(&day.and_time(slot.time()))
      .single()
      .map(|dt| dt.with_timezone(&Utc))
      .ok_or_else(|| Error::validation(format!("{day} {slot} is not a valid local time")))
  }

  /// Slots still offerable on `day`, before subtracting existing bookings.
  pub fn open_slots(&self, day: NaiveDate, now: DateTime<Utc>) -> Vec<Slot> {
    self.calendar.slots_for(day, self.local_now(now), self.lead)
  }

  /// Bookings starting at or after this instant are active.
  pub fn active_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now - self.active_grace
  }

  pub fn is_active(&self, reserved_for: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    reserved_for >= self.active_since(now)
  }

  /// Whether a booking may still be made for `reserved_for`.
  pub fn is_bookable(&self, reserved_for: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    reserved_for > now + self.lead
  }
}
