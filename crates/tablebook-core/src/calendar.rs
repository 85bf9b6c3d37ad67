//! Slot Calendar — the ordered set of bookable start times for a day.
//!
//! Everything here is pure: the caller supplies "now" in the restaurant's
//! local time, so results are fully determined by the arguments.

use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Slot ────────────────────────────────────────────────────────────────────

/// A bookable time of day, rendered as a canonical `HH:MM` label.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(NaiveTime);

impl Slot {
  pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
    NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
  }

  pub fn time(self) -> NaiveTime { self.0 }

  fn minute_of_day(self) -> u32 { self.0.hour() * 60 + self.0.minute() }

  fn from_minute_of_day(m: u32) -> Option<Self> { Self::from_hm(m / 60, m % 60) }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format("%H:%M"))
  }
}

impl FromStr for Slot {
  type Err = Error;

  /// Accepts `HH:MM` or `H:MM`.
  fn from_str(s: &str) -> Result<Self> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
      .map(Self)
      .map_err(|_| Error::validation(format!("invalid time {s:?}, expected HH:MM")))
  }
}

impl TryFrom<String> for Slot {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<Slot> for String {
  fn from(slot: Slot) -> Self { slot.to_string() }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
    .map_err(|_| Error::validation(format!("invalid date {s:?}, expected YYYY-MM-DD")))
}

// ─── Calendar ────────────────────────────────────────────────────────────────

/// Opening hours plus the step between consecutive start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCalendar {
  opening:      Slot,
  closing:      Slot,
  step_minutes: u32,
}

impl Default for SlotCalendar {
  /// 12:00 to 23:00 in 30-minute steps.
  fn default() -> Self {
    Self {
      opening:      Slot(NaiveTime::default() + Duration::hours(12)),
      closing:      Slot(NaiveTime::default() + Duration::hours(23)),
      step_minutes: 30,
    }
  }
}

impl SlotCalendar {
  pub fn new(opening: Slot, closing: Slot, step_minutes: u32) -> Result<Self> {
    if step_minutes == 0 {
      return Err(Error::validation("slot granularity must be at least one minute"));
    }
    if closing < opening {
      return Err(Error::validation(format!(
        "closing time {closing} is before opening time {opening}"
      )));
    }
    Ok(Self { opening, closing, step_minutes })
  }

  pub fn opening(&self) -> Slot { self.opening }

  pub fn closing(&self) -> Slot { self.closing }

  pub fn step_minutes(&self) -> u32 { self.step_minutes }

  /// Every label from opening to closing inclusive.
  pub fn slots(&self) -> Vec<Slot> {
    let end = self.closing.minute_of_day();
    (self.opening.minute_of_day()..=end)
      .step_by(self.step_minutes as usize)
      .filter_map(Slot::from_minute_of_day)
      .collect()
  }

  pub fn contains(&self, slot: Slot) -> bool {
    let m = slot.minute_of_day();
    let open = self.opening.minute_of_day();
    m >= open && slot <= self.closing && (m - open) % self.step_minutes == 0
  }

  /// The labels still offerable on `day` given the local time `now`.
  ///
  /// On `day == now.date()` a slot survives only if its start is strictly
  /// after `now + lead`. Earlier days yield nothing; later days yield the
  /// whole calendar.
  pub fn slots_for(
    &self,
    day: NaiveDate,
    now: NaiveDateTime,
    lead: Duration,
  ) -> Vec<Slot> {
    let today = now.date();
    if day < today {
      return Vec::new();
    }
    let all = self.slots();
    if day > today {
      return all;
    }
    let cutoff = now + lead;
    all.into_iter().filter(|s| day.and_time(s.0) > cutoff).collect()
  }
}
