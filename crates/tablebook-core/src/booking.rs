//! Booking — one reservation of one table for one instant by one requester.
//!
//! Bookings are never updated in place. A change of mind is a cancellation
//! followed by a new booking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{calendar::Slot, table::TableId};

/// Surrogate key assigned by the store; monotonically increasing.
pub type BookingId = i64;

/// Opaque external identity of a guest (e.g. a messenger user id).
pub type RequesterId = i64;

// ─── Booking ─────────────────────────────────────────────────────────────────

/// A persisted reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id:     BookingId,
  pub table_id:       TableId,
  /// `None` only for administrative direct entries.
  pub requester_id:   Option<RequesterId>,
  pub requester_name: String,
  pub phone:          String,
  pub party_size:     u32,
  /// Restaurant-local date the booking falls on.
  pub day:            NaiveDate,
  pub slot_label:     Slot,
  /// `day` + `slot_label` in the restaurant zone, as a UTC instant. All
  /// conflict and activity checks key on this field.
  pub reserved_for:   DateTime<Utc>,
  /// Server-assigned; used for history ordering only.
  pub created_at:     DateTime<Utc>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Caller input to [`crate::reservations::Reservations::create_booking`].
#[derive(Debug, Clone)]
pub struct BookingRequest {
  pub table_id:       TableId,
  pub day:            NaiveDate,
  pub slot_label:     Slot,
  pub requester_id:   Option<RequesterId>,
  pub requester_name: String,
  pub phone:          String,
  /// Signed so that zero and negative sizes can be reported, not truncated.
  pub party_size:     i64,
}

/// A validated booking handed to [`crate::store::BookingStore::insert_booking`].
/// `booking_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
  pub table_id:       TableId,
  pub requester_id:   Option<RequesterId>,
  pub requester_name: String,
  pub phone:          String,
  pub party_size:     u32,
  pub day:            NaiveDate,
  pub slot_label:     Slot,
  pub reserved_for:   DateTime<Utc>,
}

/// Who is cancelling, which decides how the delete is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelScope {
  /// Only a booking owned by this requester may be removed.
  Owner(RequesterId),
  /// Any booking may be removed.
  Admin,
}
