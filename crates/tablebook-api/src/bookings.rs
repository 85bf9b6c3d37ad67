//! Handlers for `/bookings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/bookings` | Body: [`CreateBookingBody`]; 201, 409 on conflict, 400 on bad input |
//! | `DELETE` | `/bookings/{id}` | Owner- or admin-scoped; `deleted` is false if nothing matched |
//! | `GET`    | `/bookings/active` | The caller's active booking, or `null` |
//! | `GET`    | `/bookings` | Admin only; newest first, `?limit=` |
//! | `GET`    | `/bookings/{id}` | Admin or owner; 404 otherwise |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tablebook_core::{
  Error as CoreError,
  booking::{Booking, BookingId, BookingRequest, RequesterId},
  calendar::{Slot, parse_day},
  clock::Clock,
  store::BookingStore,
  table::TableId,
};

use crate::{
  AppState,
  caller::Caller,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, lenient_i64},
};

/// Name recorded when a booking arrives without one.
pub const UNKNOWN_REQUESTER_NAME: &str = "Unknown";

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /bookings`.
///
/// Every field is optional at the parsing stage so a missing one is reported
/// as a validation error. The aliases cover the field names older web
/// clients send, and the integer fields also accept numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBookingBody {
  #[serde(alias = "user_id", default, deserialize_with = "lenient_i64")]
  pub requester_id:   Option<RequesterId>,
  #[serde(alias = "user_name")]
  pub requester_name: Option<String>,
  #[serde(alias = "table", default, deserialize_with = "lenient_i64")]
  pub table_id:       Option<TableId>,
  pub date:           Option<String>,
  #[serde(alias = "time_slot")]
  pub time:           Option<String>,
  #[serde(alias = "guests", default, deserialize_with = "lenient_i64")]
  pub party_size:     Option<i64>,
  pub phone:          Option<String>,
}

impl TryFrom<CreateBookingBody> for BookingRequest {
  type Error = CoreError;

  fn try_from(b: CreateBookingBody) -> Result<Self, Self::Error> {
    fn missing(name: &str) -> CoreError {
      CoreError::validation(format!("missing required field `{name}`"))
    }

    let day = parse_day(b.date.as_deref().ok_or_else(|| missing("date"))?)?;
    let slot_label: Slot = b.time.as_deref().ok_or_else(|| missing("time"))?.parse()?;
    let requester_name = b
      .requester_name
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| UNKNOWN_REQUESTER_NAME.to_owned());

    Ok(BookingRequest {
      table_id: b.table_id.ok_or_else(|| missing("table_id"))?,
      day,
      slot_label,
      // Legacy clients send 0 for "no identity".
      requester_id: b.requester_id.filter(|id| *id != 0),
      requester_name,
      phone: b.phone.ok_or_else(|| missing("phone"))?,
      party_size: b.party_size.ok_or_else(|| missing("party_size"))?,
    })
  }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
  pub status:     &'static str,
  pub booking_id: BookingId,
  pub booking:    Booking,
}

/// `POST /bookings` — returns 201 + the new booking id.
pub async fn create<S, C>(
  State(state): State<AppState<S, C>>,
  ApiJson(body): ApiJson<CreateBookingBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let request = BookingRequest::try_from(body)?;
  let booking = state.reservations.create_booking(request).await?;
  Ok((
    StatusCode::CREATED,
    Json(CreatedResponse { status: "ok", booking_id: booking.booking_id, booking }),
  ))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CancelResponse {
  pub status:  &'static str,
  pub deleted: bool,
  /// The removed row, so the caller can notify its owner.
  pub booking: Option<Booking>,
}

/// `DELETE /bookings/{id}`
pub async fn cancel<S, C>(
  State(state): State<AppState<S, C>>,
  caller: Caller,
  ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<CancelResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let removed = state
    .reservations
    .cancel_booking(booking_id, caller.cancel_scope())
    .await?;
  Ok(Json(CancelResponse {
    status:  "ok",
    deleted: removed.is_some(),
    booking: removed,
  }))
}

// ─── Lookups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BookingResponse {
  pub status:  &'static str,
  pub booking: Option<Booking>,
}

/// `GET /bookings/active` — the caller's current booking.
pub async fn active<S, C>(
  State(state): State<AppState<S, C>>,
  caller: Caller,
) -> Result<Json<BookingResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let booking = state
    .reservations
    .active_booking_for(caller.requester_id)
    .await?;
  Ok(Json(BookingResponse { status: "ok", booking }))
}

/// `GET /bookings/{id}` — visible to the administrator and the owner.
pub async fn get_one<S, C>(
  State(state): State<AppState<S, C>>,
  caller: Caller,
  ApiPath(booking_id): ApiPath<BookingId>,
) -> Result<Json<BookingResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let booking = state.reservations.get_booking(booking_id).await?;
  if !caller.is_admin && booking.requester_id != Some(caller.requester_id) {
    return Err(CoreError::NotFound(booking_id).into());
  }
  Ok(Json(BookingResponse { status: "ok", booking: Some(booking) }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
  pub status:   &'static str,
  pub bookings: Vec<Booking>,
}

/// `GET /bookings[?limit=N]` — administrator only.
pub async fn history<S, C>(
  State(state): State<AppState<S, C>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  caller.require_admin()?;
  let bookings = state.reservations.list_bookings(params.limit).await?;
  Ok(Json(HistoryResponse { status: "ok", bookings }))
}
