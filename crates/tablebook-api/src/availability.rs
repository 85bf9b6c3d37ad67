//! Handlers for `/availability` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/availability` | `?table=<id>&date=<YYYY-MM-DD>`; free start times |
//! | `GET`  | `/availability/tables` | `?date=&time=[&area=]`; tables already taken |
//!
//! Parameters are taken as optional strings so that missing or malformed
//! values come back as a 400 with the usual error body.

use axum::{
  Json,
  extract::State,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tablebook_core::{
  calendar::{Slot, parse_day},
  clock::Clock,
  store::BookingStore,
  table::TableId,
};

use crate::{
  AppState,
  error::ApiError,
  extract::ApiQuery,
};

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
  value
    .as_deref()
    .filter(|v| !v.trim().is_empty())
    .ok_or_else(|| ApiError::validation(format!("missing required parameter `{name}`")))
}

// ─── Free slots ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FreeSlotsParams {
  #[serde(alias = "table_id")]
  pub table: Option<String>,
  pub date:  Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FreeSlotsResponse {
  pub status:     &'static str,
  pub table_id:   TableId,
  pub date:       NaiveDate,
  pub free_times: Vec<Slot>,
}

/// `GET /availability?table=<id>&date=<YYYY-MM-DD>`
pub async fn free_slots<S, C>(
  State(state): State<AppState<S, C>>,
  ApiQuery(params): ApiQuery<FreeSlotsParams>,
) -> Result<Json<FreeSlotsResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let table_raw = required(&params.table, "table")?;
  let table_id: TableId = table_raw
    .trim()
    .parse()
    .map_err(|_| ApiError::validation(format!("invalid table id {table_raw:?}")))?;
  let date = parse_day(required(&params.date, "date")?)?;

  let free_times = state.reservations.free_slots(table_id, date).await?;
  Ok(Json(FreeSlotsResponse { status: "ok", table_id, date, free_times }))
}

// ─── Booked tables ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BookedTablesParams {
  pub date: Option<String>,
  #[serde(alias = "time_slot")]
  pub time: Option<String>,
  pub area: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookedTablesResponse {
  pub status:        &'static str,
  pub date:          NaiveDate,
  pub time:          Slot,
  pub booked_tables: Vec<TableId>,
}

/// `GET /availability/tables?date=<YYYY-MM-DD>&time=<HH:MM>[&area=...]`
pub async fn booked_tables<S, C>(
  State(state): State<AppState<S, C>>,
  ApiQuery(params): ApiQuery<BookedTablesParams>,
) -> Result<Json<BookedTablesResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let date = parse_day(required(&params.date, "date")?)?;
  let time: Slot = required(&params.time, "time")?.parse()?;

  let booked = state
    .reservations
    .booked_tables(date, time, params.area)
    .await?;
  Ok(Json(BookedTablesResponse {
    status: "ok",
    date,
    time,
    booked_tables: booked.into_iter().collect(),
  }))
}
