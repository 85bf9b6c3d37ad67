//! Handler for `GET /tables[?area=...]`.

use axum::{
  Json,
  extract::State,
};
use serde::{Deserialize, Serialize};
use tablebook_core::{clock::Clock, store::BookingStore, table::Table};

use crate::{
  AppState,
  error::ApiError,
  extract::ApiQuery,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub area: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
  pub status: &'static str,
  pub tables: Vec<Table>,
}

pub async fn list<S, C>(
  State(state): State<AppState<S, C>>,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<TablesResponse>, ApiError>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  let tables = state.reservations.list_tables(params.area).await?;
  Ok(Json(TablesResponse { status: "ok", tables }))
}
