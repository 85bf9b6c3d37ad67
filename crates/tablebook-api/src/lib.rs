//! JSON REST API for tablebook.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tablebook_core::store::BookingStore`]. TLS and transport concerns are
//! the caller's responsibility; caller identity comes from the
//! `X-Requester-Id` header (see [`caller`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(tablebook_api::api_router(state))
//! ```

pub mod availability;
pub mod bookings;
pub mod caller;
pub mod error;
pub mod extract;
pub mod tables;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tablebook_core::{
  booking::RequesterId,
  clock::{Clock, SystemClock},
  reservations::Reservations,
  store::BookingStore,
};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, C = SystemClock> {
  pub reservations: Arc<Reservations<S, C>>,
  /// Requester id treated as the administrator, if any.
  pub admin_id:     Option<RequesterId>,
}

impl<S, C> AppState<S, C> {
  pub fn new(reservations: Reservations<S, C>, admin_id: Option<RequesterId>) -> Self {
    Self { reservations: Arc::new(reservations), admin_id }
  }
}

// Derived Clone would require `S: Clone` and `C: Clone`.
impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      reservations: Arc::clone(&self.reservations),
      admin_id:     self.admin_id,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(state: AppState<S, C>) -> Router<()>
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Tables
    .route("/tables", get(tables::list::<S, C>))
    // Availability
    .route("/availability", get(availability::free_slots::<S, C>))
    .route("/availability/tables", get(availability::booked_tables::<S, C>))
    // Bookings
    .route(
      "/bookings",
      get(bookings::history::<S, C>).post(bookings::create::<S, C>),
    )
    .route("/bookings/active", get(bookings::active::<S, C>))
    .route(
      "/bookings/{id}",
      get(bookings::get_one::<S, C>).delete(bookings::cancel::<S, C>),
    )
    .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Tests ────────────────────────────────────────────────────────────────────
