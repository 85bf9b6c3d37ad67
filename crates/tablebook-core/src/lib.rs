//! Core types and the booking engine for the tablebook reservation service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend is reached through the [`store::BookingStore`] trait; the
//! rules that decide whether a (table, date, time) request becomes a booking
//! live in [`reservations::Reservations`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod booking;
pub mod calendar;
pub mod clock;
pub mod error;
pub mod policy;
pub mod reservations;
pub mod store;
pub mod table;

pub use error::{Error, Result};
