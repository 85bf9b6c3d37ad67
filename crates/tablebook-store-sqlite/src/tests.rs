//! Integration tests for `SqliteStore` and the booking engine running on it.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use chrono::{DateTime, NaiveDate, Utc};
use tablebook_core::{
  Error as CoreError,
  booking::{BookingRequest, CancelScope, NewBooking},
  calendar::Slot,
  clock::FixedClock,
  policy::BookingPolicy,
  reservations::Reservations,
  store::BookingStore,
  table::Table,
};
use tokio::task::JoinSet;

use crate::SqliteStore;

type Engine = Reservations<SqliteStore, FixedClock>;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// Tables 1..=6 in the main hall, 7..=10 on the terrace.
async fn seed(s: &SqliteStore) {
  for table_id in 1..=10 {
    let area = if table_id <= 6 { "Main hall" } else { "Terrace" };
    s.add_table(Table { table_id, area: Some(area.into()) })
      .await
      .unwrap();
  }
}

fn instant(s: &str) -> DateTime<Utc> { s.parse().unwrap() }

fn day(s: &str) -> NaiveDate { s.parse().unwrap() }

fn slot(s: &str) -> Slot { s.parse().unwrap() }

async fn engine_at(now: &str) -> Engine {
  let s = store().await;
  seed(&s).await;
  Reservations::with_clock(Arc::new(s), BookingPolicy::default(), FixedClock(instant(now)))
}

fn request(table_id: i64, on: &str, at: &str, requester_id: i64) -> BookingRequest {
  BookingRequest {
    table_id,
    day: day(on),
    slot_label: slot(at),
    requester_id: Some(requester_id),
    requester_name: "Alex".into(),
    phone: "+15550100".into(),
    party_size: 2,
  }
}

fn labels(slots: &[Slot]) -> Vec<String> { slots.iter().map(ToString::to_string).collect() }

// ─── Tables ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_table_is_idempotent() {
  let s = store().await;
  let t = Table { table_id: 1, area: None };
  assert!(s.add_table(t.clone()).await.unwrap());
  assert!(!s.add_table(t).await.unwrap());
  assert_eq!(s.list_tables(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_tables_filters_by_area() {
  let s = store().await;
  seed(&s).await;

  let all = s.list_tables(None).await.unwrap();
  assert_eq!(all.len(), 10);
  assert_eq!(all[0].table_id, 1);

  let terrace = s.list_tables(Some("Terrace".into())).await.unwrap();
  let ids: Vec<_> = terrace.iter().map(|t| t.table_id).collect();
  assert_eq!(ids, [7, 8, 9, 10]);
}

#[tokio::test]
async fn get_table_missing_returns_none() {
  let s = store().await;
  assert!(s.get_table(42).await.unwrap().is_none());
}

// ─── Round trip ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn book_lookup_cancel_round_trip() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let d = day("2025-06-01");

  let booking = e
    .create_booking(BookingRequest {
      table_id: 3,
      day: d,
      slot_label: slot("19:30"),
      requester_id: Some(42),
      requester_name: "Alex".into(),
      phone: "+1 555 0100".into(),
      party_size: 2,
    })
    .await
    .unwrap();
  assert_eq!(booking.table_id, 3);
  assert_eq!(booking.reserved_for, instant("2025-06-01T19:30:00Z"));

  let free = e.free_slots(3, d).await.unwrap();
  assert!(!free.contains(&slot("19:30")));

  let active = e.active_booking_for(42).await.unwrap().unwrap();
  assert_eq!(active.booking_id, booking.booking_id);

  let removed = e
    .cancel_booking(booking.booking_id, CancelScope::Owner(42))
    .await
    .unwrap();
  assert!(removed.is_some());

  let free = e.free_slots(3, d).await.unwrap();
  assert!(free.contains(&slot("19:30")));
}

#[tokio::test]
async fn booking_ids_are_monotonic_after_deletes() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let a = e.create_booking(request(1, "2025-06-01", "19:00", 1)).await.unwrap();
  e.cancel_booking(a.booking_id, CancelScope::Admin).await.unwrap();
  let b = e.create_booking(request(1, "2025-06-01", "19:00", 1)).await.unwrap();
  assert!(b.booking_id > a.booking_id);
}

#[tokio::test]
async fn stored_booking_reads_back_identically() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let created = e.create_booking(request(4, "2025-06-01", "21:00", 7)).await.unwrap();
  let fetched = e.get_booking(created.booking_id).await.unwrap();
  assert_eq!(fetched.table_id, 4);
  assert_eq!(fetched.slot_label, slot("21:00"));
  assert_eq!(fetched.requester_id, Some(7));
  assert_eq!(fetched.party_size, 2);
  assert_eq!(fetched.reserved_for, created.reserved_for);
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn back_to_back_same_slot_conflicts() {
  let e = engine_at("2025-05-31T12:00:00Z").await;

  let first = e.create_booking(request(5, "2025-06-01", "20:00", 1)).await;
  let second = e.create_booking(request(5, "2025-06-01", "20:00", 2)).await;

  assert!(first.is_ok());
  assert!(matches!(
    second,
    Err(CoreError::Conflict { table_id: 5, .. })
  ));
}

#[tokio::test]
async fn same_slot_on_other_table_is_fine() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  e.create_booking(request(5, "2025-06-01", "20:00", 1)).await.unwrap();
  e.create_booking(request(6, "2025-06-01", "20:00", 2)).await.unwrap();
  e.create_booking(request(5, "2025-06-02", "20:00", 3)).await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_for_one_slot_admit_exactly_one() {
  let e = Arc::new(engine_at("2025-05-31T12:00:00Z").await);

  let mut set = JoinSet::new();
  for requester in 1..=16 {
    let e = Arc::clone(&e);
    set.spawn(async move { e.create_booking(request(5, "2025-06-01", "20:00", requester)).await });
  }

  let (mut ok, mut conflicts) = (0, 0);
  while let Some(res) = set.join_next().await {
    match res.unwrap() {
      Ok(_) => ok += 1,
      Err(CoreError::Conflict { .. }) => conflicts += 1,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }
  assert_eq!(ok, 1);
  assert_eq!(conflicts, 15);
}

fn temp_db(tag: &str) -> PathBuf {
  std::env::temp_dir().join(format!(
    "tablebook-{tag}-{}-{}.db",
    std::process::id(),
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
  ))
}

fn remove_db(path: &Path) {
  for suffix in ["", "-wal", "-shm"] {
    let mut p = path.to_path_buf().into_os_string();
    p.push(suffix);
    let _ = std::fs::remove_file(p);
  }
}

#[tokio::test]
async fn separate_connections_cannot_double_book() {
  let path = temp_db("race");

  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();
  seed(&a).await;

  let clock = FixedClock(instant("2025-05-31T12:00:00Z"));
  let engines = [
    Arc::new(Reservations::with_clock(Arc::new(a), BookingPolicy::default(), clock)),
    Arc::new(Reservations::with_clock(Arc::new(b), BookingPolicy::default(), clock)),
  ];

  let mut set = JoinSet::new();
  for requester in 0..8 {
    let e = Arc::clone(&engines[requester as usize % 2]);
    set.spawn(async move { e.create_booking(request(2, "2025-06-01", "19:00", requester)).await });
  }

  let mut ok = 0;
  while let Some(res) = set.join_next().await {
    match res.unwrap() {
      Ok(_) => ok += 1,
      Err(err) => assert!(matches!(err, CoreError::Conflict { .. }), "{err}"),
    }
  }
  assert_eq!(ok, 1);

  drop(engines);
  remove_db(&path);
}

#[tokio::test]
async fn timed_out_insert_is_never_committed() {
  let path = temp_db("timeout");
  let s = SqliteStore::open_with_timeout(&path, Duration::from_millis(100))
    .await
    .unwrap();
  seed(&s).await;

  // Hold the connection thread well past the timeout.
  let busy = s.clone();
  let slow = tokio::spawn(async move {
    busy
      .call(|_| {
        std::thread::sleep(Duration::from_millis(400));
        Ok(())
      })
      .await
  });
  tokio::time::sleep(Duration::from_millis(20)).await;

  let reserved_for = instant("2025-06-01T20:00:00Z");
  let input = NewBooking {
    table_id: 5,
    requester_id: Some(42),
    requester_name: "Alex".into(),
    phone: "+15550100".into(),
    party_size: 2,
    day: day("2025-06-01"),
    slot_label: slot("20:00"),
    reserved_for,
  };

  let err = s.insert_booking(input.clone()).await.unwrap_err();
  assert!(matches!(err, crate::Error::Timeout(_)), "{err}");
  assert!(CoreError::from(err).is_retryable());

  // A call that had already started is waited for, not abandoned.
  slow.await.unwrap().unwrap();

  assert!(s.booked_slots(5, day("2025-06-01")).await.unwrap().is_empty());

  // The retry the error invites goes through.
  let booking = s.insert_booking(input).await.unwrap();
  assert_eq!(booking.reserved_for, reserved_for);

  drop(s);
  remove_db(&path);
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejects_invalid_requests() {
  let e = engine_at("2025-05-31T12:00:00Z").await;

  let mut r = request(1, "2025-06-01", "19:00", 1);
  r.party_size = 0;
  assert!(matches!(e.create_booking(r).await, Err(CoreError::Validation(_))));

  let mut r = request(1, "2025-06-01", "19:00", 1);
  r.phone = "   ".into();
  assert!(matches!(e.create_booking(r).await, Err(CoreError::Validation(_))));

  let mut r = request(1, "2025-06-01", "19:00", 1);
  r.requester_name = String::new();
  assert!(matches!(e.create_booking(r).await, Err(CoreError::Validation(_))));

  // Off-calendar times.
  let r = request(1, "2025-06-01", "19:15", 1);
  assert!(matches!(e.create_booking(r).await, Err(CoreError::Validation(_))));
  let r = request(1, "2025-06-01", "09:00", 1);
  assert!(matches!(e.create_booking(r).await, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn rejects_unknown_table() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let err = e
    .create_booking(request(99, "2025-06-01", "19:00", 1))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)), "{err}");
}

#[tokio::test]
async fn rejects_past_instants() {
  let e = engine_at("2025-06-01T20:05:00Z").await;

  let err = e
    .create_booking(request(1, "2025-06-01", "20:00", 1))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));

  let err = e
    .create_booking(request(1, "2025-05-30", "20:00", 1))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));

  e.create_booking(request(1, "2025-06-01", "20:30", 1)).await.unwrap();
}

#[tokio::test]
async fn trims_name_and_phone() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let mut r = request(1, "2025-06-01", "19:00", 1);
  r.requester_name = "  Alex ".into();
  r.phone = " +15550100 ".into();
  let b = e.create_booking(r).await.unwrap();
  assert_eq!(b.requester_name, "Alex");
  assert_eq!(b.phone, "+15550100");
}

// ─── Availability ────────────────────────────────────────────────────────────

#[tokio::test]
async fn free_slots_complement_booked_labels() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let d = day("2025-06-01");
  for (at, who) in [("12:00", 1), ("19:30", 2), ("23:00", 3)] {
    e.create_booking(request(3, "2025-06-01", at, who)).await.unwrap();
  }

  let free = e.free_slots(3, d).await.unwrap();
  let booked = e.store().booked_slots(3, d).await.unwrap();
  let calendar = e.policy().calendar.slots();

  assert_eq!(labels(&booked), ["12:00", "19:30", "23:00"]);
  assert!(free.iter().all(|s| !booked.contains(s)));
  let mut union: Vec<Slot> = free.iter().chain(booked.iter()).copied().collect();
  union.sort();
  assert_eq!(union, calendar);
}

#[tokio::test]
async fn free_slots_today_skip_started_slots() {
  let e = engine_at("2025-06-01T20:05:00Z").await;
  let free = e.free_slots(1, day("2025-06-01")).await.unwrap();
  assert!(!free.contains(&slot("20:00")));
  assert!(free.contains(&slot("20:30")));
}

#[tokio::test]
async fn free_slots_respect_the_restaurant_zone() {
  let s = store().await;
  seed(&s).await;
  let policy = BookingPolicy {
    timezone: chrono::FixedOffset::east_opt(3 * 3600).unwrap(),
    ..BookingPolicy::default()
  };
  // 17:05 UTC is 20:05 in the restaurant.
  let e = Reservations::with_clock(Arc::new(s), policy, FixedClock(instant("2025-06-01T17:05:00Z")));

  let free = e.free_slots(1, day("2025-06-01")).await.unwrap();
  assert_eq!(free.first().unwrap().to_string(), "20:30");

  let b = e.create_booking(request(1, "2025-06-01", "21:00", 1)).await.unwrap();
  assert_eq!(b.reserved_for, instant("2025-06-01T18:00:00Z"));
  assert_eq!(b.day, day("2025-06-01"));
}

#[tokio::test]
async fn free_slots_for_unknown_table_are_the_whole_calendar() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let free = e.free_slots(404, day("2025-06-01")).await.unwrap();
  assert_eq!(free, e.policy().calendar.slots());
}

#[tokio::test]
async fn booked_tables_lists_taken_tables_by_area() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  for (table, who) in [(2, 1), (4, 2), (8, 3)] {
    e.create_booking(request(table, "2025-06-01", "20:00", who)).await.unwrap();
  }
  e.create_booking(request(1, "2025-06-01", "20:30", 4)).await.unwrap();

  let all = e.booked_tables(day("2025-06-01"), slot("20:00"), None).await.unwrap();
  assert_eq!(all.into_iter().collect::<Vec<_>>(), [2, 4, 8]);

  let terrace = e
    .booked_tables(day("2025-06-01"), slot("20:00"), Some("Terrace".into()))
    .await
    .unwrap();
  assert_eq!(terrace.into_iter().collect::<Vec<_>>(), [8]);

  let err = e.booked_tables(day("2025-06-01"), slot("20:10"), None).await.unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelling_twice_is_true_then_false() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let b = e.create_booking(request(1, "2025-06-01", "19:00", 1)).await.unwrap();

  assert!(e.cancel_booking(b.booking_id, CancelScope::Owner(1)).await.unwrap().is_some());
  assert!(e.cancel_booking(b.booking_id, CancelScope::Owner(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn owners_cannot_cancel_foreign_bookings() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let b = e.create_booking(request(1, "2025-06-01", "19:00", 1)).await.unwrap();

  let removed = e.cancel_booking(b.booking_id, CancelScope::Owner(2)).await.unwrap();
  assert!(removed.is_none());
  assert!(e.store().get_booking(b.booking_id).await.unwrap().is_some());
}

#[tokio::test]
async fn admin_cancel_returns_prior_contents() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let b = e.create_booking(request(6, "2025-06-01", "22:30", 77)).await.unwrap();

  let removed = e
    .cancel_booking(b.booking_id, CancelScope::Admin)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(removed, b);
  assert!(e.store().get_booking(b.booking_id).await.unwrap().is_none());
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn active_booking_is_the_soonest_still_active() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  e.create_booking(request(1, "2025-06-02", "19:00", 42)).await.unwrap();
  let soon = e.create_booking(request(2, "2025-06-01", "13:00", 42)).await.unwrap();
  e.create_booking(request(3, "2025-06-01", "12:00", 43)).await.unwrap();

  let active = e.active_booking_for(42).await.unwrap().unwrap();
  assert_eq!(active.booking_id, soon.booking_id);
  assert!(e.active_booking_for(1000).await.unwrap().is_none());
}

#[tokio::test]
async fn active_booking_honours_the_grace_window() {
  let s = Arc::new(store().await);
  seed(&s).await;
  let policy = BookingPolicy::default();

  let booking_clock = FixedClock(instant("2025-06-01T12:00:00Z"));
  Reservations::with_clock(Arc::clone(&s), policy, booking_clock)
    .create_booking(request(1, "2025-06-01", "19:00", 42))
    .await
    .unwrap();

  // Party still dining 80 minutes in.
  let during = Reservations::with_clock(Arc::clone(&s), policy, FixedClock(instant("2025-06-01T20:20:00Z")));
  assert!(during.active_booking_for(42).await.unwrap().is_some());

  // Past the 90 minute grace window.
  let after = Reservations::with_clock(Arc::clone(&s), policy, FixedClock(instant("2025-06-01T20:31:00Z")));
  assert!(after.active_booking_for(42).await.unwrap().is_none());
  assert!(
    after
      .booked_tables(day("2025-06-01"), slot("19:00"), None)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn get_booking_missing_is_not_found() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  assert!(matches!(e.get_booking(12345).await, Err(CoreError::NotFound(12345))));
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
  let e = engine_at("2025-05-31T12:00:00Z").await;
  let mut ids = Vec::new();
  for (i, at) in ["12:00", "12:30", "13:00", "13:30"].into_iter().enumerate() {
    let b = e.create_booking(request(1, "2025-06-01", at, i as i64)).await.unwrap();
    ids.push(b.booking_id);
  }

  let latest = e.list_bookings(Some(2)).await.unwrap();
  let got: Vec<_> = latest.iter().map(|b| b.booking_id).collect();
  assert_eq!(got, [ids[3], ids[2]]);

  assert_eq!(e.list_bookings(None).await.unwrap().len(), 4);
}

// ─── Error classification ────────────────────────────────────────────────────

#[test]
fn store_errors_map_onto_the_core_taxonomy() {
  let timeout: CoreError = crate::Error::Timeout(Duration::from_secs(5)).into();
  assert!(timeout.is_retryable());

  let unknown: CoreError = crate::Error::UnknownTable(9).into();
  assert!(matches!(unknown, CoreError::Validation(_)));

  let at = instant("2025-06-01T20:00:00Z");
  let conflict: CoreError = crate::Error::Conflict { table_id: 5, reserved_for: at }.into();
  assert!(matches!(conflict, CoreError::Conflict { table_id: 5, .. }));
  assert!(!conflict.is_retryable());
}
