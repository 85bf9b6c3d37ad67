//! SQL schema for the tablebook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tables (
    table_id  INTEGER PRIMARY KEY CHECK (table_id > 0),
    area      TEXT
);

-- Rows are inserted and deleted, never updated.
-- AUTOINCREMENT keeps booking ids monotonic even after deletes.
CREATE TABLE IF NOT EXISTS bookings (
    booking_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id        INTEGER NOT NULL REFERENCES tables(table_id),
    requester_id    INTEGER,
    requester_name  TEXT    NOT NULL,
    phone           TEXT    NOT NULL,
    party_size      INTEGER NOT NULL CHECK (party_size >= 1),
    day             TEXT    NOT NULL,   -- restaurant-local YYYY-MM-DD
    slot_label      TEXT    NOT NULL,   -- HH:MM
    reserved_for    TEXT    NOT NULL,   -- RFC 3339 UTC, whole seconds
    created_at      TEXT    NOT NULL,   -- RFC 3339 UTC; server-assigned
    UNIQUE (table_id, reserved_for)
);

CREATE INDEX IF NOT EXISTS bookings_day_idx       ON bookings(day, slot_label);
CREATE INDEX IF NOT EXISTS bookings_requester_idx ON bookings(requester_id, reserved_for);
CREATE INDEX IF NOT EXISTS bookings_created_idx   ON bookings(created_at);

PRAGMA user_version = 1;
";
