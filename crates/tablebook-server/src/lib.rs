//! Server assembly for tablebook: configuration, table seeding, and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  time::Duration as StdDuration,
};

use anyhow::{Context as _, bail};
use axum::Router;
use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use tablebook_api::{AppState, api_router};
use tablebook_core::{
  booking::RequesterId,
  calendar::{Slot, SlotCalendar},
  clock::Clock,
  policy::BookingPolicy,
  store::BookingStore,
  table::{Table, TableId},
};
use tower_http::trace::TraceLayer;

/// Environment variables with this prefix override the config file,
/// e.g. `TABLEBOOK_PORT=8080`.
pub const ENV_PREFIX: &str = "TABLEBOOK";

// ─── Configuration ────────────────────────────────────────────────────────────

/// A table declared in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
  pub id:   TableId,
  #[serde(default)]
  pub area: Option<String>,
}

impl From<&TableConfig> for Table {
  fn from(t: &TableConfig) -> Self {
    Table { table_id: t.id, area: t.area.clone() }
  }
}

/// Runtime server configuration, deserialised from `tablebook.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default)]
  pub admin_id:             Option<RequesterId>,
  /// Fixed UTC offset of the restaurant, e.g. `"+03:00"`.
  #[serde(default = "default_utc_offset")]
  pub utc_offset:           String,
  #[serde(default = "default_opening")]
  pub opening:              String,
  #[serde(default = "default_closing")]
  pub closing:              String,
  #[serde(default = "default_slot_minutes")]
  pub slot_minutes:         u32,
  #[serde(default)]
  pub lead_minutes:         u32,
  #[serde(default = "default_active_grace_minutes")]
  pub active_grace_minutes: u32,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms:     u64,
  #[serde(default = "default_tables")]
  pub tables:               Vec<TableConfig>,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("tablebook.db") }
fn default_utc_offset() -> String { "+00:00".to_owned() }
fn default_opening() -> String { "12:00".to_owned() }
fn default_closing() -> String { "23:00".to_owned() }
fn default_slot_minutes() -> u32 { 30 }
fn default_active_grace_minutes() -> u32 { 90 }
fn default_store_timeout_ms() -> u64 { 5000 }

fn default_tables() -> Vec<TableConfig> {
  (1..=10).map(|id| TableConfig { id, area: None }).collect()
}

impl ServerConfig {
  /// Read `path` (if it exists) overlaid with `TABLEBOOK_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_timeout(&self) -> StdDuration {
    StdDuration::from_millis(self.store_timeout_ms)
  }

  /// Build the booking rules, rejecting an unusable offset or calendar.
  pub fn policy(&self) -> anyhow::Result<BookingPolicy> {
    let timezone: FixedOffset = self
      .utc_offset
      .trim()
      .parse()
      .map_err(|e| anyhow::anyhow!("invalid utc_offset {:?}: {e}", self.utc_offset))?;
    let opening: Slot = self
      .opening
      .parse()
      .with_context(|| format!("invalid opening time {:?}", self.opening))?;
    let closing: Slot = self
      .closing
      .parse()
      .with_context(|| format!("invalid closing time {:?}", self.closing))?;
    let calendar = SlotCalendar::new(opening, closing, self.slot_minutes)
      .context("invalid slot calendar")?;

    Ok(BookingPolicy {
      calendar,
      timezone,
      lead: Duration::minutes(self.lead_minutes.into()),
      active_grace: Duration::minutes(self.active_grace_minutes.into()),
    })
  }

  /// Check the table list: ids must be positive and unique.
  pub fn validate_tables(&self) -> anyhow::Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for table in &self.tables {
      if table.id <= 0 {
        bail!("table id must be positive, got {}", table.id);
      }
      if !seen.insert(table.id) {
        bail!("table {} is declared twice", table.id);
      }
    }
    Ok(())
  }
}

// ─── Seeding ──────────────────────────────────────────────────────────────────

/// Insert every configured table that does not exist yet. Returns the number
/// of tables added; existing rows are left untouched.
pub async fn seed_tables<S: BookingStore>(
  store: &S,
  tables: &[TableConfig],
) -> Result<usize, S::Error> {
  let mut added = 0;
  for table in tables {
    if store.add_table(table.into()).await? {
      added += 1;
    }
  }
  tracing::info!(added, configured = tables.len(), "tables seeded");
  Ok(added)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn app<S, C>(state: AppState<S, C>) -> Router
where
  S: BookingStore + 'static,
  C: Clock + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
