//! Conversions between SQLite values, JSON snapshot rows, and the text
//! representations stored in the backup catalog.
//!
//! Timestamps are stored as RFC 3339 strings; rows written by other tools
//! with SQLite's `datetime('now')` format are read as UTC. Blobs captured
//! into a snapshot become standard base64 strings.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use serde_json::{Map, Number, Value};
use tablekeep_core::backup::BackupRecord;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

/// SQLite's own `datetime()` output, with optional fractional seconds.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .or_else(|rfc_err| {
      NaiveDateTime::parse_from_str(s, SQLITE_DATETIME)
        .map(|naive| naive.and_utc())
        .map_err(|_| rfc_err)
    })
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row values ──────────────────────────────────────────────────────────────

pub fn value_to_json(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::Number(i.into()),
    ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    ValueRef::Blob(bytes) => Value::String(B64.encode(bytes)),
  }
}

/// One result row as a JSON object keyed by column name.
pub fn row_to_json(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Value> {
  let mut object = Map::with_capacity(columns.len());
  for (i, name) in columns.iter().enumerate() {
    object.insert(name.clone(), value_to_json(row.get_ref(i)?));
  }
  Ok(Value::Object(object))
}

// ─── Catalog rows ────────────────────────────────────────────────────────────

/// A `migration_backups` row as stored, before decoding.
pub struct RawBackup {
  pub id:           i64,
  pub created_at:   String,
  pub source_table: String,
  pub rows_count:   i64,
  pub data_json:    Option<String>,
}

impl RawBackup {
  pub fn into_record(self) -> Result<BackupRecord> {
    Ok(BackupRecord {
      id:           self.id,
      created_at:   decode_dt(&self.created_at)?,
      source_table: self.source_table,
      row_count:    self.rows_count,
      data_json:    self.data_json,
    })
  }
}
