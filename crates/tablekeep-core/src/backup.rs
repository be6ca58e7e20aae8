//! Snapshot records and the pure half of restore: payload parsing, target
//! name candidates, column inference and cell mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  ident::{relaxed_key, sanitize_identifier},
};

/// Default and bounds for [`ListQuery::limit`].
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 500;

/// Column used when no payload row is a non-empty object.
pub const RAW_JSON_COLUMN: &str = "raw_json";
/// Name used when a target table name sanitizes to nothing.
pub const FALLBACK_TABLE_NAME: &str = "restored_table";
/// Name used when a payload key sanitizes to nothing.
pub const FALLBACK_COLUMN_NAME: &str = "column";
/// How many inferred columns a dry-run preview lists.
pub const PREVIEW_COLUMN_CAP: usize = 50;

// ─── Records ─────────────────────────────────────────────────────────────────

/// One persisted snapshot. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
  pub id:           i64,
  pub created_at:   DateTime<Utc>,
  /// Free-text label; the table may no longer exist.
  pub source_table: String,
  pub row_count:    i64,
  /// JSON-encoded array of rows; only loaded when asked for.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data_json:    Option<String>,
}

impl BackupRecord {
  /// Parse the payload as a row array.
  ///
  /// Invalid JSON is [`Error::CorruptData`]; valid JSON that is not an array
  /// is treated as an empty snapshot.
  pub fn rows(&self) -> Result<Vec<Value>> {
    let raw = self.data_json.as_deref().unwrap_or("[]");
    match serde_json::from_str::<Value>(raw) {
      Ok(Value::Array(rows)) => Ok(rows),
      Ok(_) => Ok(Vec::new()),
      Err(e) => Err(Error::CorruptData { id: self.id, message: e.to_string() }),
    }
  }

  pub fn summary(&self) -> BackupSummary {
    BackupSummary {
      id:           self.id,
      created_at:   self.created_at,
      source_table: self.source_table.clone(),
      row_count:    self.row_count,
    }
  }
}

/// A [`BackupRecord`] without its payload, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
  pub id:           i64,
  pub created_at:   DateTime<Utc>,
  pub source_table: String,
  pub row_count:    i64,
}

/// Filter for [`SnapshotStore::list_backups`](crate::store::SnapshotStore::list_backups).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  pub source_table: Option<String>,
  pub limit:        Option<u32>,
}

impl ListQuery {
  /// The effective limit, clamped to `[1, MAX_LIST_LIMIT]`.
  pub fn effective_limit(&self) -> u32 {
    self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
  }
}

// ─── Restore ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
  pub target_table: Option<String>,
  pub dry_run:      bool,
}

/// Sanitized target name before collision probing.
pub fn restore_candidate_name(record: &BackupRecord, requested: Option<&str>) -> String {
  let raw = match requested.map(str::trim).filter(|s| !s.is_empty()) {
    Some(name) => name.to_string(),
    None => format!("restored_{}_{}", record.source_table, record.id),
  };
  sanitize_identifier(&raw, FALLBACK_TABLE_NAME)
}

/// Candidate names in the order they are tried: `base`, then `base_v2`, `base_v3`, …
pub fn name_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
  std::iter::once(base.to_string()).chain((2..).map(move |n| format!("{base}_v{n}")))
}

/// How payload rows map onto the restored table's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLayout {
  /// One `TEXT` column per sanitized key, in first-seen order.
  Keys(Vec<String>),
  /// A single column holding each row's JSON encoding.
  RawJson,
}

impl ColumnLayout {
  /// Union of sanitized keys across all object rows.
  pub fn infer(rows: &[Value]) -> Self {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
      let Value::Object(map) = row else { continue };
      for key in map.keys() {
        let column = sanitize_identifier(key, FALLBACK_COLUMN_NAME);
        if !columns.contains(&column) {
          columns.push(column);
        }
      }
    }

    if columns.is_empty() {
      ColumnLayout::RawJson
    } else {
      ColumnLayout::Keys(columns)
    }
  }

  pub fn column_names(&self) -> Vec<String> {
    match self {
      ColumnLayout::Keys(columns) => columns.clone(),
      ColumnLayout::RawJson => vec![RAW_JSON_COLUMN.to_string()],
    }
  }

  /// The cell values for `row`, aligned with [`Self::column_names`].
  pub fn cells(&self, row: &Value) -> Vec<Option<String>> {
    match self {
      ColumnLayout::RawJson => vec![Some(row.to_string())],
      ColumnLayout::Keys(columns) => {
        let Value::Object(map) = row else {
          return vec![None; columns.len()];
        };
        columns
          .iter()
          .map(|column| lookup(map, column).and_then(stringify))
          .collect()
      }
    }
  }
}

/// Exact sanitized-key match first, then a relaxed one.
fn lookup<'a>(map: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
  map
    .iter()
    .find(|(k, _)| sanitize_identifier(k, FALLBACK_COLUMN_NAME) == column)
    .or_else(|| {
      let wanted = relaxed_key(column);
      map.iter().find(|(k, _)| relaxed_key(k) == wanted)
    })
    .map(|(_, v)| v)
}

/// Text form of a JSON value for a `TEXT` cell; `null` stays SQL `NULL`.
pub fn stringify(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

/// Result of a dry-run restore. Nothing was created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePreview {
  pub target_table: String,
  pub source_table: String,
  pub row_count:    usize,
  pub column_count: usize,
  /// At most [`PREVIEW_COLUMN_CAP`] names.
  pub columns:      Vec<String>,
}

/// Result of a materializing restore.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
  pub backup_id:     i64,
  pub source_table:  String,
  pub target_table:  String,
  pub rows_inserted: u64,
}

#[derive(Debug, Clone)]
pub enum RestoreOutcome {
  Preview(RestorePreview),
  Restored(RestoreReport),
}
