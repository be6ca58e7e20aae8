//! Snapshot catalog operations and restore materialization.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use tablekeep_core::{
  Error as CoreError,
  backup::{
    BackupRecord, BackupSummary, ColumnLayout, ListQuery, PREVIEW_COLUMN_CAP, RestoreOptions,
    RestoreOutcome, RestorePreview, RestoreReport, restore_candidate_name,
  },
  ident::quote_ident,
};
use tracing::info;

use crate::{
  Result, catalog,
  encode::{RawBackup, encode_dt, row_to_json},
  schema::{BACKUPS_DDL, BACKUPS_TABLE},
};

// ─── Capture ─────────────────────────────────────────────────────────────────

pub fn capture(conn: &Connection, source_table: &str, query: Option<&str>) -> Result<BackupSummary> {
  let sql = match query {
    Some(q) => q.to_string(),
    None => format!("SELECT * FROM {}", quote_ident(source_table)),
  };

  let rows = {
    let mut stmt = conn.prepare(&sql)?;
    if !stmt.readonly() {
      return Err(CoreError::InvalidQuery(sql).into());
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
    stmt
      .query_map([], |row| row_to_json(row, &columns))?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  conn.execute_batch(BACKUPS_DDL)?;

  let created_at = Utc::now();
  let data_json = serde_json::to_string(&rows)?;
  conn.execute(
    "INSERT INTO migration_backups (created_at, source_table, rows_count, data_json)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![encode_dt(created_at), source_table, rows.len() as i64, data_json],
  )?;

  let summary = BackupSummary {
    id: conn.last_insert_rowid(),
    created_at,
    source_table: source_table.to_string(),
    row_count: rows.len() as i64,
  };
  info!(id = summary.id, source = %summary.source_table, rows = summary.row_count, "backup captured");
  Ok(summary)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn list(conn: &Connection, query: &ListQuery) -> Result<Vec<BackupSummary>> {
  if !catalog::name_exists(conn, BACKUPS_TABLE)? {
    return Ok(Vec::new());
  }

  let mut stmt = conn.prepare(
    "SELECT id, created_at, source_table, rows_count, NULL
     FROM migration_backups
     WHERE ?1 IS NULL OR source_table = ?1
     ORDER BY id DESC
     LIMIT ?2",
  )?;
  let raws = stmt
    .query_map(
      rusqlite::params![query.source_table.as_deref(), query.effective_limit()],
      raw_backup,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|raw| Ok(raw.into_record()?.summary()))
    .collect()
}

pub fn get(conn: &Connection, id: i64, include_payload: bool) -> Result<Option<BackupRecord>> {
  if !catalog::name_exists(conn, BACKUPS_TABLE)? {
    return Ok(None);
  }

  let raw = conn
    .query_row(
      "SELECT id, created_at, source_table, rows_count,
              CASE WHEN ?2 THEN data_json END
       FROM migration_backups WHERE id = ?1",
      rusqlite::params![id, include_payload],
      raw_backup,
    )
    .optional()?;

  raw.map(RawBackup::into_record).transpose()
}

fn raw_backup(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBackup> {
  Ok(RawBackup {
    id:           row.get(0)?,
    created_at:   row.get(1)?,
    source_table: row.get(2)?,
    rows_count:   row.get(3)?,
    data_json:    row.get(4)?,
  })
}

// ─── Restore ─────────────────────────────────────────────────────────────────

/// Resolve, and unless `dry_run`, materialize a backup into a new table.
///
/// A failure after the table was created leaves it in place, partially
/// populated; dropping it is up to the operator.
pub fn restore(conn: &Connection, id: i64, options: &RestoreOptions) -> Result<Option<RestoreOutcome>> {
  let Some(record) = get(conn, id, true)? else {
    return Ok(None);
  };

  let rows = record.rows()?;
  let layout = ColumnLayout::infer(&rows);
  let columns = layout.column_names();
  let candidate = restore_candidate_name(&record, options.target_table.as_deref());
  let target = catalog::unique_name(conn, &candidate)?;

  if options.dry_run {
    return Ok(Some(RestoreOutcome::Preview(RestorePreview {
      target_table: target,
      source_table: record.source_table,
      row_count:    rows.len(),
      column_count: columns.len(),
      columns:      columns.into_iter().take(PREVIEW_COLUMN_CAP).collect(),
    })));
  }

  let schema_failure = |step: &str, e: rusqlite::Error| CoreError::Step {
    step:    step.to_string(),
    message: e.to_string(),
  };

  let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
  let create = format!(
    "CREATE TABLE {} ({})",
    quote_ident(&target),
    quoted.iter().map(|c| format!("{c} TEXT")).collect::<Vec<_>>().join(", "),
  );
  conn
    .execute_batch(&create)
    .map_err(|e| schema_failure("create restored table", e))?;

  let placeholders = (1..=quoted.len()).map(|n| format!("?{n}")).collect::<Vec<_>>().join(", ");
  let insert = format!(
    "INSERT INTO {} ({}) VALUES ({placeholders})",
    quote_ident(&target),
    quoted.join(", "),
  );
  let mut stmt = conn
    .prepare(&insert)
    .map_err(|e| schema_failure("prepare restored row insert", e))?;

  let mut rows_inserted = 0u64;
  for row in &rows {
    stmt
      .execute(rusqlite::params_from_iter(layout.cells(row)))
      .map_err(|e| schema_failure("insert restored row", e))?;
    rows_inserted += 1;
  }

  info!(backup = id, target = %target, rows = rows_inserted, "backup restored");

  Ok(Some(RestoreOutcome::Restored(RestoreReport {
    backup_id: id,
    source_table: record.source_table,
    target_table: target,
    rows_inserted,
  })))
}
