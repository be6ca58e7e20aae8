//! The store traits for the two administrative mechanisms.
//!
//! Backends (e.g. `tablekeep-store-sqlite`) implement both. The HTTP layer
//! and the operator CLI depend on these traits, never on a concrete backend,
//! and always receive the store handle explicitly.

use std::future::Future;

use crate::{
  backup::{BackupRecord, BackupSummary, ListQuery, RestoreOptions, RestoreOutcome},
  plan::DropOutcome,
  schema::TableSchema,
};

/// Safe, idempotent column removal by shadow-table copy-swap.
pub trait ColumnMigrator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Introspect a table. Returns `None` if it does not exist.
  fn table_schema<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<Option<TableSchema>, Self::Error>> + Send + 'a;

  /// Remove `column` from `table`, preserving every other column's data and
  /// every index that does not reference it.
  ///
  /// Running it again once the column is gone reports
  /// [`DropOutcome::NoOp`]. The original table is left behind under a
  /// backup name.
  fn drop_column<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
  ) -> impl Future<Output = Result<DropOutcome, Self::Error>> + Send + 'a;
}

/// Immutable JSON snapshots of query results, with non-destructive restore.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Snapshot the rows of `query` (default: every row of `source_table`)
  /// under the `source_table` label. Only read-only queries are accepted.
  fn capture_backup<'a>(
    &'a self,
    source_table: &'a str,
    query: Option<&'a str>,
  ) -> impl Future<Output = Result<BackupSummary, Self::Error>> + Send + 'a;

  /// Newest first. An uninitialised catalog yields an empty list.
  fn list_backups<'a>(
    &'a self,
    query: &'a ListQuery,
  ) -> impl Future<Output = Result<Vec<BackupSummary>, Self::Error>> + Send + 'a;

  /// Returns `None` if no backup has this id.
  fn get_backup(
    &self,
    id: i64,
    include_payload: bool,
  ) -> impl Future<Output = Result<Option<BackupRecord>, Self::Error>> + Send + '_;

  /// Materialize (or preview) a backup into a brand-new table. Returns
  /// `None` if no backup has this id. Never overwrites an existing table.
  fn restore_backup(
    &self,
    id: i64,
    options: RestoreOptions,
  ) -> impl Future<Output = Result<Option<RestoreOutcome>, Self::Error>> + Send + '_;
}
