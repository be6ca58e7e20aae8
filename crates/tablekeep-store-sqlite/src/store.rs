//! [`SqliteStore`], the SQLite implementation of [`ColumnMigrator`] and
//! [`SnapshotStore`].

use std::path::Path;

use tablekeep_core::{
  backup::{BackupRecord, BackupSummary, ListQuery, RestoreOptions, RestoreOutcome},
  plan::DropOutcome,
  schema::TableSchema,
  store::{ColumnMigrator, SnapshotStore},
};

use crate::{Error, Result, backup, catalog, migrate, schema::CONNECTION_PRAGMAS};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Administrative handle on a single SQLite database.
///
/// Cloning is cheap: the inner connection is reference-counted, and every
/// statement is serialized on its dedicated thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the database at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory database; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread. `f` reports its own errors, which
  /// are passed through untouched.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }

  /// Run arbitrary SQL statements. Operator and test convenience; the
  /// migration and snapshot paths never go through here.
  pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .with_conn(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await
  }

  /// Names of all tables, sorted.
  pub async fn table_names(&self) -> Result<Vec<String>> {
    self
      .with_conn(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name FROM sqlite_master
           WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
           ORDER BY name",
        )?;
        let names = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
      })
      .await
  }

  /// Every row of `table` as text cells (`NULL` stays `None`), in rowid
  /// order. Columns follow the table's declaration order.
  pub async fn dump_table(&self, table: &str) -> Result<Vec<Vec<Option<String>>>> {
    let sql = format!(
      "SELECT * FROM {} ORDER BY rowid",
      tablekeep_core::ident::quote_ident(table)
    );
    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let width = stmt.column_count();
        let rows = stmt
          .query_map([], |row| {
            (0..width)
              .map(|i| row.get::<_, rusqlite::types::Value>(i).map(text_cell))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }
}

fn text_cell(value: rusqlite::types::Value) -> Option<String> {
  use rusqlite::types::Value;
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(f) => Some(f.to_string()),
    Value::Text(s) => Some(s),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}

// ─── ColumnMigrator impl ─────────────────────────────────────────────────────

impl ColumnMigrator for SqliteStore {
  type Error = Error;

  async fn table_schema<'a>(&'a self, table: &'a str) -> Result<Option<TableSchema>> {
    let table = table.to_string();
    self.with_conn(move |conn| catalog::table_schema(conn, &table)).await
  }

  async fn drop_column<'a>(&'a self, table: &'a str, column: &'a str) -> Result<DropOutcome> {
    let (table, column) = (table.to_string(), column.to_string());
    self
      .with_conn(move |conn| migrate::drop_column(conn, &table, &column))
      .await
  }
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  async fn capture_backup<'a>(
    &'a self,
    source_table: &'a str,
    query:        Option<&'a str>,
  ) -> Result<BackupSummary> {
    let source_table = source_table.to_string();
    let query = query.map(str::to_owned);
    self
      .with_conn(move |conn| backup::capture(conn, &source_table, query.as_deref()))
      .await
  }

  async fn list_backups<'a>(&'a self, query: &'a ListQuery) -> Result<Vec<BackupSummary>> {
    let query = query.clone();
    self.with_conn(move |conn| backup::list(conn, &query)).await
  }

  async fn get_backup(&self, id: i64, include_payload: bool) -> Result<Option<BackupRecord>> {
    self
      .with_conn(move |conn| backup::get(conn, id, include_payload))
      .await
  }

  async fn restore_backup(
    &self,
    id:      i64,
    options: RestoreOptions,
  ) -> Result<Option<RestoreOutcome>> {
    self
      .with_conn(move |conn| backup::restore(conn, id, &options))
      .await
  }
}
