//! Catalog introspection: rebuilds a structured [`TableSchema`] from
//! `sqlite_master` and the table-valued `pragma_*` functions.

use rusqlite::{Connection, OptionalExtension as _};
use tablekeep_core::{
  Error as CoreError,
  backup::name_candidates,
  ddl::{self, ParsedTable},
  ident::{mentions_identifier, quote_ident},
  plan::{DependentKind, DependentObject},
  schema::{
    ColumnDefinition, ForeignKeyDefinition, GeneratedColumn, IndexDefinition, TableSchema,
    TriggerDefinition, UniqueConstraint,
  },
};

use crate::Result;

/// How many `_vN` suffixes [`unique_name`] tries before giving up.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Introspect `table`. Lookup is case-insensitive, as SQLite's own is; the
/// returned schema carries the table's canonical name.
///
/// Collations, `CHECK` constraints, generated expressions, `AUTOINCREMENT`
/// and table options are read from the stored `CREATE TABLE` text; the rest
/// comes from the pragma functions.
pub fn table_schema(conn: &Connection, table: &str) -> Result<Option<TableSchema>> {
  let found: Option<(String, String)> = conn
    .query_row(
      "SELECT name, COALESCE(sql, '') FROM sqlite_master
       WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
      [table],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;

  let Some((name, create_sql)) = found else {
    return Ok(None);
  };

  let unsupported = |reason: String| CoreError::Unsupported { table: name.clone(), reason };

  if create_sql.trim_start().to_ascii_uppercase().starts_with("CREATE VIRTUAL") {
    return Err(unsupported("virtual tables are not rebuilt".to_string()).into());
  }
  let parsed = ddl::parse_create_table(&create_sql).map_err(|e| match e {
    CoreError::Unsupported { reason, .. } => unsupported(reason),
    other => other,
  })?;

  let mut schema = TableSchema::new(name.clone(), columns(conn, &name, &parsed)?);
  schema.indexes = indexes(conn, &name)?;
  schema.unique_constraints = unique_constraints(conn, &name)?;
  schema.foreign_keys = foreign_keys(conn, &name)?;
  schema.checks = parsed.checks;
  schema.triggers = triggers(conn, &name)?;
  schema.autoincrement = parsed.columns.iter().any(|c| c.autoincrement);
  schema.options = parsed.options;

  Ok(Some(schema))
}

/// `hidden` in `pragma_table_xinfo`: 2 and 3 mark generated columns, 1 a
/// hidden virtual-table column.
const HIDDEN_VTAB_COLUMN: i64 = 1;

fn columns(conn: &Connection, table: &str, parsed: &ParsedTable) -> Result<Vec<ColumnDefinition>> {
  let mut stmt = conn.prepare(
    "SELECT name, type, \"notnull\", dflt_value, pk, hidden
     FROM pragma_table_xinfo(?1) WHERE hidden <> ?2 ORDER BY cid",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![table, HIDDEN_VTAB_COLUMN], |r| {
      let column = ColumnDefinition {
        name: r.get(0)?,
        declared_type: r.get(1)?,
        not_null: r.get(2)?,
        default_value: r.get(3)?,
        primary_key_position: r.get(4)?,
        ..ColumnDefinition::new("", "")
      };
      Ok((column, r.get::<_, i64>(5)? > HIDDEN_VTAB_COLUMN))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(mut column, is_generated)| -> Result<ColumnDefinition> {
      let text = parsed.column(&column.name);
      if let Some(text) = text {
        column.collation = text.collation.clone();
        column.checks = text.checks.clone();
      }
      if is_generated {
        let (expression, stored) =
          text.and_then(|t| t.generated.clone()).ok_or_else(|| CoreError::Unsupported {
            table:  table.to_string(),
            reason: format!("expression of generated column {:?} not found", column.name),
          })?;
        column.generated = Some(GeneratedColumn { expression, stored });
      }
      Ok(column)
    })
    .collect()
}

fn triggers(conn: &Connection, table: &str) -> Result<Vec<TriggerDefinition>> {
  let mut stmt = conn.prepare(
    "SELECT name, sql FROM sqlite_master
     WHERE type = 'trigger' AND tbl_name = ?1 COLLATE NOCASE AND sql IS NOT NULL
     ORDER BY name",
  )?;
  let triggers = stmt
    .query_map([table], |r| {
      Ok(TriggerDefinition { name: r.get(0)?, defining_statement: r.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(triggers)
}

/// Key columns of an index; expression keys have no name and are skipped.
fn index_columns(conn: &Connection, index: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
  let cols = stmt
    .query_map([index], |r| r.get::<_, Option<String>>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(cols.into_iter().flatten().collect())
}

fn indexes(conn: &Connection, table: &str) -> Result<Vec<IndexDefinition>> {
  let mut stmt = conn.prepare(
    "SELECT name, sql FROM sqlite_master
     WHERE type = 'index' AND tbl_name = ?1 COLLATE NOCASE AND sql IS NOT NULL
     ORDER BY name",
  )?;
  let raw = stmt
    .query_map([table], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw
    .into_iter()
    .map(|(name, defining_statement)| {
      Ok(IndexDefinition {
        columns: index_columns(conn, &name)?,
        name,
        defining_statement,
      })
    })
    .collect()
}

fn unique_constraints(conn: &Connection, table: &str) -> Result<Vec<UniqueConstraint>> {
  let mut stmt = conn.prepare(
    "SELECT name FROM pragma_index_list(?1) WHERE origin = 'u' ORDER BY seq DESC",
  )?;
  let names = stmt
    .query_map([table], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  names
    .iter()
    .map(|name| Ok(UniqueConstraint { columns: index_columns(conn, name)? }))
    .collect()
}

fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyDefinition>> {
  let mut stmt = conn.prepare(
    "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete
     FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
  )?;
  let rows = stmt
    .query_map([table], |r| {
      Ok((
        r.get::<_, i64>(0)?,
        r.get::<_, String>(1)?,
        r.get::<_, String>(2)?,
        r.get::<_, Option<String>>(3)?,
        r.get::<_, String>(4)?,
        r.get::<_, String>(5)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut fks: Vec<(i64, ForeignKeyDefinition)> = Vec::new();
  for (id, parent, from, to, on_update, on_delete) in rows {
    if fks.last().is_none_or(|(last, _)| *last != id) {
      fks.push((id, ForeignKeyDefinition {
        from_columns: Vec::new(),
        parent_table: parent,
        to_columns: Vec::new(),
        on_update,
        on_delete,
      }));
    }
    if let Some((_, fk)) = fks.last_mut() {
      fk.from_columns.push(from);
      fk.to_columns.extend(to);
    }
  }

  Ok(fks.into_iter().map(|(_, fk)| fk).collect())
}

/// Views and triggers whose SQL mentions `table`.
pub fn dependents(conn: &Connection, table: &str) -> Result<Vec<DependentObject>> {
  let mut stmt = conn.prepare(
    "SELECT type, name, sql FROM sqlite_master
     WHERE type IN ('view', 'trigger') AND sql IS NOT NULL
     ORDER BY type, name",
  )?;
  let rows = stmt
    .query_map([], |r| {
      Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(
    rows
      .into_iter()
      .filter(|(_, _, sql)| mentions_identifier(sql, table))
      .map(|(kind, name, sql)| DependentObject {
        kind: if kind == "view" { DependentKind::View } else { DependentKind::Trigger },
        name,
        sql,
      })
      .collect(),
  )
}

/// Whether any schema object (table, index, view, trigger) uses `name`.
pub fn name_exists(conn: &Connection, name: &str) -> Result<bool> {
  let found = conn
    .query_row(
      "SELECT 1 FROM sqlite_master WHERE name = ?1 COLLATE NOCASE",
      [name],
      |_| Ok(()),
    )
    .optional()?;
  Ok(found.is_some())
}

/// `base`, or the first free `base_vN`.
pub fn unique_name(conn: &Connection, base: &str) -> Result<String> {
  for candidate in name_candidates(base).take(MAX_NAME_ATTEMPTS) {
    if !name_exists(conn, &candidate)? {
      return Ok(candidate);
    }
  }
  Err(tablekeep_core::Error::NameExhausted(base.to_string()).into())
}

pub fn row_count(conn: &Connection, table: &str) -> Result<u64> {
  let count: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
    [],
    |r| r.get(0),
  )?;
  Ok(count.max(0) as u64)
}
