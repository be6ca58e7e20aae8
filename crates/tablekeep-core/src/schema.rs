//! Structured table schema, as introspected from the store's catalog.
//!
//! Migrations never edit `CREATE TABLE` text. They adjust a [`TableSchema`]
//! and render a fresh statement from it with [`TableSchema::create_table_sql`].

use serde::Serialize;

use crate::ident::{mentions_identifier, quote_ident};

// ─── Parts ───────────────────────────────────────────────────────────────────

/// One column, as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
  pub name:                 String,
  /// Declared type text; may be empty (SQLite allows untyped columns).
  pub declared_type:        String,
  pub not_null:             bool,
  /// Default expression exactly as written in the original DDL.
  pub default_value:        Option<String>,
  /// 1-based position inside the primary key, `0` if not part of it.
  pub primary_key_position: u32,
  pub collation:            Option<String>,
  /// Column-level `CHECK (…)` clauses, verbatim.
  pub checks:               Vec<String>,
  pub generated:            Option<GeneratedColumn>,
}

/// `GENERATED ALWAYS AS (expression) [STORED | VIRTUAL]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedColumn {
  pub expression: String,
  pub stored:     bool,
}

impl ColumnDefinition {
  /// A nullable column with no constraints.
  pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
    Self {
      name:                 name.into(),
      declared_type:        declared_type.into(),
      not_null:             false,
      default_value:        None,
      primary_key_position: 0,
      collation:            None,
      checks:               Vec::new(),
      generated:            None,
    }
  }

  pub fn is_named(&self, name: &str) -> bool { self.name.eq_ignore_ascii_case(name) }
}

/// An explicitly created index (one with a defining statement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
  pub name:               String,
  pub defining_statement: String,
  /// Key columns in order; expression keys are not listed.
  pub columns:            Vec<String>,
}

impl IndexDefinition {
  /// Whether this index depends on `column`, either as a key column or
  /// anywhere in its key expressions or `WHERE` clause.
  pub fn references(&self, column: &str) -> bool {
    if self.columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
      return true;
    }
    // Skip `CREATE INDEX <name> ON <table>` so the index's own name and the
    // table name never count as a mention.
    let body = self
      .defining_statement
      .find('(')
      .map_or("", |at| &self.defining_statement[at..]);
    mentions_identifier(body, column)
  }
}

/// A trigger attached to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerDefinition {
  pub name:               String,
  pub defining_statement: String,
}

/// A table-level `UNIQUE (…)` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueConstraint {
  pub columns: Vec<String>,
}

/// A `FOREIGN KEY (…) REFERENCES parent (…)` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyDefinition {
  pub from_columns: Vec<String>,
  pub parent_table: String,
  /// Empty when the clause references the parent's primary key implicitly.
  pub to_columns:   Vec<String>,
  pub on_update:    String,
  pub on_delete:    String,
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// The live definition of a table. Never persisted; always re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
  pub name:               String,
  pub columns:            Vec<ColumnDefinition>,
  pub indexes:            Vec<IndexDefinition>,
  pub unique_constraints: Vec<UniqueConstraint>,
  pub foreign_keys:       Vec<ForeignKeyDefinition>,
  /// Table-level `CHECK` constraints, verbatim.
  pub checks:             Vec<String>,
  pub triggers:           Vec<TriggerDefinition>,
  /// The single-column integer primary key was declared `AUTOINCREMENT`.
  pub autoincrement:      bool,
  /// Text after the column list, e.g. `WITHOUT ROWID` or `STRICT`.
  pub options:            String,
}

impl TableSchema {
  pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
    Self {
      name: name.into(),
      columns,
      indexes: Vec::new(),
      unique_constraints: Vec::new(),
      foreign_keys: Vec::new(),
      checks: Vec::new(),
      triggers: Vec::new(),
      autoincrement: false,
      options: String::new(),
    }
  }

  pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
    self.columns.iter().find(|c| c.is_named(name))
  }

  pub fn has_column(&self, name: &str) -> bool { self.column(name).is_some() }

  pub fn column_names(&self) -> Vec<String> {
    self.columns.iter().map(|c| c.name.clone()).collect()
  }

  /// Columns that hold data of their own, i.e. everything but generated
  /// columns. Only these can be copied.
  pub fn stored_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
    self.columns.iter().filter(|c| c.generated.is_none())
  }

  pub fn is_without_rowid(&self) -> bool {
    let options = self.options.to_ascii_uppercase();
    options.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == "ROWID")
  }

  /// The same table without `column`: the column itself, constraints that
  /// involve it, and indexes and triggers that reference it are all removed.
  ///
  /// Dropping a member of the primary key removes the whole key, since the
  /// remaining members alone may no longer be unique.
  pub fn without_column(&self, column: &str) -> TableSchema {
    let involves = |cols: &[String]| cols.iter().any(|c| c.eq_ignore_ascii_case(column));
    let key_dropped = self.column(column).is_some_and(|c| c.primary_key_position > 0);

    TableSchema {
      name:               self.name.clone(),
      columns:            self
        .columns
        .iter()
        .filter(|c| !c.is_named(column))
        .map(|c| {
          let mut c = c.clone();
          if key_dropped {
            c.primary_key_position = 0;
          }
          c.checks.retain(|check| !mentions_identifier(check, column));
          c
        })
        .collect(),
      indexes:            self
        .indexes
        .iter()
        .filter(|i| !i.references(column))
        .cloned()
        .collect(),
      unique_constraints: self
        .unique_constraints
        .iter()
        .filter(|u| !involves(&u.columns))
        .cloned()
        .collect(),
      foreign_keys:       self
        .foreign_keys
        .iter()
        .filter(|fk| !involves(&fk.from_columns))
        .cloned()
        .collect(),
      checks:             self
        .checks
        .iter()
        .filter(|check| !mentions_identifier(check, column))
        .cloned()
        .collect(),
      triggers:           self
        .triggers
        .iter()
        .filter(|t| !mentions_identifier(&t.defining_statement, column))
        .cloned()
        .collect(),
      autoincrement:      self.autoincrement && !key_dropped,
      options:            self.options.clone(),
    }
  }

  /// Primary-key columns, in key order.
  fn primary_key(&self) -> Vec<&ColumnDefinition> {
    let mut pk: Vec<&ColumnDefinition> = self
      .columns
      .iter()
      .filter(|c| c.primary_key_position > 0)
      .collect();
    pk.sort_by_key(|c| c.primary_key_position);
    pk
  }

  /// Render a `CREATE TABLE` statement for this schema under `table_name`.
  ///
  /// A single-column primary key is written inline so an `INTEGER PRIMARY
  /// KEY` stays a rowid alias; composite keys become a table constraint.
  pub fn create_table_sql(&self, table_name: &str) -> String {
    let pk = self.primary_key();
    let inline_pk = pk.len() == 1;

    let mut parts: Vec<String> = self
      .columns
      .iter()
      .map(|col| {
        let mut def = quote_ident(&col.name);
        if !col.declared_type.is_empty() {
          def.push(' ');
          def.push_str(&col.declared_type);
        }
        if inline_pk && col.primary_key_position > 0 {
          def.push_str(" PRIMARY KEY");
          if self.autoincrement && col.declared_type.eq_ignore_ascii_case("INTEGER") {
            def.push_str(" AUTOINCREMENT");
          }
        }
        if col.not_null {
          def.push_str(" NOT NULL");
        }
        if let Some(default) = &col.default_value {
          def.push_str(&format!(" DEFAULT ({default})"));
        }
        if let Some(collation) = &col.collation {
          def.push_str(&format!(" COLLATE {}", quote_ident(collation)));
        }
        for check in &col.checks {
          def.push(' ');
          def.push_str(check);
        }
        if let Some(generated) = &col.generated {
          def.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            generated.expression,
            if generated.stored { "STORED" } else { "VIRTUAL" }
          ));
        }
        def
      })
      .collect();

    if pk.len() > 1 {
      parts.push(format!("PRIMARY KEY ({})", quote_list(pk.iter().map(|c| c.name.as_str()))));
    }

    for unique in &self.unique_constraints {
      parts.push(format!("UNIQUE ({})", quote_list(unique.columns.iter().map(String::as_str))));
    }

    for fk in &self.foreign_keys {
      let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {}",
        quote_list(fk.from_columns.iter().map(String::as_str)),
        quote_ident(&fk.parent_table),
      );
      if !fk.to_columns.is_empty() {
        clause.push_str(&format!(" ({})", quote_list(fk.to_columns.iter().map(String::as_str))));
      }
      if !is_default_action(&fk.on_update) {
        clause.push_str(&format!(" ON UPDATE {}", fk.on_update));
      }
      if !is_default_action(&fk.on_delete) {
        clause.push_str(&format!(" ON DELETE {}", fk.on_delete));
      }
      parts.push(clause);
    }

    parts.extend(self.checks.iter().cloned());

    let mut sql =
      format!("CREATE TABLE {} (\n  {}\n)", quote_ident(table_name), parts.join(",\n  "));
    if !self.options.is_empty() {
      sql.push(' ');
      sql.push_str(&self.options);
    }
    sql
  }
}

fn quote_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
  names.map(quote_ident).collect::<Vec<_>>().join(", ")
}

fn is_default_action(action: &str) -> bool {
  action.is_empty() || action.eq_ignore_ascii_case("NO ACTION")
}
