//! Column-drop migration plans and the step model they execute as.
//!
//! A [`MigrationPlan`] is computed fresh on every run from the live
//! [`TableSchema`]. It renders into an ordered list of [`Step`]s, each tagged
//! `required` or best-effort; executors abort on the former and only log the
//! latter.

use serde::Serialize;

use crate::{
  Error, Result,
  ident::{mentions_identifier, quote_ident},
  schema::{ColumnDefinition, IndexDefinition, TableSchema, TriggerDefinition},
};

// ─── Dependents ──────────────────────────────────────────────────────────────

/// Kind of a schema object that depends on a table by SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependentKind {
  View,
  Trigger,
}

impl DependentKind {
  fn keyword(self) -> &'static str {
    match self {
      DependentKind::View => "VIEW",
      DependentKind::Trigger => "TRIGGER",
    }
  }
}

/// A view or trigger whose definition mentions the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentObject {
  pub kind: DependentKind,
  pub name: String,
  pub sql:  String,
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// What a step does against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
  /// Run one or more `;`-separated statements.
  Sql(String),
  /// Fail unless both tables hold the same number of rows.
  MatchRowCounts { source: String, target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub label:    String,
  pub action:   StepAction,
  /// Required steps abort the migration on failure; the rest are logged.
  pub required: bool,
}

impl Step {
  fn required(label: impl Into<String>, action: StepAction) -> Self {
    Self { label: label.into(), action, required: true }
  }

  fn best_effort(label: impl Into<String>, action: StepAction) -> Self {
    Self { label: label.into(), action, required: false }
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MigrationPlan {
  pub table_name:         String,
  pub column_to_drop:     String,
  pub remaining_columns:  Vec<ColumnDefinition>,
  pub surviving_indexes:  Vec<IndexDefinition>,
  /// Indexes that reference the dropped column and are not recreated.
  pub dropped_indexes:    Vec<IndexDefinition>,
  /// Views and triggers that would break once the column is gone.
  pub stale_dependents:   Vec<DependentObject>,
  /// Triggers on the table that survive and are replayed after the swap.
  pub surviving_triggers: Vec<TriggerDefinition>,
  pub shadow_table:       String,
  pub backup_table:       String,
  target:                 TableSchema,
}

impl MigrationPlan {
  /// Plan the removal of `column` from `schema`.
  ///
  /// Returns `Ok(None)` when the column is already absent: the migration is
  /// a no-op. `backup_table` is the name the original table is moved to; it
  /// must already be free in the catalog.
  pub fn new(
    schema:       &TableSchema,
    column:       &str,
    dependents:   &[DependentObject],
    backup_table: impl Into<String>,
  ) -> Result<Option<Self>> {
    let Some(dropped) = schema.column(column) else {
      return Ok(None);
    };

    if schema.columns.len() == 1 {
      return Err(Error::LastColumn {
        table:  schema.name.clone(),
        column: dropped.name.clone(),
      });
    }

    let unsupported = |reason: String| Error::Unsupported { table: schema.name.clone(), reason };

    if schema.is_without_rowid() && dropped.primary_key_position > 0 {
      return Err(unsupported(format!(
        "{:?} is part of the primary key of a WITHOUT ROWID table",
        dropped.name
      )));
    }
    if let Some(generated) = schema.columns.iter().find(|c| {
      !c.is_named(&dropped.name)
        && c
          .generated
          .as_ref()
          .is_some_and(|g| mentions_identifier(&g.expression, &dropped.name))
    }) {
      return Err(unsupported(format!(
        "generated column {:?} is computed from {:?}",
        generated.name, dropped.name
      )));
    }

    let target = schema.without_column(&dropped.name);
    let (surviving_indexes, dropped_indexes): (Vec<_>, Vec<_>) = schema
      .indexes
      .iter()
      .cloned()
      .partition(|i| !i.references(&dropped.name));

    let stale_dependents = dependents
      .iter()
      .filter(|d| mentions_identifier(&d.sql, &dropped.name))
      .cloned()
      .collect();

    Ok(Some(Self {
      table_name: schema.name.clone(),
      column_to_drop: dropped.name.clone(),
      remaining_columns: target.columns.clone(),
      surviving_indexes,
      dropped_indexes,
      stale_dependents,
      surviving_triggers: target.triggers.clone(),
      shadow_table: shadow_table_name(&schema.name),
      backup_table: backup_table.into(),
      target,
    }))
  }

  /// `CREATE TABLE` for the shadow table, rendered from the reduced schema.
  pub fn shadow_create_sql(&self) -> String { self.target.create_table_sql(&self.shadow_table) }

  /// The ordered steps that carry the plan out.
  pub fn steps(&self) -> Vec<Step> {
    let table = quote_ident(&self.table_name);
    let shadow = quote_ident(&self.shadow_table);
    let columns = self
      .target
      .stored_columns()
      .map(|c| quote_ident(&c.name))
      .collect::<Vec<_>>()
      .join(", ");

    let mut steps = vec![Step::required(
      "drop stray shadow table",
      StepAction::Sql(format!("DROP TABLE IF EXISTS {shadow}")),
    )];

    for dep in &self.stale_dependents {
      steps.push(Step::best_effort(
        format!("drop dependent {} {}", dep.kind.keyword().to_lowercase(), dep.name),
        StepAction::Sql(format!("DROP {} IF EXISTS {}", dep.kind.keyword(), quote_ident(&dep.name))),
      ));
    }

    steps.push(Step::required("create shadow table", StepAction::Sql(self.shadow_create_sql())));
    steps.push(Step::required(
      "copy rows into shadow table",
      StepAction::Sql(format!("INSERT INTO {shadow} ({columns}) SELECT {columns} FROM {table}")),
    ));
    steps.push(Step::required("verify copied row count", StepAction::MatchRowCounts {
      source: self.table_name.clone(),
      target: self.shadow_table.clone(),
    }));
    steps.push(Step::required(
      "rename original table",
      StepAction::Sql(format!(
        "ALTER TABLE {table} RENAME TO {}",
        quote_ident(&self.backup_table)
      )),
    ));
    steps.push(Step::required(
      "rename shadow table",
      StepAction::Sql(format!("ALTER TABLE {shadow} RENAME TO {table}")),
    ));

    // The old index still sits on the backup table under the same name, so
    // it has to go before the definition can be replayed.
    for index in &self.surviving_indexes {
      steps.push(Step::best_effort(
        format!("recreate index {}", index.name),
        StepAction::Sql(format!(
          "DROP INDEX IF EXISTS {}; {}",
          quote_ident(&index.name),
          index.defining_statement
        )),
      ));
    }

    // Triggers moved to the backup table with the rename.
    for trigger in &self.surviving_triggers {
      steps.push(Step::best_effort(
        format!("recreate trigger {}", trigger.name),
        StepAction::Sql(format!(
          "DROP TRIGGER IF EXISTS {}; {}",
          quote_ident(&trigger.name),
          trigger.defining_statement
        )),
      ));
    }

    steps
  }
}

/// Temporary name the rebuilt table is created under.
pub fn shadow_table_name(table: &str) -> String { format!("{table}__shadow") }

/// Preferred name the original table is moved to, before uniqueness probing.
pub fn backup_table_name(table: &str, at: chrono::DateTime<chrono::Utc>) -> String {
  format!("{table}_backup_{}", at.format("%Y%m%d%H%M%S"))
}

/// Post-migration gate: the column must be gone from the final schema.
pub fn verify_dropped(after: &TableSchema, column: &str) -> Result<()> {
  if after.has_column(column) {
    return Err(Error::Integrity {
      table:  after.name.clone(),
      column: column.to_string(),
    });
  }
  Ok(())
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a [`ColumnMigrator::drop_column`](crate::store::ColumnMigrator::drop_column)
/// call did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
  /// The column was already absent; nothing was touched.
  NoOp { table: String, column: String },
  Dropped(DropReport),
}

impl DropOutcome {
  pub fn is_noop(&self) -> bool { matches!(self, DropOutcome::NoOp { .. }) }

  /// One-line, human-readable summary.
  pub fn message(&self) -> String {
    match self {
      DropOutcome::NoOp { table, column } => {
        format!("No-op: column {column} is not present on {table}")
      }
      DropOutcome::Dropped(report) => format!(
        "Dropped column {} from {} ({} rows copied, original kept as {})",
        report.column, report.table, report.rows_copied, report.backup_table
      ),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct DropReport {
  pub table:              String,
  pub column:             String,
  /// The original table, left in place as a recovery path.
  pub backup_table:       String,
  pub rows_copied:        u64,
  pub recreated_indexes:  Vec<String>,
  /// Indexes that referenced the column and were not recreated.
  pub dropped_indexes:    Vec<String>,
  /// Indexes whose recreation failed; operator follow-up.
  pub skipped_indexes:    Vec<String>,
  pub recreated_triggers: Vec<String>,
  /// Triggers whose replay failed; operator follow-up.
  pub skipped_triggers:   Vec<String>,
  /// Best-effort step failures, one line each.
  pub warnings:           Vec<String>,
}
