//! Executes column-drop plans against a live connection.
//!
//! Every step runs as its own statement batch; nothing is wrapped in a
//! transaction. Recovery after an interruption is by re-running: the stray
//! shadow table is dropped on entry and an already-migrated table is a no-op.

use chrono::Utc;
use rusqlite::Connection;
use tablekeep_core::{
  Error as CoreError,
  plan::{DropOutcome, DropReport, MigrationPlan, Step, StepAction, backup_table_name, verify_dropped},
};
use tracing::{info, warn};

use crate::{Result, catalog};

/// Remove `column` from `table`. See
/// [`ColumnMigrator::drop_column`](tablekeep_core::store::ColumnMigrator::drop_column).
pub fn drop_column(conn: &Connection, table: &str, column: &str) -> Result<DropOutcome> {
  let schema = catalog::table_schema(conn, table)?
    .ok_or_else(|| CoreError::TableNotFound(table.to_string()))?;

  let noop = || DropOutcome::NoOp { table: schema.name.clone(), column: column.to_string() };

  if !schema.has_column(column) {
    info!(table = %schema.name, column, "column already absent; nothing to do");
    return Ok(noop());
  }

  let dependents = catalog::dependents(conn, &schema.name)?;
  let backup_table = catalog::unique_name(conn, &backup_table_name(&schema.name, Utc::now()))?;
  let Some(plan) = MigrationPlan::new(&schema, column, &dependents, backup_table)? else {
    return Ok(noop());
  };

  info!(
    table = %plan.table_name,
    column = %plan.column_to_drop,
    backup = %plan.backup_table,
    "dropping column"
  );

  let warnings = with_relaxed_schema_checks(conn, |conn| run_steps(conn, &plan.steps()))?;

  let after = catalog::table_schema(conn, &plan.table_name)?.ok_or_else(|| CoreError::Step {
    step:    "verify".to_string(),
    message: format!("table {} is missing after the swap", plan.table_name),
  })?;
  verify_dropped(&after, &plan.column_to_drop)?;

  let (recreated_indexes, skipped_indexes): (Vec<String>, Vec<String>) = plan
    .surviving_indexes
    .iter()
    .map(|i| i.name.clone())
    .partition(|name| after.indexes.iter().any(|i| &i.name == name));

  let (recreated_triggers, skipped_triggers): (Vec<String>, Vec<String>) = plan
    .surviving_triggers
    .iter()
    .map(|t| t.name.clone())
    .partition(|name| after.triggers.iter().any(|t| &t.name == name));

  let report = DropReport {
    table:             plan.table_name.clone(),
    column:            plan.column_to_drop.clone(),
    backup_table:      plan.backup_table.clone(),
    rows_copied:       catalog::row_count(conn, &plan.table_name)?,
    recreated_indexes,
    dropped_indexes:   plan.dropped_indexes.iter().map(|i| i.name.clone()).collect(),
    skipped_indexes,
    recreated_triggers,
    skipped_triggers,
    warnings,
  };

  info!(
    table = %report.table,
    column = %report.column,
    rows = report.rows_copied,
    "column dropped"
  );
  Ok(DropOutcome::Dropped(report))
}

/// Run steps in order. A failing required step aborts with an error naming
/// it; failing best-effort steps are logged and returned as warnings.
pub fn run_steps(conn: &Connection, steps: &[Step]) -> Result<Vec<String>> {
  let mut warnings = Vec::new();

  for step in steps {
    match execute(conn, step) {
      Ok(()) => info!(step = %step.label, "step done"),
      Err(e) if step.required => {
        warn!(step = %step.label, error = %e, "required step failed; aborting");
        return Err(e);
      }
      Err(e) => {
        warn!(step = %step.label, error = %e, "best-effort step failed; continuing");
        warnings.push(e.to_string());
      }
    }
  }

  Ok(warnings)
}

fn execute(conn: &Connection, step: &Step) -> Result<()> {
  let failed = |message: String| CoreError::Step { step: step.label.clone(), message };

  match &step.action {
    StepAction::Sql(sql) => conn.execute_batch(sql).map_err(|e| failed(e.to_string()))?,
    StepAction::MatchRowCounts { source, target } => {
      let count = |table: &str| catalog::row_count(conn, table).map_err(|e| failed(e.to_string()));
      let (expected, actual) = (count(source.as_str())?, count(target.as_str())?);
      if expected != actual {
        return Err(failed(format!("{source} has {expected} rows but {target} has {actual}")).into());
      }
    }
  }
  Ok(())
}

/// Run `f` with foreign-key enforcement off and legacy rename semantics on,
/// so renaming the original table out of the way does not rewrite references
/// held by other tables, views or triggers. Both settings are put back
/// whatever `f` returns.
fn with_relaxed_schema_checks<T>(
  conn: &Connection,
  f:    impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let foreign_keys: bool = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
  let legacy_alter: bool = conn.query_row("PRAGMA legacy_alter_table", [], |r| r.get(0))?;

  conn.execute_batch("PRAGMA foreign_keys = OFF; PRAGMA legacy_alter_table = ON;")?;
  let result = f(conn);

  let reset = format!(
    "PRAGMA foreign_keys = {}; PRAGMA legacy_alter_table = {};",
    if foreign_keys { "ON" } else { "OFF" },
    if legacy_alter { "ON" } else { "OFF" },
  );
  if let Err(e) = conn.execute_batch(&reset) {
    warn!(error = %e, "failed to restore connection pragmas");
  }

  result
}
