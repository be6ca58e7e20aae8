//! Error types for `tablekeep-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  // ── Schema errors ─────────────────────────────────────────────────────

  #[error("table not found: {0}")]
  TableNotFound(String),

  #[error("cannot drop {column:?}: it is the only column of table {table:?}")]
  LastColumn { table: String, column: String },

  /// A required migration step was rejected by the store.
  #[error("step `{step}` failed: {message}")]
  Step { step: String, message: String },

  #[error("no free table name derived from {0:?}")]
  NameExhausted(String),

  /// The table uses a definition the rebuild cannot reproduce faithfully.
  #[error("cannot rebuild table {table:?}: {reason}")]
  Unsupported { table: String, reason: String },

  // ── Integrity ─────────────────────────────────────────────────────────

  /// Post-migration verification found the column still in place.
  #[error("column {column:?} is still present on {table:?} after the migration")]
  Integrity { table: String, column: String },

  // ── Backups ───────────────────────────────────────────────────────────

  #[error("backup not found: {0}")]
  BackupNotFound(i64),

  #[error("backup {id} has a corrupt payload: {message}")]
  CorruptData { id: i64, message: String },

  #[error("query is not read-only: {0}")]
  InvalidQuery(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// `true` for errors that belong to the schema family (missing table,
  /// rejected DDL/DML, invalid identifiers).
  pub fn is_schema_error(&self) -> bool {
    matches!(
      self,
      Error::TableNotFound(_)
        | Error::LastColumn { .. }
        | Error::Step { .. }
        | Error::NameExhausted(_)
        | Error::Unsupported { .. }
    )
  }
}

/// Lets layers above a backend find the core error wrapped inside the
/// backend's own error type.
pub trait AsCoreError {
  fn as_core(&self) -> Option<&Error>;
}

impl AsCoreError for Error {
  fn as_core(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
