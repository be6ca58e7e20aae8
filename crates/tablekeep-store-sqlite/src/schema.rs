//! SQL owned by the store itself.

/// Connection setup, executed once when a store is opened.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Name of the snapshot catalog table.
pub const BACKUPS_TABLE: &str = "migration_backups";

/// Snapshot catalog; created lazily on the first capture so that an
/// untouched database reports an empty catalog instead of an error.
///
/// Rows are never updated or deleted by the store.
pub const BACKUPS_DDL: &str = "
CREATE TABLE IF NOT EXISTS migration_backups (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at   TEXT    NOT NULL,   -- RFC 3339 UTC
    source_table TEXT    NOT NULL,   -- free-text label, not a foreign key
    rows_count   INTEGER NOT NULL,
    data_json    TEXT    NOT NULL    -- JSON array of row objects
);

CREATE INDEX IF NOT EXISTS migration_backups_source_idx
    ON migration_backups(source_table);
";
