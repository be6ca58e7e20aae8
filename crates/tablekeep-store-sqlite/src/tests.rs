//! Integration tests for `SqliteStore` against an in-memory database.

use tablekeep_core::{
  AsCoreError as _, Error as CoreError,
  backup::{ListQuery, RAW_JSON_COLUMN, RestoreOptions, RestoreOutcome},
  plan::DropOutcome,
  store::{ColumnMigrator, SnapshotStore},
};

use crate::{Error, SqliteStore, schema::BACKUPS_DDL};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
  values.iter().map(|v| v.map(str::to_owned)).collect()
}

async fn seed_orders(s: &SqliteStore) {
  s.execute_batch(
    "CREATE TABLE orders (id TEXT PRIMARY KEY, name TEXT, order_status TEXT);
     CREATE INDEX idx_status ON orders(order_status);
     INSERT INTO orders VALUES ('1', 'Alice', 'shipped');",
  )
  .await
  .unwrap();
}

async fn column_names(s: &SqliteStore, table: &str) -> Vec<String> {
  s.table_schema(table).await.unwrap().expect("table exists").column_names()
}

async fn index_names(s: &SqliteStore, table: &str) -> Vec<String> {
  s.table_schema(table)
    .await
    .unwrap()
    .expect("table exists")
    .indexes
    .into_iter()
    .map(|i| i.name)
    .collect()
}

/// Insert a catalog row with a hand-written payload; returns its id.
async fn insert_backup(s: &SqliteStore, source: &str, payload: &str) -> i64 {
  s.execute_batch(format!(
    "{BACKUPS_DDL}
     INSERT INTO migration_backups (created_at, source_table, rows_count, data_json)
     VALUES ('2026-01-01T00:00:00+00:00', '{source}', 0, '{}');",
    payload.replace('\'', "''"),
  ))
  .await
  .unwrap();
  s.list_backups(&ListQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap()[0]
    .id
}

async fn restore(s: &SqliteStore, id: i64, target: Option<&str>, dry_run: bool) -> RestoreOutcome {
  s.restore_backup(id, RestoreOptions { target_table: target.map(str::to_owned), dry_run })
    .await
    .unwrap()
    .expect("backup exists")
}

// ─── Column drop ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn drop_column_orders_scenario() {
  let s = store().await;
  seed_orders(&s).await;

  let outcome = s.drop_column("orders", "order_status").await.unwrap();
  let DropOutcome::Dropped(report) = outcome else {
    panic!("expected a drop, got {outcome:?}");
  };
  assert_eq!(report.rows_copied, 1);
  assert_eq!(report.dropped_indexes, ["idx_status"]);

  assert_eq!(column_names(&s, "orders").await, ["id", "name"]);
  assert_eq!(s.dump_table("orders").await.unwrap(), vec![cells(&[Some("1"), Some("Alice")])]);
  assert!(index_names(&s, "orders").await.is_empty());

  let again = s.drop_column("orders", "order_status").await.unwrap();
  assert!(again.is_noop());
}

#[tokio::test]
async fn drop_column_twice_matches_once() {
  let s = store().await;
  seed_orders(&s).await;

  s.drop_column("orders", "name").await.unwrap();
  let schema_once = s.table_schema("orders").await.unwrap();
  let rows_once = s.dump_table("orders").await.unwrap();
  let tables_once = s.table_names().await.unwrap();

  let second = s.drop_column("orders", "name").await.unwrap();
  assert!(matches!(second, DropOutcome::NoOp { .. }));
  assert_eq!(s.table_schema("orders").await.unwrap(), schema_once);
  assert_eq!(s.dump_table("orders").await.unwrap(), rows_once);
  assert_eq!(s.table_names().await.unwrap(), tables_once);
}

#[tokio::test]
async fn drop_column_preserves_other_values() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE items (sku TEXT, qty INTEGER, price REAL, note TEXT, legacy TEXT);
     INSERT INTO items VALUES ('a', 1, 2.5, NULL, 'x');
     INSERT INTO items VALUES ('b', NULL, 10.0, 'fragile', 'y');
     INSERT INTO items VALUES ('c', 3, NULL, '', NULL);",
  )
  .await
  .unwrap();

  s.drop_column("items", "legacy").await.unwrap();

  assert_eq!(s.dump_table("items").await.unwrap(), vec![
    cells(&[Some("a"), Some("1"), Some("2.5"), None]),
    cells(&[Some("b"), None, Some("10"), Some("fragile")]),
    cells(&[Some("c"), Some("3"), None, Some("")]),
  ]);
}

#[tokio::test]
async fn independent_indexes_survive() {
  let s = store().await;
  seed_orders(&s).await;
  s.execute_batch(
    "CREATE UNIQUE INDEX idx_name ON orders(name);
     CREATE INDEX idx_open ON orders(id) WHERE order_status <> 'done';",
  )
  .await
  .unwrap();

  let DropOutcome::Dropped(report) = s.drop_column("orders", "order_status").await.unwrap() else {
    panic!("expected a drop");
  };
  assert_eq!(report.recreated_indexes, ["idx_name"]);
  assert!(report.skipped_indexes.is_empty());

  let schema = s.table_schema("orders").await.unwrap().unwrap();
  assert_eq!(schema.indexes.len(), 1);
  assert_eq!(schema.indexes[0].name, "idx_name");
  assert_eq!(schema.indexes[0].defining_statement, "CREATE UNIQUE INDEX idx_name ON orders(name)");

  // Still enforced on the rebuilt table.
  let dup = s.execute_batch("INSERT INTO orders VALUES ('2', 'Alice')").await;
  assert!(dup.is_err());
}

#[tokio::test]
async fn original_table_kept_under_backup_name() {
  let s = store().await;
  seed_orders(&s).await;

  let DropOutcome::Dropped(report) = s.drop_column("orders", "order_status").await.unwrap() else {
    panic!("expected a drop");
  };
  assert!(report.backup_table.starts_with("orders_backup_"), "{}", report.backup_table);
  assert_eq!(
    s.dump_table(&report.backup_table).await.unwrap(),
    vec![cells(&[Some("1"), Some("Alice"), Some("shipped")])]
  );
  assert!(!s.table_names().await.unwrap().contains(&"orders__shadow".to_string()));
}

#[tokio::test]
async fn constraints_are_regenerated() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE accounts (
       id      INTEGER PRIMARY KEY AUTOINCREMENT,
       email   TEXT NOT NULL UNIQUE,
       plan    TEXT NOT NULL DEFAULT 'free',
       created TEXT DEFAULT (datetime('now')),
       legacy  TEXT
     );
     INSERT INTO accounts (email, legacy) VALUES ('a@example.com', 'x');",
  )
  .await
  .unwrap();

  s.drop_column("accounts", "legacy").await.unwrap();

  let schema = s.table_schema("accounts").await.unwrap().unwrap();
  assert!(schema.autoincrement);
  assert_eq!(schema.unique_constraints.len(), 1);
  let plan = schema.column("plan").unwrap();
  assert!(plan.not_null);
  assert_eq!(plan.default_value.as_deref(), Some("'free'"));

  s.execute_batch("INSERT INTO accounts (email) VALUES ('b@example.com')").await.unwrap();
  let rows = s.dump_table("accounts").await.unwrap();
  assert_eq!(rows[1][0].as_deref(), Some("2"));
  assert_eq!(rows[1][2].as_deref(), Some("free"));
  assert!(rows[1][3].is_some());

  assert!(s.execute_batch("INSERT INTO accounts (email) VALUES ('a@example.com')").await.is_err());
  assert!(s.execute_batch("INSERT INTO accounts (email, plan) VALUES ('c@x', NULL)").await.is_err());
}

#[tokio::test]
async fn composite_primary_key_is_kept() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE pairs (a TEXT, b TEXT, extra TEXT, PRIMARY KEY (a, b));
     INSERT INTO pairs VALUES ('x', 'y', 'z');",
  )
  .await
  .unwrap();

  s.drop_column("pairs", "extra").await.unwrap();

  let schema = s.table_schema("pairs").await.unwrap().unwrap();
  let pk: Vec<_> = schema.columns.iter().map(|c| c.primary_key_position).collect();
  assert_eq!(pk, [1, 2]);
  assert!(s.execute_batch("INSERT INTO pairs VALUES ('x', 'y')").await.is_err());
}

#[tokio::test]
async fn foreign_keys_in_other_tables_keep_pointing_at_original_name() {
  let s = store().await;
  seed_orders(&s).await;
  s.execute_batch(
    "CREATE TABLE lines (id INTEGER PRIMARY KEY, order_id TEXT REFERENCES orders(id));
     INSERT INTO lines (order_id) VALUES ('1');",
  )
  .await
  .unwrap();

  s.drop_column("orders", "order_status").await.unwrap();

  let lines = s.table_schema("lines").await.unwrap().unwrap();
  assert_eq!(lines.foreign_keys.len(), 1);
  assert_eq!(lines.foreign_keys[0].parent_table, "orders");

  // Enforcement is back on after the migration.
  assert!(s.execute_batch("INSERT INTO lines (order_id) VALUES ('missing')").await.is_err());
  s.execute_batch("INSERT INTO lines (order_id) VALUES ('1')").await.unwrap();
}

#[tokio::test]
async fn stray_shadow_table_is_replaced() {
  let s = store().await;
  seed_orders(&s).await;
  s.execute_batch("CREATE TABLE orders__shadow (junk TEXT); INSERT INTO orders__shadow VALUES ('j');")
    .await
    .unwrap();

  s.drop_column("orders", "order_status").await.unwrap();

  assert_eq!(column_names(&s, "orders").await, ["id", "name"]);
  assert!(!s.table_names().await.unwrap().contains(&"orders__shadow".to_string()));
}

#[tokio::test]
async fn views_on_dropped_column_are_removed() {
  let s = store().await;
  seed_orders(&s).await;
  s.execute_batch(
    "CREATE VIEW shipped AS SELECT id FROM orders WHERE order_status = 'shipped';
     CREATE VIEW names AS SELECT name FROM orders;",
  )
  .await
  .unwrap();

  s.drop_column("orders", "order_status").await.unwrap();

  let views = s.dump_table("sqlite_master").await.unwrap();
  let view_names: Vec<_> = views
    .iter()
    .filter(|row| row[0].as_deref() == Some("view"))
    .filter_map(|row| row[1].clone())
    .collect();
  assert_eq!(view_names, ["names"]);
}

#[tokio::test]
async fn missing_table_is_a_schema_error() {
  let s = store().await;
  let err = s.drop_column("nope", "x").await.unwrap_err();
  let core = err.as_core().expect("core error");
  assert!(matches!(core, CoreError::TableNotFound(t) if t == "nope"));
  assert!(core.is_schema_error());
}

#[tokio::test]
async fn dropping_last_column_is_rejected() {
  let s = store().await;
  s.execute_batch("CREATE TABLE solo (only_col TEXT)").await.unwrap();
  let err = s.drop_column("solo", "only_col").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::LastColumn { .. })));
  assert_eq!(column_names(&s, "solo").await, ["only_col"]);
}

#[tokio::test]
async fn table_lookup_is_case_insensitive() {
  let s = store().await;
  seed_orders(&s).await;
  let outcome = s.drop_column("ORDERS", "Order_Status").await.unwrap();
  let DropOutcome::Dropped(report) = outcome else { panic!("expected a drop") };
  assert_eq!(report.table, "orders");
  assert_eq!(report.column, "order_status");
}

#[tokio::test]
async fn dropping_a_key_member_removes_the_key() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE pairs (a TEXT, b TEXT, extra TEXT, PRIMARY KEY (a, b));
     INSERT INTO pairs VALUES ('x', '1', 'p');
     INSERT INTO pairs VALUES ('x', '2', 'q');
     CREATE TABLE ranks (n INTEGER, k TEXT, v TEXT, PRIMARY KEY (n, k));
     INSERT INTO ranks VALUES (1, 'a', 'x');
     INSERT INTO ranks VALUES (1, 'b', 'y');",
  )
  .await
  .unwrap();

  let DropOutcome::Dropped(report) = s.drop_column("pairs", "b").await.unwrap() else {
    panic!("expected a drop");
  };
  assert_eq!(report.rows_copied, 2);
  let schema = s.table_schema("pairs").await.unwrap().unwrap();
  assert!(schema.columns.iter().all(|c| c.primary_key_position == 0));
  assert_eq!(s.dump_table("pairs").await.unwrap(), vec![
    cells(&[Some("x"), Some("p")]),
    cells(&[Some("x"), Some("q")]),
  ]);

  // `n` must not turn into a rowid alias, which would reject the repeated 1.
  s.drop_column("ranks", "k").await.unwrap();
  assert_eq!(s.dump_table("ranks").await.unwrap(), vec![
    cells(&[Some("1"), Some("x")]),
    cells(&[Some("1"), Some("y")]),
  ]);
  s.execute_batch("INSERT INTO ranks VALUES (1, 'z')").await.unwrap();
}

#[tokio::test]
async fn without_rowid_tables_stay_without_rowid() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT, legacy TEXT) WITHOUT ROWID;
     INSERT INTO kv VALUES ('a', '1', 'x');",
  )
  .await
  .unwrap();

  let err = s.drop_column("kv", "k").await.unwrap_err();
  let core = err.as_core().expect("core error");
  assert!(matches!(core, CoreError::Unsupported { table, .. } if table == "kv"), "{core}");
  assert!(core.is_schema_error());
  assert_eq!(column_names(&s, "kv").await, ["k", "v", "legacy"]);

  s.drop_column("kv", "legacy").await.unwrap();
  let schema = s.table_schema("kv").await.unwrap().unwrap();
  assert!(schema.is_without_rowid());
  assert_eq!(schema.column_names(), ["k", "v"]);
  assert_eq!(s.capture_backup("kv", None).await.unwrap().row_count, 1);
  assert!(s.execute_batch("INSERT INTO kv VALUES ('a', '2')").await.is_err());
}

#[tokio::test]
async fn collation_and_column_checks_are_enforced_after_drop() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE items (sku TEXT COLLATE NOCASE UNIQUE, price REAL CHECK(price>0), legacy);
     INSERT INTO items VALUES ('ABC', 1.0, 'x');",
  )
  .await
  .unwrap();

  s.drop_column("items", "legacy").await.unwrap();

  let schema = s.table_schema("items").await.unwrap().unwrap();
  assert_eq!(schema.column("sku").unwrap().collation.as_deref(), Some("NOCASE"));
  assert_eq!(schema.column("price").unwrap().checks, ["CHECK(price>0)"]);

  assert!(s.execute_batch("INSERT INTO items VALUES ('abc', 2.0)").await.is_err());
  assert!(s.execute_batch("INSERT INTO items VALUES ('xyz', -1.0)").await.is_err());
  s.execute_batch("INSERT INTO items VALUES ('xyz', 3.0)").await.unwrap();
}

#[tokio::test]
async fn table_checks_on_the_dropped_column_go_with_it() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE spans (
       lo INTEGER,
       hi INTEGER,
       legacy INTEGER,
       CHECK (lo < hi),
       CONSTRAINT positive_legacy CHECK (legacy IS NULL OR legacy > 0)
     );
     INSERT INTO spans VALUES (1, 2, 5);",
  )
  .await
  .unwrap();

  s.drop_column("spans", "legacy").await.unwrap();

  let schema = s.table_schema("spans").await.unwrap().unwrap();
  assert_eq!(schema.checks, ["CHECK (lo < hi)"]);
  assert!(s.execute_batch("INSERT INTO spans VALUES (3, 1)").await.is_err());
  s.execute_batch("INSERT INTO spans VALUES (1, 3)").await.unwrap();
}

#[tokio::test]
async fn generated_columns_keep_computing() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE t (a, b GENERATED ALWAYS AS (a*2), legacy);
     INSERT INTO t (a, legacy) VALUES (3, 'x');",
  )
  .await
  .unwrap();

  let DropOutcome::Dropped(report) = s.drop_column("t", "legacy").await.unwrap() else {
    panic!("expected a drop");
  };
  assert_eq!(report.rows_copied, 1);

  let schema = s.table_schema("t").await.unwrap().unwrap();
  let b = schema.column("b").unwrap().generated.clone().expect("still generated");
  assert_eq!(b.expression, "a*2");
  assert!(!b.stored);

  s.execute_batch("INSERT INTO t (a) VALUES (5)").await.unwrap();
  assert_eq!(s.dump_table("t").await.unwrap(), vec![
    cells(&[Some("3"), Some("6")]),
    cells(&[Some("5"), Some("10")]),
  ]);
}

#[tokio::test]
async fn generated_column_source_is_refused() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE t (a, b GENERATED ALWAYS AS (a*2) STORED, c);
     INSERT INTO t (a, c) VALUES (3, 'x');",
  )
  .await
  .unwrap();

  let err = s.drop_column("t", "a").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Unsupported { .. })), "{err}");
  assert_eq!(column_names(&s, "t").await, ["a", "b", "c"]);
  assert_eq!(s.table_names().await.unwrap().iter().filter(|t| t.starts_with("t_")).count(), 0);

  // Dropping the generated column itself is fine.
  s.drop_column("t", "b").await.unwrap();
  assert_eq!(s.dump_table("t").await.unwrap(), vec![cells(&[Some("3"), Some("x")])]);
}

#[tokio::test]
async fn triggers_on_the_table_keep_firing() {
  let s = store().await;
  seed_orders(&s).await;
  s.execute_batch(
    "CREATE TABLE audit (what TEXT);
     CREATE TRIGGER orders_audit AFTER INSERT ON orders
     BEGIN INSERT INTO audit VALUES ('new ' || new.id); END;
     CREATE TRIGGER orders_status AFTER UPDATE OF order_status ON orders
     BEGIN INSERT INTO audit VALUES ('status'); END;",
  )
  .await
  .unwrap();

  let DropOutcome::Dropped(report) = s.drop_column("orders", "order_status").await.unwrap() else {
    panic!("expected a drop");
  };
  assert_eq!(report.recreated_triggers, ["orders_audit"]);
  assert!(report.skipped_triggers.is_empty());

  let schema = s.table_schema("orders").await.unwrap().unwrap();
  assert_eq!(schema.triggers.len(), 1);
  assert_eq!(schema.triggers[0].name, "orders_audit");
  let backup = s.table_schema(&report.backup_table).await.unwrap().unwrap();
  assert!(backup.triggers.is_empty());

  s.execute_batch("INSERT INTO orders VALUES ('2', 'Bob')").await.unwrap();
  assert_eq!(s.dump_table("audit").await.unwrap(), vec![cells(&[Some("new 2")])]);
}

#[tokio::test]
async fn column_named_autoincrement_is_not_the_keyword() {
  let s = store().await;
  s.execute_batch(
    "CREATE TABLE notes (id INTEGER PRIMARY KEY, \"autoincrement\" TEXT, body TEXT);
     INSERT INTO notes VALUES (1, 'a', 'b');",
  )
  .await
  .unwrap();
  assert!(!s.table_schema("notes").await.unwrap().unwrap().autoincrement);

  s.drop_column("notes", "body").await.unwrap();

  let schema = s.table_schema("notes").await.unwrap().unwrap();
  assert!(!schema.autoincrement);
  assert_eq!(schema.column_names(), ["id", "autoincrement"]);
  let catalog = s.dump_table("sqlite_master").await.unwrap();
  assert!(!catalog.iter().any(|row| row[1].as_deref() == Some("sqlite_sequence")));
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_on_fresh_store_is_empty() {
  let s = store().await;
  let list = s.list_backups(&ListQuery { limit: Some(1), ..Default::default() }).await.unwrap();
  assert!(list.is_empty());
  assert!(s.get_backup(1, true).await.unwrap().is_none());
  assert!(s.restore_backup(1, RestoreOptions::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn capture_list_and_get() {
  let s = store().await;
  seed_orders(&s).await;

  let first = s.capture_backup("orders", None).await.unwrap();
  assert_eq!(first.row_count, 1);
  let second = s
    .capture_backup("shipped", Some("SELECT id, name FROM orders WHERE order_status = 'shipped'"))
    .await
    .unwrap();

  let all = s.list_backups(&ListQuery::default()).await.unwrap();
  assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), [second.id, first.id]);

  let filtered = s
    .list_backups(&ListQuery { source_table: Some("orders".into()), limit: None })
    .await
    .unwrap();
  assert_eq!(filtered, vec![first.clone()]);

  let bare = s.get_backup(first.id, false).await.unwrap().unwrap();
  assert!(bare.data_json.is_none());

  let full = s.get_backup(first.id, true).await.unwrap().unwrap();
  let rows: serde_json::Value = serde_json::from_str(full.data_json.as_deref().unwrap()).unwrap();
  assert_eq!(
    rows,
    serde_json::json!([{"id": "1", "name": "Alice", "order_status": "shipped"}])
  );
}

#[tokio::test]
async fn rows_with_sqlite_timestamps_still_list() {
  let s = store().await;
  s.execute_batch(format!(
    "{BACKUPS_DDL}
     INSERT INTO migration_backups (created_at, source_table, rows_count, data_json)
     VALUES ('2026-01-01 00:00:00', 'orders', 0, '[]');"
  ))
  .await
  .unwrap();

  let list = s.list_backups(&ListQuery::default()).await.unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].created_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
  let record = s.get_backup(list[0].id, false).await.unwrap().unwrap();
  assert_eq!(record.created_at, list[0].created_at);
}

#[tokio::test]
async fn capture_rejects_writes() {
  let s = store().await;
  seed_orders(&s).await;
  let err = s.capture_backup("orders", Some("DELETE FROM orders")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidQuery(_))));
  assert_eq!(s.dump_table("orders").await.unwrap().len(), 1);
}

#[tokio::test]
async fn restore_materializes_union_of_keys() {
  let s = store().await;
  let id = insert_backup(&s, "orders", r#"[{"a":1,"b":"x"},{"a":2,"c":true}]"#).await;

  let RestoreOutcome::Restored(report) = restore(&s, id, None, false).await else {
    panic!("expected a restore");
  };
  assert_eq!(report.target_table, format!("restored_orders_{id}"));
  assert_eq!(report.rows_inserted, 2);

  assert_eq!(column_names(&s, &report.target_table).await, ["a", "b", "c"]);
  assert_eq!(s.dump_table(&report.target_table).await.unwrap(), vec![
    cells(&[Some("1"), Some("x"), None]),
    cells(&[Some("2"), None, Some("true")]),
  ]);
}

#[tokio::test]
async fn restore_scalars_into_raw_json_column() {
  let s = store().await;
  let id = insert_backup(&s, "numbers", r#"[1, 2, "three"]"#).await;

  let RestoreOutcome::Restored(report) = restore(&s, id, None, false).await else {
    panic!("expected a restore");
  };
  assert_eq!(column_names(&s, &report.target_table).await, [RAW_JSON_COLUMN]);
  assert_eq!(s.dump_table(&report.target_table).await.unwrap(), vec![
    cells(&[Some("1")]),
    cells(&[Some("2")]),
    cells(&[Some("\"three\"")]),
  ]);
}

#[tokio::test]
async fn restore_never_overwrites_existing_table() {
  let s = store().await;
  seed_orders(&s).await;
  let before = s.dump_table("orders").await.unwrap();
  let id = insert_backup(&s, "orders", r#"[{"id":"9","name":"Zed"}]"#).await;

  let RestoreOutcome::Restored(report) = restore(&s, id, Some("orders"), false).await else {
    panic!("expected a restore");
  };
  assert_eq!(report.target_table, "orders_v2");
  assert_eq!(s.dump_table("orders").await.unwrap(), before);

  let RestoreOutcome::Restored(again) = restore(&s, id, Some("Orders"), false).await else {
    panic!("expected a restore");
  };
  assert_eq!(again.target_table, "orders_v3");
}

#[tokio::test]
async fn dry_run_creates_nothing() {
  let s = store().await;
  let id = insert_backup(&s, "orders", r#"[{"a":1},{"b":2}]"#).await;
  let tables_before = s.table_names().await.unwrap();

  let RestoreOutcome::Preview(preview) = restore(&s, id, Some("Preview Me"), true).await else {
    panic!("expected a preview");
  };
  assert_eq!(preview.target_table, "preview_me");
  assert_eq!(preview.source_table, "orders");
  assert_eq!(preview.row_count, 2);
  assert_eq!(preview.column_count, 2);
  assert_eq!(preview.columns, ["a", "b"]);

  assert_eq!(s.table_names().await.unwrap(), tables_before);
}

#[tokio::test]
async fn corrupt_payload_fails_restore() {
  let s = store().await;
  let id = insert_backup(&s, "orders", "[{not json").await;
  let tables_before = s.table_names().await.unwrap();

  let err = s.restore_backup(id, RestoreOptions::default()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::CorruptData { .. })));
  assert_eq!(s.table_names().await.unwrap(), tables_before);
}

#[tokio::test]
async fn non_array_payload_restores_empty_table() {
  let s = store().await;
  let id = insert_backup(&s, "odd", r#"{"a":1}"#).await;

  let RestoreOutcome::Restored(report) = restore(&s, id, None, false).await else {
    panic!("expected a restore");
  };
  assert_eq!(report.rows_inserted, 0);
  assert_eq!(column_names(&s, &report.target_table).await, [RAW_JSON_COLUMN]);
}

#[tokio::test]
async fn captured_snapshot_restores_next_to_source() {
  let s = store().await;
  seed_orders(&s).await;
  let summary = s.capture_backup("orders", None).await.unwrap();
  s.drop_column("orders", "order_status").await.unwrap();

  let RestoreOutcome::Restored(report) = restore(&s, summary.id, None, false).await else {
    panic!("expected a restore");
  };
  assert_eq!(column_names(&s, &report.target_table).await, ["id", "name", "order_status"]);
  assert_eq!(
    s.dump_table(&report.target_table).await.unwrap(),
    vec![cells(&[Some("1"), Some("Alice"), Some("shipped")])]
  );
}
