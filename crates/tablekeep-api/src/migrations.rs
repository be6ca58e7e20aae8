//! `ANY /migrations/{name}`: run a registered column-drop migration.
//!
//! Responses are `text/plain`, meant for a one-click admin button: `OPTIONS`
//! answers the CORS preflight, every other method runs the migration
//! synchronously.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{HeaderValue, Method, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tablekeep_core::store::ColumnMigrator;

/// A named column drop, as registered in configuration:
///
/// ```toml
/// [[migrations]]
/// name   = "drop-order-status"
/// table  = "orders"
/// column = "order_status"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnDrop {
  pub name:   String,
  pub table:  String,
  pub column: String,
}

/// Shared state for the migration router.
pub struct MigrationState<S> {
  pub store:    Arc<S>,
  pub registry: Arc<Vec<ColumnDrop>>,
}

impl<S> Clone for MigrationState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), registry: self.registry.clone() }
  }
}

impl<S> MigrationState<S> {
  fn lookup(&self, name: &str) -> Option<&ColumnDrop> {
    self.registry.iter().find(|m| m.name == name)
  }
}

pub fn preflight() -> Response {
  (
    StatusCode::NO_CONTENT,
    [
      (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
      (
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
      ),
      (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
      ),
      (header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400")),
    ],
  )
    .into_response()
}

fn plain(status: StatusCode, body: String) -> Response {
  let cors = [(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))];
  (status, cors, body).into_response()
}

pub async fn run<S>(
  State(state): State<MigrationState<S>>,
  Path(name): Path<String>,
  method: Method,
) -> Response
where
  S: ColumnMigrator,
{
  if method == Method::OPTIONS {
    return preflight();
  }

  let Some(migration) = state.lookup(&name) else {
    return plain(StatusCode::NOT_FOUND, format!("Unknown migration: {name}"));
  };

  tracing::info!(
    migration = %migration.name,
    table = %migration.table,
    column = %migration.column,
    "running column drop"
  );

  match state.store.drop_column(&migration.table, &migration.column).await {
    Ok(outcome) => plain(StatusCode::OK, outcome.message()),
    Err(e) => {
      tracing::error!(migration = %migration.name, "migration failed: {e}");
      plain(StatusCode::INTERNAL_SERVER_ERROR, format!("Migration failed: {e}"))
    }
  }
}
