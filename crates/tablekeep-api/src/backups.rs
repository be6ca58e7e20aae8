//! Handlers for `/migration-backups` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/migration-backups` | Optional `source`, `limit` (default 50, max 500) |
//! | `POST` | `/migration-backups` | Body: [`CaptureBody`]; returns 201 + summary |
//! | `GET`  | `/migration-backups/{id}` | Optional `includeData=true` (or `1`) adds the payload |
//! | `POST` | `/migration-backups/{id}/restore` | `?dryRun`, optional body [`RestoreBody`] |
//!
//! Query parameters are taken as text and parsed here, so malformed values
//! get the same JSON 400 as every other client error.

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tablekeep_core::{
  AsCoreError,
  backup::{
    BackupRecord, BackupSummary, ListQuery, MAX_LIST_LIMIT, RestoreOptions,
    RestoreOutcome,
  },
  store::SnapshotStore,
};

use crate::error::ApiError;

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
  pub success: bool,
  pub data:    T,
}

impl<T> Success<T> {
  pub fn new(data: T) -> Json<Self> { Json(Self { success: true, data }) }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
  raw
    .trim()
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("Invalid backup id: {raw}")))
}

fn backup_not_found() -> ApiError { ApiError::NotFound("Backup not found".into()) }

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
  query
    .map(|Query(params)| params)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// `true`/`false`, `1`/`0`, `yes`/`no`; a bare `?flag` means `true`.
fn parse_flag(name: &str, raw: Option<&str>) -> Result<Option<bool>, ApiError> {
  let Some(raw) = raw else { return Ok(None) };
  match raw.trim().to_ascii_lowercase().as_str() {
    "" | "true" | "1" | "yes" => Ok(Some(true)),
    "false" | "0" | "no" => Ok(Some(false)),
    _ => Err(ApiError::BadRequest(format!("Invalid {name}: {raw}"))),
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Restrict to snapshots captured under this label.
  pub source: Option<String>,
  /// Clamped to `[1, 500]`.
  pub limit:  Option<String>,
}

/// `GET /migration-backups[?source=...][&limit=N]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Success<Vec<BackupSummary>>>, ApiError>
where
  S: SnapshotStore,
  S::Error: AsCoreError,
{
  let params = query_params(params)?;
  let limit = params
    .limit
    .filter(|l| !l.trim().is_empty())
    .map(|l| {
      l.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid limit: {l}")))
    })
    .transpose()?;

  let query = ListQuery {
    source_table: params.source.filter(|s| !s.is_empty()),
    limit:        limit.map(|l| l.clamp(1, i64::from(MAX_LIST_LIMIT)) as u32),
  };

  let backups = store
    .list_backups(&query)
    .await
    .map_err(|e| ApiError::store("Failed to list migration backups", e))?;

  Ok(Success::new(backups))
}

// ─── Capture ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureBody {
  /// Label stored with the snapshot, and the table read when `query` is
  /// absent.
  pub source_table: String,
  /// A read-only statement whose rows become the payload.
  pub query:        Option<String>,
}

/// `POST /migration-backups`
pub async fn capture<S>(
  State(store): State<Arc<S>>,
  body: Result<Json<CaptureBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Success<BackupSummary>>), ApiError>
where
  S: SnapshotStore,
  S::Error: AsCoreError,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  if body.source_table.trim().is_empty() {
    return Err(ApiError::BadRequest("sourceTable must not be empty".into()));
  }

  let summary = store
    .capture_backup(&body.source_table, body.query.as_deref())
    .await
    .map_err(|e| ApiError::store("Failed to capture migration backup", e))?;

  Ok((StatusCode::CREATED, Success::new(summary)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  #[serde(rename = "includeData")]
  pub include_data: Option<String>,
}

/// `GET /migration-backups/{id}[?includeData=true]`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  params: Result<Query<GetParams>, QueryRejection>,
) -> Result<Json<Success<BackupRecord>>, ApiError>
where
  S: SnapshotStore,
  S::Error: AsCoreError,
{
  let id = parse_id(&id)?;
  let params = query_params(params)?;
  let include_data =
    parse_flag("includeData", params.include_data.as_deref())?.unwrap_or(false);
  let record = store
    .get_backup(id, include_data)
    .await
    .map_err(|e| ApiError::store("Failed to load migration backup", e))?
    .ok_or_else(backup_not_found)?;

  Ok(Success::new(record))
}

// ─── Restore ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RestoreParams {
  #[serde(rename = "dryRun")]
  pub dry_run: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreBody {
  pub target_table: Option<String>,
  pub dry_run:      Option<bool>,
}

/// `POST /migration-backups/{id}/restore[?dryRun=true]`
///
/// The body is optional. A `dryRun` query parameter takes precedence over
/// the body's.
pub async fn restore<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  params: Result<Query<RestoreParams>, QueryRejection>,
  body: Bytes,
) -> Result<Response, ApiError>
where
  S: SnapshotStore,
  S::Error: AsCoreError,
{
  let id = parse_id(&id)?;
  let query_dry_run = parse_flag("dryRun", query_params(params)?.dry_run.as_deref())?;
  let body: RestoreBody = if body.iter().all(u8::is_ascii_whitespace) {
    RestoreBody::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
  };

  let options = RestoreOptions {
    target_table: body.target_table,
    dry_run:      query_dry_run.or(body.dry_run).unwrap_or(false),
  };

  let outcome = store
    .restore_backup(id, options)
    .await
    .map_err(|e| ApiError::store("Failed to restore migration backup", e))?
    .ok_or_else(backup_not_found)?;

  let response = match outcome {
    RestoreOutcome::Preview(preview) => Json(json!({
      "success":     true,
      "preview":     true,
      "targetTable": preview.target_table,
      "sourceTable": preview.source_table,
      "rowCount":    preview.row_count,
      "columnCount": preview.column_count,
      "columns":     preview.columns,
    }))
    .into_response(),
    RestoreOutcome::Restored(report) => Json(json!({
      "success": true,
      "message": format!(
        "Backup {} restored into {} ({} rows)",
        report.backup_id, report.target_table, report.rows_inserted
      ),
      "data":    report,
    }))
    .into_response(),
  };

  Ok(response)
}
