//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tablekeep_core::AsCoreError;
use thiserror::Error;

/// An error returned by a JSON API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The store failed; `context` is the message shown to the client and the
  /// source's text goes into the `error` field.
  #[error("{context}: {source}")]
  Store {
    context: &'static str,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error, surfacing an invalid snapshot query as a 400
  /// instead of a 500.
  pub fn store<E>(context: &'static str, err: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    if let Some(tablekeep_core::Error::InvalidQuery(q)) = err.as_core() {
      return ApiError::BadRequest(format!("query is not read-only: {q}"));
    }
    ApiError::Store { context, source: Box::new(err) }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": m })))
          .into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "message": m })))
          .into_response()
      }
      ApiError::Store { context, source } => {
        tracing::error!("{context}: {source}");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({
            "success": false,
            "message": context,
            "error":   source.to_string(),
          })),
        )
          .into_response()
      }
    }
  }
}
