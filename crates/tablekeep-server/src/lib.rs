//! Server wiring for tablekeep: configuration and the combined router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tablekeep_api::ColumnDrop;
use tablekeep_core::{
  AsCoreError,
  store::{ColumnMigrator, SnapshotStore},
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `tablekeep.toml` layered with
/// `TABLEKEEP_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  /// A leading `~/` is expanded against `$HOME`.
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
  /// Column drops runnable over `/migrations/{name}`.
  #[serde(default)]
  pub migrations:    Vec<ColumnDrop>,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8787 }
fn default_database_path() -> PathBuf { PathBuf::from("tablekeep.db") }

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TABLEKEEP").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn database_path(&self) -> PathBuf { expand_tilde(&self.database_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The served application: snapshot API plus registered migrations, with
/// request tracing.
pub fn router<S>(store: Arc<S>, migrations: Vec<ColumnDrop>) -> Router
where
  S: ColumnMigrator + SnapshotStore + 'static,
  <S as SnapshotStore>::Error: AsCoreError,
{
  tablekeep_api::backups_router(store.clone())
    .merge(tablekeep_api::migrations_router(store, migrations))
    .layer(TraceLayer::new_for_http())
}
