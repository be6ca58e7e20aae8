//! HTTP surface for tablekeep.
//!
//! Two routers, each backed by a store trait from `tablekeep-core`:
//!
//! - [`backups_router`]: the `/migration-backups` JSON API over any
//!   [`SnapshotStore`].
//! - [`migrations_router`]: plain-text `/migrations/{name}` endpoints that
//!   run column drops registered in configuration, over any
//!   [`ColumnMigrator`].
//!
//! Authentication is the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = Router::new()
//!   .nest("/admin", tablekeep_api::backups_router(store.clone()))
//!   .merge(tablekeep_api::migrations_router(store, registry));
//! ```

pub mod backups;
pub mod error;
pub mod migrations;

use std::sync::Arc;

use axum::{
  Router,
  routing::{any, get, post},
};
use tablekeep_core::{
  AsCoreError,
  store::{ColumnMigrator, SnapshotStore},
};

pub use error::ApiError;
pub use migrations::{ColumnDrop, MigrationState};

/// Build the snapshot API router for `store`.
pub fn backups_router<S>(store: Arc<S>) -> Router<()>
where
  S: SnapshotStore + 'static,
  S::Error: AsCoreError,
{
  Router::new()
    .route(
      "/migration-backups",
      get(backups::list::<S>).post(backups::capture::<S>),
    )
    .route("/migration-backups/{id}", get(backups::get_one::<S>))
    .route("/migration-backups/{id}/restore", post(backups::restore::<S>))
    .with_state(store)
}

/// Build the migration-trigger router. Only names present in `registry`
/// are runnable.
pub fn migrations_router<S>(store: Arc<S>, registry: Vec<ColumnDrop>) -> Router<()>
where
  S: ColumnMigrator + 'static,
{
  Router::new()
    .route("/migrations/{name}", any(migrations::run::<S>))
    .with_state(MigrationState { store, registry: Arc::new(registry) })
}
