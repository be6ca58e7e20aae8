//! SQLite backend for tablekeep.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The migration and snapshot
//! logic itself is synchronous and takes the connection explicitly.

mod backup;
mod catalog;
mod encode;
mod migrate;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::BACKUPS_TABLE;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
