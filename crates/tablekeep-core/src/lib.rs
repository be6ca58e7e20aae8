//! Core types and trait definitions for tablekeep.
//!
//! This crate is free of HTTP and database dependencies: it holds the
//! structured schema model, column-drop plans and their step model, snapshot
//! records, and the pure rules for naming and shaping restored tables.

pub mod backup;
pub mod ddl;
pub mod error;
pub mod ident;
pub mod plan;
pub mod schema;
pub mod store;

pub use error::{AsCoreError, Error, Result};
