//! SQLite storage layer for SiteQuery.
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Read queries and the transactional write entry point
//! - [`import`] - JSON fixture import

pub mod import;
pub mod schema;
pub mod sqlite;

pub use import::{Fixture, ImportStats, import_file, import_fixture, read_fixture};
pub use sqlite::SqliteStorage;
