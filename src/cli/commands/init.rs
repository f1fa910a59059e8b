//! Create the SiteQuery database.
//!
//! The database lives at `~/.sitequery/data/sitequery.db` unless `--db`
//! or one of the database environment variables points elsewhere. The
//! schema is applied when the file is first opened.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    reinitialized: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the database already exists (without `force`) or
/// cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine database location".to_string()))?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if existed {
        fs::remove_file(&db_path)?;
    }

    SqliteStorage::open(&db_path)?;

    if json {
        let output = InitOutput {
            database: db_path,
            reinitialized: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized SiteQuery database");
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: load projects with 'sq import <file>'.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("nested").join("sq.db");

        execute(Some(&db), false, true).unwrap();
        assert!(db.exists());

        let storage = SqliteStorage::open(&db).unwrap();
        assert!(storage.list_projects(None).unwrap().is_empty());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("sq.db");

        assert!(execute(Some(&db), false, true).is_ok());
        let result = execute(Some(&db), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_init_force_recreates() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("sq.db");

        assert!(execute(Some(&db), false, true).is_ok());
        assert!(execute(Some(&db), true, true).is_ok());
    }
}
