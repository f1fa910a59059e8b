//! Load a JSON project fixture into the database.

use super::open_storage;
use crate::error::Result;
use crate::storage::import_file;
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the database is missing or the fixture is invalid.
pub fn execute(file: &Path, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let stats = import_file(&mut storage, file)?;
    info!(file = %file.display(), projects = stats.projects, "Imported fixture");

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("Imported {}", file.display());
        println!("  Projects:    {}", stats.projects);
        println!("  Phases:      {}", stats.phases);
        println!("  Subphases:   {}", stats.subphases);
        println!("  Phase tasks: {}", stats.phase_tasks);
        println!("  People:      {}", stats.people);
        println!("  Records:     {}", stats.records);
    }

    Ok(())
}
