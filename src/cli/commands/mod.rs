//! Command implementations.

pub mod ask;
pub mod completions;
pub mod import;
pub mod init;
pub mod oracle;
pub mod phases;
pub mod project;
pub mod run;
pub mod version;

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::model::ResultEnvelope;
use crate::storage::SqliteStorage;
use colored::Colorize;
use std::path::PathBuf;

/// Open the existing database, failing with `NotInitialized` if absent.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }

    SqliteStorage::open(&db_path)
}

/// Runtime for the async oracle calls.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Print an answer: the envelope as JSON, or its message followed by data.
pub(crate) fn print_envelope(envelope: &ResultEnvelope, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(envelope)?);
        return Ok(());
    }

    if envelope.success {
        println!("{} {}", "✓".green(), envelope.message.bold());
    } else {
        println!("{} {}", "✗".red(), envelope.message.bold());
    }

    if let Some(data) = envelope.data.as_ref().filter(|d| !d.is_null()) {
        println!();
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    if let Some(chart) = &envelope.chart {
        println!();
        println!("{}", "Chart".cyan().bold());
        println!("{chart}");
    }

    Ok(())
}
