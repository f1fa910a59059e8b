//! Configuration management.
//!
//! This module resolves SiteQuery's on-disk locations and loads the user
//! configuration file.
//!
//! # Layout
//!
//! - **Database**: `~/.sitequery/data/sitequery.db`
//! - **Config**: `~/.sitequery/config.json`
//! - **Conversation cache**: `~/.sitequery/conversations/<id>.json`

mod context_cache;

pub use context_cache::{clear_context, read_context, write_context};

use crate::error::{Error, Result};
use crate::oracle::OracleSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// SiteQuery configuration file structure.
///
/// Stored at `~/.sitequery/config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteQueryConfig {
    /// Classification oracle settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleSettings>,

    /// Project codes recognised in questions, in addition to the built-in list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub project_codes: Vec<String>,
}

/// Get the global SiteQuery directory location (`~/.sitequery/`).
#[must_use]
pub fn global_sitequery_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".sitequery"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `SQ_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("SQ_TEST_DB")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Get the test database path (`~/.sitequery/test/sitequery.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_sitequery_dir().map(|dir| dir.join("test").join("sitequery.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` / `SQ_DB`), use it directly
/// 2. `SQ_TEST_DB` environment variable → uses test database
/// 3. `SITEQUERY_DB` environment variable
/// 4. Global location: `~/.sitequery/data/sitequery.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("SITEQUERY_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_sitequery_dir().map(|dir| dir.join("data").join("sitequery.db"))
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    global_sitequery_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load the configuration file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<SiteQueryConfig> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(SiteQueryConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the configuration file.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config(config: &SiteQueryConfig) -> Result<()> {
    let path = config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(&path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

/// Extra project codes from the config file; empty when unavailable.
#[must_use]
pub fn configured_project_codes() -> Vec<String> {
    load_config().map(|c| c.project_codes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_defaults_to_global() {
        let result = resolve_db_path(None);
        assert!(result.is_some());
        assert!(result.unwrap().ends_with("sitequery.db"));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_sitequery_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("test"));
        assert!(test.ends_with("sitequery.db"));
        assert_ne!(global.join("data").join("sitequery.db"), test);
    }

    #[test]
    fn test_config_round_trip_skips_empty_fields() {
        let config = SiteQueryConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, "{}");

        let parsed: SiteQueryConfig =
            serde_json::from_str(r#"{"project_codes": ["OAK-2A"]}"#).unwrap();
        assert_eq!(parsed.project_codes, vec!["OAK-2A".to_string()]);
        assert!(parsed.oracle.is_none());
    }
}
