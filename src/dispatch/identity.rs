//! Project identity resolution.
//!
//! Turns whatever the user typed ("CABOT-1B", "cabot-1b", "Cabot", a
//! UUID) into one canonical project:
//!
//! 1. exact ID
//! 2. exact name, ignoring case
//! 3. for ID-shaped input, the ID again in canonical case
//! 4. partial name, most recently updated first
//!
//! Nothing found is `Ok(None)`; only storage failures are errors.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::Result;
use crate::intent::literal_regex;
use crate::model::Project;
use crate::storage::SqliteStorage;
use crate::validate::find_similar_names;

/// Project codes such as `CABOT-1B`.
static CODE_SHAPE: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"^[A-Za-z]+-[0-9A-Za-z]+$"));

/// Longer identifiers are treated as opaque IDs.
const ID_LENGTH_THRESHOLD: usize = 30;

const MAX_SUGGESTIONS: usize = 3;

/// Resolve a user-supplied project reference.
///
/// # Errors
///
/// Returns an error if a storage query fails.
pub fn resolve_project(storage: &SqliteStorage, identifier: &str) -> Result<Option<Project>> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(None);
    }

    if let Some(project) = storage.get_project(identifier)? {
        debug!(identifier, "Resolved project by ID");
        return Ok(Some(project));
    }

    if let Some(project) = storage.get_project_by_name(identifier)? {
        debug!(identifier, project_id = %project.id, "Resolved project by name");
        return Ok(Some(project));
    }

    if let Some(canonical) = canonical_id(identifier) {
        if canonical != identifier {
            if let Some(project) = storage.get_project(&canonical)? {
                debug!(identifier, project_id = %project.id, "Resolved project by canonical ID");
                return Ok(Some(project));
            }
        }
    }

    let project = storage.find_project_by_partial_name(identifier)?;
    if let Some(p) = &project {
        debug!(identifier, project_id = %p.id, "Resolved project by partial name");
    }
    Ok(project)
}

/// Existing project names close to `identifier`.
///
/// # Errors
///
/// Returns an error if listing project names fails.
pub fn similar_project_names(storage: &SqliteStorage, identifier: &str) -> Result<Vec<String>> {
    let names = storage.list_project_names()?;
    Ok(find_similar_names(identifier.trim(), &names, MAX_SUGGESTIONS))
}

/// Canonical-case form of an ID-shaped identifier, if it is one.
///
/// UUIDs are stored lower case, project codes upper case.
fn canonical_id(identifier: &str) -> Option<String> {
    if uuid::Uuid::parse_str(identifier).is_ok() {
        return Some(identifier.to_lowercase());
    }
    if CODE_SHAPE.is_match(identifier) {
        return Some(identifier.to_uppercase());
    }
    (identifier.len() > ID_LENGTH_THRESHOLD).then(|| identifier.to_lowercase())
}
