//! Status normalization and fuzzy name suggestions.
//!
//! Users type statuses loosely ("wip", "done", "active"). Three-tier
//! resolution: exact match → synonym lookup → error with suggestion.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::model::ProjectStatus;

// ── Project status ───────────────────────────────────────────

/// Statuses counted as "active": anything not yet completed.
pub const ACTIVE_PROJECT_STATUSES: [ProjectStatus; 3] = [
    ProjectStatus::InProgress,
    ProjectStatus::Planning,
    ProjectStatus::NotStarted,
];

pub static PROJECT_STATUS_SYNONYMS: LazyLock<HashMap<&str, ProjectStatus>> = LazyLock::new(|| {
    [
        ("done", ProjectStatus::Completed),
        ("complete", ProjectStatus::Completed),
        ("finished", ProjectStatus::Completed),
        ("closed", ProjectStatus::Completed),
        ("todo", ProjectStatus::NotStarted),
        ("pending", ProjectStatus::NotStarted),
        ("new", ProjectStatus::NotStarted),
        ("not_started", ProjectStatus::NotStarted),
        ("wip", ProjectStatus::InProgress),
        ("progress", ProjectStatus::InProgress),
        ("in_progress", ProjectStatus::InProgress),
        ("started", ProjectStatus::InProgress),
        ("underway", ProjectStatus::InProgress),
        ("design", ProjectStatus::Planning),
        ("planned", ProjectStatus::Planning),
    ]
    .into_iter()
    .collect()
});

/// Normalize a project status filter into the set of statuses it admits.
///
/// `active` expands to every status short of completed.
///
/// # Errors
///
/// Returns the original input and an optional suggestion when the value
/// is not recognised.
pub fn normalize_project_status(
    input: &str,
) -> Result<Vec<ProjectStatus>, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if lower == "active" {
        return Ok(ACTIVE_PROJECT_STATUSES.to_vec());
    }

    // Tier 1: exact match on the display form
    if let Some(status) = ProjectStatus::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(&lower))
    {
        return Ok(vec![status]);
    }

    // Tier 2: synonym lookup
    let key = lower.replace([' ', '-'], "_");
    if let Some(&status) = PROJECT_STATUS_SYNONYMS.get(key.as_str()) {
        return Ok(vec![status]);
    }

    // Tier 3: closest suggestion
    let candidates = ProjectStatus::ALL
        .iter()
        .map(|s| s.as_str().to_lowercase())
        .chain(std::iter::once("active".to_string()))
        .chain(PROJECT_STATUS_SYNONYMS.keys().map(|k| (*k).to_string()))
        .collect::<Vec<_>>();
    let suggestion = find_similar_names(&lower, &candidates, 1).into_iter().next();
    Err((input.to_string(), suggestion))
}

// ── Selection status ─────────────────────────────────────────

pub static SELECTION_STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("open", "Open"),
        ("pending", "Open"),
        ("todo", "Open"),
        ("not started", "Open"),
        ("in progress", "In Progress"),
        ("active", "In Progress"),
        ("progress", "In Progress"),
        ("under review", "Under Review"),
        ("review", "Under Review"),
        ("completed", "Completed"),
        ("complete", "Completed"),
        ("done", "Completed"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a selection status filter.
///
/// Returns `None` for `all`, meaning no status filter. Unrecognised
/// values are kept as typed and simply match nothing.
#[must_use]
pub fn normalize_selection_status(input: &str) -> Option<String> {
    let lower = input.trim().to_lowercase();
    if lower == "all" || lower == "any" {
        return None;
    }
    Some(
        SELECTION_STATUS_SYNONYMS
            .get(lower.as_str())
            .map_or_else(|| input.trim().to_string(), |s| (*s).to_string()),
    )
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find names close to `searched`, ignoring case.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
pub fn find_similar_names(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let searched = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(&searched, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    candidates.dedup_by(|a, b| a.1 == b.1);

    candidates
        .into_iter()
        .take(max)
        .map(|(_, name)| name.to_string())
        .collect()
}
