//! Project browsing commands.
//!
//! - `sq project list` - List projects, most recently updated first
//! - `sq project show <ref>` - Show project details

use super::{open_storage, print_envelope};
use crate::cli::ProjectCommands;
use crate::dispatch::{resolve_project, similar_project_names, Dispatcher};
use crate::error::{Error, Result};
use crate::model::{Intent, Project, ProjectStatus, QueryAnalysis};
use crate::storage::SqliteStorage;
use crate::validate::normalize_project_status;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ProjectOutput {
    id: String,
    name: String,
    status: ProjectStatus,
    percent_complete: f64,
    start_date: Option<String>,
    updated_at: String,
}

impl From<Project> for ProjectOutput {
    fn from(p: Project) -> Self {
        Self {
            status: p.status(),
            id: p.id,
            name: p.name,
            percent_complete: p.percent_complete,
            start_date: p.start_date,
            updated_at: format_timestamp(p.updated_at),
        }
    }
}

#[derive(Serialize)]
struct ProjectListOutput {
    projects: Vec<ProjectOutput>,
    count: usize,
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts).map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the database is missing, the status filter is
/// invalid, or the project cannot be found.
pub fn execute(command: &ProjectCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;

    match command {
        ProjectCommands::List { status, limit } => execute_list(&storage, status.as_deref(), *limit, json),
        ProjectCommands::Show { reference } => execute_show(&storage, reference, json),
    }
}

fn execute_list(storage: &SqliteStorage, status: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let wanted = status
        .map(|s| {
            normalize_project_status(s).map_err(|(input, suggestion)| {
                let hint = suggestion.map(|s| format!(" (did you mean: {s}?)")).unwrap_or_default();
                Error::InvalidArgument(format!("Invalid project status '{input}'{hint}"))
            })
        })
        .transpose()?;

    let projects: Vec<ProjectOutput> = storage
        .list_projects(None)?
        .into_iter()
        .filter(|p| wanted.as_ref().is_none_or(|w| w.contains(&p.status())))
        .take(limit)
        .map(ProjectOutput::from)
        .collect();

    if json {
        let output = ProjectListOutput {
            count: projects.len(),
            projects,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("{:<12} {:<24} {:<12} {:>8}", "ID", "NAME", "STATUS", "DONE");
    for p in &projects {
        println!(
            "{:<12} {:<24} {:<12} {:>7.0}%",
            truncate(&p.id, 12),
            truncate(&p.name, 24),
            p.status.as_str(),
            p.percent_complete
        );
    }
    println!();
    println!("{} projects", projects.len());
    Ok(())
}

fn execute_show(storage: &SqliteStorage, reference: &str, json: bool) -> Result<()> {
    let project = find_project(storage, reference)?;
    let analysis = QueryAnalysis::new(Intent::ProjectDetails).with_filter("project_id", project.id);
    let envelope = Dispatcher::new(storage).execute(&analysis);
    print_envelope(&envelope, json)
}

/// Resolve a reference or fail with suggestions.
pub(crate) fn find_project(storage: &SqliteStorage, reference: &str) -> Result<Project> {
    if let Some(project) = resolve_project(storage, reference)? {
        return Ok(project);
    }

    let similar = similar_project_names(storage, reference)?;
    if similar.is_empty() {
        Err(Error::ProjectNotFound {
            id: reference.to_string(),
        })
    } else {
        Err(Error::ProjectNotFoundSimilar {
            id: reference.to_string(),
            similar,
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::fixtures::seeded_storage;

    #[test]
    fn test_find_project_suggests_similar() {
        let storage = seeded_storage();
        assert_eq!(find_project(&storage, "cabot-1b").unwrap().id, "CABOT-1B");

        let err = find_project(&storage, "JAIN-2C").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFoundSimilar { ref similar, .. } if similar.contains(&"JAIN-1B".to_string())));

        let err = find_project(&storage, "ZZZZ-9Z").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound { .. }));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("CABOT-1B", 12), "CABOT-1B");
        assert_eq!(truncate("A very long project name", 6), "A ver…");
    }
}
