//! `sq phases <ref>`: aggregated phase progress of one project.

use super::open_storage;
use super::project::find_project;
use crate::error::Result;
use crate::model::WorkStatus;
use crate::progress::{load_phase_info, PhaseInfo};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct PhasesOutput<'a> {
    project_id: &'a str,
    project_name: &'a str,
    #[serde(flatten)]
    info: &'a PhaseInfo,
}

/// Execute the phases command.
///
/// # Errors
///
/// Returns an error if the database is missing or the project cannot be
/// found.
pub fn execute(reference: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let project = find_project(&storage, reference)?;
    let info = load_phase_info(&storage, &project.id);

    if json {
        let output = PhasesOutput {
            project_id: &project.id,
            project_name: &project.name,
            info: &info,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!(
        "{} {}",
        project.name.bold(),
        format!("({:.0}% overall)", info.overall_progress).dimmed()
    );
    if info.phases.is_empty() {
        println!("  No phases recorded.");
        return Ok(());
    }

    let current = info.current_phase.as_ref().map(|c| c.id.as_str());
    for phase in &info.phases {
        let marker = if Some(phase.id.as_str()) == current { "▶".yellow() } else { " ".normal() };
        println!(
            "{marker} {:<24} {:<10} {:>5.0}%",
            phase.name,
            status_label(&phase.status),
            phase.progress
        );
        for sub in &phase.subphases {
            println!(
                "    {:<22} {:<10} {:>5.0}%  ({}/{} tasks)",
                sub.name,
                status_label(&sub.status),
                sub.progress,
                sub.completed_tasks,
                sub.task_count
            );
        }
    }

    if let Some(current) = &info.current_phase {
        println!();
        match &current.current_subphase {
            Some(sub) => println!("Currently on {} / {}", current.name.bold(), sub.name),
            None => println!("Currently on {}", current.name.bold()),
        }
        if !current.incomplete_tasks.is_empty() {
            println!("Open tasks:");
            for task in &current.incomplete_tasks {
                println!("  • {}", task.name);
            }
        }
    }

    Ok(())
}

fn status_label(status: &WorkStatus) -> colored::ColoredString {
    match status {
        WorkStatus::Completed => status.as_str().green(),
        WorkStatus::Progress => status.as_str().yellow(),
        WorkStatus::Review => status.as_str().cyan(),
        WorkStatus::Todo | WorkStatus::Other(_) => status.as_str().normal(),
    }
}
