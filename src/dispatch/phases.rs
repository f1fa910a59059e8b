//! Current phase and pending work.

use serde::Serialize;

use super::{count_noun, Dispatcher};
use crate::error::Result;
use crate::model::{PhaseTask, QueryAnalysis, ResultEnvelope};
use crate::progress::{load_phase_info, PhaseInfo};

#[derive(Debug, Serialize)]
struct PhaseStatus {
    project_id: String,
    project_name: String,
    #[serde(flatten)]
    phase_info: PhaseInfo,
}

#[derive(Debug, Serialize)]
struct PendingTasks {
    phase: String,
    subphase: Option<String>,
    pending_tasks: Vec<PhaseTask>,
}

pub(super) fn project_phase_status(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.require_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let phase_info = load_phase_info(d.storage(), &project.id);
    let message = match &phase_info.current_phase {
        Some(phase) => match &phase.current_subphase {
            Some(sub) => format!(
                "{} is in the {} phase ({:.0}% complete), currently on {}",
                project.name, phase.name, phase.progress, sub.name
            ),
            None => format!(
                "{} is in the {} phase ({:.0}% complete)",
                project.name, phase.name, phase.progress
            ),
        },
        None if phase_info.phase_count == 0 => format!("No phases recorded for project '{}'", project.name),
        None => format!("No phase of project '{}' is in progress", project.name),
    };

    let status = PhaseStatus {
        project_id: project.id,
        project_name: project.name,
        phase_info,
    };
    Ok(ResultEnvelope::from_data(&status, message))
}

pub(super) fn phase_pending_tasks(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.require_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let Some(current) = load_phase_info(d.storage(), &project.id).current_phase else {
        return Ok(ResultEnvelope::fail(format!(
            "No active phase found for project '{}'",
            project.name
        )));
    };

    let message = format!(
        "{} pending in the {} phase of '{}'",
        count_noun(current.incomplete_tasks.len(), "task"),
        current.name,
        project.name
    );
    let pending = PendingTasks {
        phase: current.name,
        subphase: current.current_subphase.map(|s| s.name),
        pending_tasks: current.incomplete_tasks,
    };
    Ok(ResultEnvelope::from_data(&pending, message))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::seeded_storage;
    use super::*;
    use crate::model::Intent;
    use crate::storage::SqliteStorage;

    #[test]
    fn test_phase_status_reports_current_phase() {
        let storage = seeded_storage();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::ProjectPhaseStatus).with_filter("project_id", "CABOT-1B"),
        );
        assert!(env.success);
        let data = env.data.unwrap();
        assert_eq!(data["current_phase"]["name"], "Construction");
        assert_eq!(data["current_phase"]["current_subphase"]["name"], "Plumbing");
        assert_eq!(data["phase_count"], 3);
        assert!(env.message.contains("currently on Plumbing"));
    }

    #[test]
    fn test_pending_tasks_of_current_subphase() {
        let storage = seeded_storage();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::PhasePendingTasks).with_filter("project_name", "CABOT-1B"),
        );
        assert!(env.success);
        let data = env.data.unwrap();
        assert_eq!(data["phase"], "Construction");
        assert_eq!(data["subphase"], "Plumbing");
        let names: Vec<&str> = data["pending_tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Fixtures", "Inspection"]);
    }

    #[test]
    fn test_no_active_phase() {
        let storage = seeded_storage();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::PhasePendingTasks).with_filter("project_id", "CABOT-1A"),
        );
        assert!(!env.success);
        assert_eq!(env.message, "No active phase found for project 'CABOT-1A'");
    }

    #[test]
    fn test_project_without_phases() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p', 'MCKIERNAN-1B', 0, 0)",
                [],
            )
            .unwrap();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::ProjectPhaseStatus).with_filter("project_id", "MCKIERNAN-1B"),
        );
        assert!(env.success);
        assert_eq!(env.message, "No phases recorded for project 'MCKIERNAN-1B'");
        assert!(env.data.unwrap()["current_phase"].is_null());
    }
}
