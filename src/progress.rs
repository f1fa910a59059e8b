//! Phase-progress aggregation.
//!
//! Rolls task status up into subphase, phase and project progress, and
//! picks the phase, subphase and tasks the project is currently on.
//!
//! - Subphase: share of completed tasks, or its status weight when it has
//!   no tasks.
//! - Phase: unweighted mean of its subphases, or its status weight when it
//!   has none.
//! - Overall: unweighted mean of the phases. A phase with two subphases
//!   counts as much as one with twenty.

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::model::{Phase, PhaseTask, Subphase, WorkStatus};
use crate::storage::SqliteStorage;

/// A phase with its subphases and their tasks, as loaded from storage.
#[derive(Debug, Clone)]
pub struct PhaseTree {
    pub phase: Phase,
    pub subphases: Vec<(Subphase, Vec<PhaseTask>)>,
}

/// Aggregated progress of a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseInfo {
    pub phases: Vec<PhaseSummary>,
    pub current_phase: Option<CurrentPhase>,
    pub overall_progress: f64,
    pub phase_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub id: String,
    pub name: String,
    pub status: WorkStatus,
    pub order: i64,
    pub start_date: Option<String>,
    pub target_end_date: Option<String>,
    pub actual_end_date: Option<String>,
    pub progress: f64,
    pub subphases: Vec<SubphaseSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubphaseSummary {
    pub id: String,
    pub name: String,
    pub status: WorkStatus,
    pub order: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub progress: f64,
    pub task_count: usize,
    pub completed_tasks: usize,
    pub tasks: Vec<PhaseTask>,
}

/// The subphase being worked on within the current phase.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubphase {
    pub id: String,
    pub name: String,
    pub status: WorkStatus,
    pub progress: f64,
}

/// The phase with status `Progress`.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentPhase {
    pub id: String,
    pub name: String,
    pub order: i64,
    pub progress: f64,
    pub current_subphase: Option<CurrentSubphase>,
    /// Tasks of the current subphase that are not completed.
    pub incomplete_tasks: Vec<PhaseTask>,
}

impl PhaseInfo {
    /// Name of the current phase, if any.
    #[must_use]
    pub fn current_phase_name(&self) -> Option<&str> {
        self.current_phase.as_ref().map(|p| p.name.as_str())
    }
}

/// Load a project's phase tree, phases and subphases in `order`.
///
/// # Errors
///
/// Returns an error if any query fails.
pub fn load_phase_tree(storage: &SqliteStorage, project_id: &str) -> Result<Vec<PhaseTree>> {
    storage
        .get_phases(project_id)?
        .into_iter()
        .map(|phase| {
            let subphases = storage
                .get_subphases(&phase.id)?
                .into_iter()
                .map(|sub| {
                    let tasks = storage.get_phase_tasks(&sub.id)?;
                    Ok((sub, tasks))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(PhaseTree { phase, subphases })
        })
        .collect()
}

/// Load and aggregate. A storage failure yields an empty [`PhaseInfo`].
#[must_use]
pub fn load_phase_info(storage: &SqliteStorage, project_id: &str) -> PhaseInfo {
    match load_phase_tree(storage, project_id) {
        Ok(tree) => aggregate(&tree),
        Err(e) => {
            warn!(project_id, error = %e, "Failed to load phases, reporting no progress");
            PhaseInfo::default()
        }
    }
}

/// Aggregate a phase tree. `tree` must already be in phase order.
#[must_use]
pub fn aggregate(tree: &[PhaseTree]) -> PhaseInfo {
    let phases: Vec<PhaseSummary> = tree.iter().map(summarize_phase).collect();

    let overall_progress = mean(phases.iter().map(|p| p.progress)).unwrap_or(0.0);
    let current_phase = select_current_phase(&phases);

    PhaseInfo {
        phase_count: phases.len(),
        phases,
        current_phase,
        overall_progress,
    }
}

fn summarize_phase(node: &PhaseTree) -> PhaseSummary {
    let subphases: Vec<SubphaseSummary> = node
        .subphases
        .iter()
        .map(|(sub, tasks)| summarize_subphase(sub, tasks))
        .collect();

    let progress = mean(subphases.iter().map(|s| s.progress))
        .unwrap_or_else(|| node.phase.status.progress_weight());

    let phase = &node.phase;
    PhaseSummary {
        id: phase.id.clone(),
        name: phase.name.clone(),
        status: phase.status.clone(),
        order: phase.order,
        start_date: phase.start_date.clone(),
        target_end_date: phase.target_end_date.clone(),
        actual_end_date: phase.actual_end_date.clone(),
        progress,
        subphases,
    }
}

fn summarize_subphase(sub: &Subphase, tasks: &[PhaseTask]) -> SubphaseSummary {
    let completed_tasks = tasks.iter().filter(|t| t.status.is_completed()).count();
    #[allow(clippy::cast_precision_loss)]
    let progress = if tasks.is_empty() {
        sub.status.progress_weight()
    } else {
        completed_tasks as f64 / tasks.len() as f64 * 100.0
    };

    SubphaseSummary {
        id: sub.id.clone(),
        name: sub.name.clone(),
        status: sub.status.clone(),
        order: sub.order,
        start_date: sub.start_date.clone(),
        end_date: sub.end_date.clone(),
        progress,
        task_count: tasks.len(),
        completed_tasks,
        tasks: tasks.to_vec(),
    }
}

/// First `Progress` phase in order. Further ones are logged and ignored.
fn select_current_phase(phases: &[PhaseSummary]) -> Option<CurrentPhase> {
    let mut in_progress = phases.iter().filter(|p| p.status == WorkStatus::Progress);
    let phase = in_progress.next()?;

    let others: Vec<&str> = in_progress.map(|p| p.name.as_str()).collect();
    if !others.is_empty() {
        warn!(
            selected = %phase.name,
            ignored = ?others,
            "Several phases are in progress, using the first in order"
        );
    }

    let subphase = phase
        .subphases
        .iter()
        .find(|s| s.status == WorkStatus::Progress)
        .or_else(|| phase.subphases.iter().find(|s| s.status == WorkStatus::Todo));

    Some(CurrentPhase {
        id: phase.id.clone(),
        name: phase.name.clone(),
        order: phase.order,
        progress: phase.progress,
        current_subphase: subphase.map(|s| CurrentSubphase {
            id: s.id.clone(),
            name: s.name.clone(),
            status: s.status.clone(),
            progress: s.progress,
        }),
        incomplete_tasks: subphase
            .map(|s| {
                s.tasks
                    .iter()
                    .filter(|t| !t.status.is_completed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
