//! Project model and its work breakdown.
//!
//! A project owns an ordered list of phases; each phase owns an ordered
//! list of subphases; each subphase owns its tasks. Progress and the
//! "current" phase are derived (see [`crate::progress`]), never stored.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::WorkStatus;

/// A construction project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (UUID format for imported data)
    pub id: String,

    /// Display name, usually the project code (e.g. "CABOT-1B")
    pub name: String,

    /// Start date (ISO `YYYY-MM-DD`)
    pub start_date: Option<String>,

    /// Completion percentage maintained by the scheduling system
    #[serde(default)]
    pub percent_complete: f64,

    pub designer_id: Option<String>,
    pub junior_designer_id: Option<String>,
    pub developer_id: Option<String>,
    pub client_id: Option<String>,

    #[serde(default)]
    pub warranty_mode: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Project {
    /// Status derived from the completion percentage.
    #[must_use]
    pub fn status(&self) -> ProjectStatus {
        ProjectStatus::from_percent(self.percent_complete)
    }
}

/// Project-level status, derived from `percent_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    Planning,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [Self; 4] = [
        Self::NotStarted,
        Self::Planning,
        Self::InProgress,
        Self::Completed,
    ];

    /// 0 → Not Started, under 25 → Planning, under 100 → In Progress.
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        if percent <= 0.0 {
            Self::NotStarted
        } else if percent < 25.0 {
            Self::Planning
        } else if percent < 100.0 {
            Self::InProgress
        } else {
            Self::Completed
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Planning => "Planning",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase of a project (e.g. "Design", "Construction").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub status: WorkStatus,
    /// Position within the project; defines the sequence
    pub order: i64,
    pub start_date: Option<String>,
    pub target_end_date: Option<String>,
    pub actual_end_date: Option<String>,
}

/// A subphase within a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subphase {
    pub id: String,
    pub phase_id: String,
    pub name: String,
    pub status: WorkStatus,
    pub order: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A task belonging to a subphase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTask {
    pub id: String,
    pub subphase_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: WorkStatus,
    pub due_date: Option<String>,
    pub completion_date: Option<String>,
    pub assigned_to: Option<String>,
}

/// A subphase together with its owning phase and project.
///
/// Returned by keyword searches over subphase names, which is how
/// selections, walkthroughs, purchase orders and payment milestones
/// are tracked.
#[derive(Debug, Clone, Serialize)]
pub struct SubphaseMatch {
    pub subphase: Subphase,
    pub phase_name: String,
    pub phase_order: i64,
    pub project_id: String,
    pub project_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_percent() {
        assert_eq!(ProjectStatus::from_percent(0.0), ProjectStatus::NotStarted);
        assert_eq!(ProjectStatus::from_percent(10.0), ProjectStatus::Planning);
        assert_eq!(ProjectStatus::from_percent(25.0), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::from_percent(99.9), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::from_percent(100.0), ProjectStatus::Completed);
    }

    #[test]
    fn test_status_serializes_with_spaces() {
        let json = serde_json::to_string(&ProjectStatus::NotStarted).unwrap();
        assert_eq!(json, "\"Not Started\"");
    }
}
