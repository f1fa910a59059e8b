//! Per-project records outside the phase hierarchy.

use serde::{Deserialize, Serialize};

/// Budget for a single project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub project_id: String,
    pub total_budget: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Budget {
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total_budget - self.spent
    }

    /// Share of the budget already spent, 0 when there is no budget.
    #[must_use]
    pub fn percent_used(&self) -> f64 {
        if self.total_budget > 0.0 {
            self.spent / self.total_budget * 100.0
        } else {
            0.0
        }
    }
}

/// A project-level task (punch list, coordination items).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTask {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub target_date: Option<String>,
    pub completion_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIssue {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub priority: Option<String>,
    pub reported_date: Option<String>,
    pub resolved_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub doc_type: Option<String>,
    pub url: Option<String>,
    pub uploaded_at: Option<String>,
}

/// A user or lead referenced by a project's team roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Person {
    /// "First Last", or `None` when both parts are blank.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() { None } else { Some(name) }
    }
}
