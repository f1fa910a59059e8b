//! Fixture import.
//!
//! Loads a JSON document describing people and projects (with their
//! nested phases, subphases and tasks) into the database inside a single
//! transaction. Projects are upserted by ID and their children replaced,
//! so importing the same file twice is harmless. Missing IDs are generated; missing `order` values default
//! to the element's position.
//!
//! ```json
//! {
//!   "users": [{"id": "u1", "first_name": "Dana", "last_name": "Reyes"}],
//!   "projects": [{
//!     "name": "CABOT-1B",
//!     "percent_complete": 40,
//!     "phases": [{"name": "Design", "status": "Progress",
//!                 "subphases": [{"name": "Tile Selection", "status": "Todo"}]}],
//!     "budget": {"total_budget": 250000, "spent": 90000}
//!   }]
//! }
//! ```

use crate::error::{Error, Result};
use crate::model::WorkStatus;
use crate::storage::SqliteStorage;
use rusqlite::{Transaction, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Top-level fixture document.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<PersonFixture>,
    #[serde(default)]
    pub leads: Vec<PersonFixture>,
    #[serde(default)]
    pub projects: Vec<ProjectFixture>,
}

#[derive(Debug, Deserialize)]
pub struct PersonFixture {
    pub id: String,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "percentComplete")]
    pub percent_complete: f64,
    #[serde(default, alias = "designerId")]
    pub designer_id: Option<String>,
    #[serde(default, alias = "juniorDesignerId")]
    pub junior_designer_id: Option<String>,
    #[serde(default, alias = "developerId")]
    pub developer_id: Option<String>,
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
    #[serde(default, alias = "warrantyMode")]
    pub warranty_mode: bool,
    /// Unix milliseconds; defaults to import time
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub phases: Vec<PhaseFixture>,
    #[serde(default)]
    pub budget: Option<BudgetFixture>,
    #[serde(default)]
    pub tasks: Vec<TaskFixture>,
    #[serde(default)]
    pub milestones: Vec<MilestoneFixture>,
    #[serde(default)]
    pub issues: Vec<IssueFixture>,
    #[serde(default)]
    pub documents: Vec<DocumentFixture>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_status")]
    pub status: WorkStatus,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "targetEndDate")]
    pub target_end_date: Option<String>,
    #[serde(default, alias = "actualEndDate")]
    pub actual_end_date: Option<String>,
    #[serde(default)]
    pub subphases: Vec<SubphaseFixture>,
}

#[derive(Debug, Deserialize)]
pub struct SubphaseFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_status")]
    pub status: WorkStatus,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<PhaseTaskFixture>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseTaskFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: WorkStatus,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, alias = "completionDate")]
    pub completion_date: Option<String>,
    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BudgetFixture {
    #[serde(alias = "totalBudget")]
    pub total_budget: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default = "default_todo")]
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MilestoneFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default = "default_pending")]
    pub status: String,
    #[serde(default, alias = "targetDate")]
    pub target_date: Option<String>,
    #[serde(default, alias = "completionDate")]
    pub completion_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default = "default_open")]
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "reportedDate")]
    pub reported_date: Option<String>,
    #[serde(default, alias = "resolvedDate")]
    pub resolved_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentFixture {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "uploadedAt")]
    pub uploaded_at: Option<String>,
}

fn default_status() -> WorkStatus {
    WorkStatus::Todo
}

fn default_todo() -> String {
    "Todo".to_string()
}

fn default_pending() -> String {
    "Pending".to_string()
}

fn default_open() -> String {
    "Open".to_string()
}

/// Counts of rows written by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub people: usize,
    pub projects: usize,
    pub phases: usize,
    pub subphases: usize,
    pub phase_tasks: usize,
    pub records: usize,
}

/// Read and parse a fixture file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid fixture.
pub fn read_fixture(path: &Path) -> Result<Fixture> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        Error::InvalidArgument(format!("Invalid fixture {}: {e}", path.display()))
    })
}

/// Import a fixture file into storage.
///
/// # Errors
///
/// Returns an error if the file is invalid or any insert fails; nothing
/// is written in that case.
pub fn import_file(storage: &mut SqliteStorage, path: &Path) -> Result<ImportStats> {
    let fixture = read_fixture(path)?;
    import_fixture(storage, &fixture)
}

/// Import an already-parsed fixture in one transaction.
///
/// # Errors
///
/// Returns an error if any insert fails; nothing is written in that case.
pub fn import_fixture(storage: &mut SqliteStorage, fixture: &Fixture) -> Result<ImportStats> {
    let stats = storage.mutate("import_fixture", |tx| {
        let mut stats = ImportStats::default();
        let now = chrono::Utc::now().timestamp_millis();

        for person in &fixture.users {
            tx.execute(
                "INSERT OR REPLACE INTO users (id, first_name, last_name, email) VALUES (?1, ?2, ?3, ?4)",
                params![person.id, person.first_name, person.last_name, person.email],
            )?;
            stats.people += 1;
        }
        for person in &fixture.leads {
            tx.execute(
                "INSERT OR REPLACE INTO leads (id, first_name, last_name) VALUES (?1, ?2, ?3)",
                params![person.id, person.first_name, person.last_name],
            )?;
            stats.people += 1;
        }

        for project in &fixture.projects {
            insert_project(tx, project, now, &mut stats)?;
        }
        Ok(stats)
    })?;

    info!(
        projects = stats.projects,
        phases = stats.phases,
        subphases = stats.subphases,
        "fixture imported"
    );
    Ok(stats)
}

fn insert_project(
    tx: &Transaction,
    project: &ProjectFixture,
    now: i64,
    stats: &mut ImportStats,
) -> Result<()> {
    let project_id = project.id.clone().unwrap_or_else(new_id);
    let updated_at = project.updated_at.unwrap_or(now);
    tx.execute(
        "INSERT INTO projects (id, name, start_date, percent_complete, designer_id, junior_designer_id,
                               developer_id, client_id, warranty_mode, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            start_date = excluded.start_date,
            percent_complete = excluded.percent_complete,
            designer_id = excluded.designer_id,
            junior_designer_id = excluded.junior_designer_id,
            developer_id = excluded.developer_id,
            client_id = excluded.client_id,
            warranty_mode = excluded.warranty_mode,
            updated_at = excluded.updated_at",
        params![
            project_id,
            project.name,
            project.start_date,
            project.percent_complete,
            project.designer_id,
            project.junior_designer_id,
            project.developer_id,
            project.client_id,
            project.warranty_mode,
            updated_at,
        ],
    )?;
    stats.projects += 1;

    // Children are replaced wholesale; generated IDs would otherwise duplicate rows.
    for table in ["phases", "budgets", "tasks", "milestones", "issues", "documents"] {
        tx.execute(&format!("DELETE FROM {table} WHERE project_id = ?1"), [&project_id])?;
    }

    for (index, phase) in project.phases.iter().enumerate() {
        let phase_id = phase.id.clone().unwrap_or_else(new_id);
        tx.execute(
            "INSERT OR REPLACE INTO phases (id, project_id, name, status, \"order\", start_date, target_end_date, actual_end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                phase_id,
                project_id,
                phase.name,
                phase.status.as_str(),
                phase.order.unwrap_or_else(|| position(index)),
                phase.start_date,
                phase.target_end_date,
                phase.actual_end_date,
            ],
        )?;
        stats.phases += 1;

        for (index, subphase) in phase.subphases.iter().enumerate() {
            let subphase_id = subphase.id.clone().unwrap_or_else(new_id);
            tx.execute(
                "INSERT OR REPLACE INTO subphases (id, phase_id, name, status, \"order\", start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    subphase_id,
                    phase_id,
                    subphase.name,
                    subphase.status.as_str(),
                    subphase.order.unwrap_or_else(|| position(index)),
                    subphase.start_date,
                    subphase.end_date,
                ],
            )?;
            stats.subphases += 1;

            for task in &subphase.tasks {
                tx.execute(
                    "INSERT OR REPLACE INTO phase_tasks (id, subphase_id, name, description, status, due_date, completion_date, assigned_to)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        task.id.clone().unwrap_or_else(new_id),
                        subphase_id,
                        task.name,
                        task.description,
                        task.status.as_str(),
                        task.due_date,
                        task.completion_date,
                        task.assigned_to,
                    ],
                )?;
                stats.phase_tasks += 1;
            }
        }
    }

    if let Some(budget) = &project.budget {
        tx.execute(
            "INSERT OR REPLACE INTO budgets (project_id, total_budget, spent, currency) VALUES (?1, ?2, ?3, ?4)",
            params![
                project_id,
                budget.total_budget,
                budget.spent,
                budget.currency.as_deref().unwrap_or("USD"),
            ],
        )?;
        stats.records += 1;
    }

    for task in &project.tasks {
        tx.execute(
            "INSERT OR REPLACE INTO tasks (id, project_id, title, status, priority, due_date, assigned_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.clone().unwrap_or_else(new_id),
                project_id,
                task.title,
                task.status,
                task.priority,
                task.due_date,
                task.assigned_to,
            ],
        )?;
        stats.records += 1;
    }

    for milestone in &project.milestones {
        tx.execute(
            "INSERT OR REPLACE INTO milestones (id, project_id, title, status, target_date, completion_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                milestone.id.clone().unwrap_or_else(new_id),
                project_id,
                milestone.title,
                milestone.status,
                milestone.target_date,
                milestone.completion_date,
            ],
        )?;
        stats.records += 1;
    }

    for issue in &project.issues {
        tx.execute(
            "INSERT OR REPLACE INTO issues (id, project_id, title, status, priority, reported_date, resolved_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                issue.id.clone().unwrap_or_else(new_id),
                project_id,
                issue.title,
                issue.status,
                issue.priority,
                issue.reported_date,
                issue.resolved_date,
            ],
        )?;
        stats.records += 1;
    }

    for document in &project.documents {
        tx.execute(
            "INSERT OR REPLACE INTO documents (id, project_id, name, doc_type, url, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                document.id.clone().unwrap_or_else(new_id),
                project_id,
                document.name,
                document.doc_type,
                document.url,
                document.uploaded_at,
            ],
        )?;
        stats.records += 1;
    }

    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn position(index: usize) -> i64 {
    i64::try_from(index).map_or(i64::MAX, |i| i + 1)
}
