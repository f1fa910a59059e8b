//! SQLite storage implementation.
//!
//! Read operations used by the identity resolver, the progress aggregator
//! and the dispatcher, plus a transactional `mutate` entry point used by
//! fixture import. All queries are parameterised; free-text fragments are
//! escaped before being used in `LIKE` patterns.

use crate::error::Result;
use crate::model::{
    Budget, Document, Milestone, Person, Phase, PhaseTask, Project, ProjectIssue, ProjectTask,
    Subphase, SubphaseMatch, WorkStatus,
};
use crate::storage::schema::{apply_schema, describe_schema};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const PROJECT_COLUMNS: &str = "id, name, start_date, percent_complete, designer_id, junior_designer_id, developer_id, client_id, warranty_mode, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an IMMEDIATE transaction, committing on success.
    ///
    /// # Errors
    ///
    /// Returns the closure's error (after rollback) or a commit failure.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        debug!(op, "starting mutation");
        let result = f(&tx)?;
        tx.commit()?;
        debug!(op, "mutation committed");

        Ok(result)
    }

    /// Text description of every table, for the classification prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub fn schema_summary(&self) -> Result<String> {
        Ok(describe_schema(&self.conn)?)
    }

    // ==================
    // Project Operations
    // ==================

    /// Get a project by exact ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                [id],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Get a project by exact name, ignoring case.
    ///
    /// When several projects share the name the most recently updated wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE name = ?1 COLLATE NOCASE
                     ORDER BY updated_at DESC LIMIT 1"
                ),
                [name.trim()],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Most recently updated project whose name contains `fragment`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_project_by_partial_name(&self, fragment: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects
                     WHERE name LIKE ?1 ESCAPE '\\'
                     ORDER BY updated_at DESC LIMIT 1"
                ),
                [like_contains(fragment)],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// List projects, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, limit: Option<usize>) -> Result<Vec<Project>> {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY updated_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit], map_project_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Names of all projects, for "did you mean" suggestions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_project_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM projects ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Projects whose name contains `term`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_projects(&self, term: &str) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY updated_at DESC"
        ))?;
        let rows = stmt.query_map([like_contains(term)], map_project_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ==================
    // Work Breakdown
    // ==================

    /// Phases of a project in `order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_phases(&self, project_id: &str) -> Result<Vec<Phase>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, name, status, \"order\", start_date, target_end_date, actual_end_date
             FROM phases WHERE project_id = ?1
             ORDER BY \"order\" ASC, name ASC",
        )?;
        let rows = stmt.query_map([project_id], map_phase_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Subphases of a phase in `order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_subphases(&self, phase_id: &str) -> Result<Vec<Subphase>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase_id, name, status, \"order\", start_date, end_date
             FROM subphases WHERE phase_id = ?1
             ORDER BY \"order\" ASC, name ASC",
        )?;
        let rows = stmt.query_map([phase_id], map_subphase_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Tasks of a subphase, earliest due date first (undated last).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_phase_tasks(&self, subphase_id: &str) -> Result<Vec<PhaseTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subphase_id, name, description, status, due_date, completion_date, assigned_to
             FROM phase_tasks WHERE subphase_id = ?1
             ORDER BY due_date ASC NULLS LAST, name ASC",
        )?;
        let rows = stmt.query_map([subphase_id], map_phase_task_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Subphases across projects whose name matches any of `patterns`.
    ///
    /// Patterns are SQL `LIKE` patterns (case-insensitive for ASCII).
    /// Results are ordered by project name, phase order, subphase order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_subphases_by_name(
        &self,
        patterns: &[&str],
        project_id: Option<&str>,
    ) -> Result<Vec<SubphaseMatch>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let name_clause = (0..patterns.len())
            .map(|i| format!("s.name LIKE ?{}", i + 2))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT s.id, s.phase_id, s.name, s.status, s.\"order\", s.start_date, s.end_date,
                    ph.name, ph.\"order\", p.id, p.name
             FROM subphases s
             JOIN phases ph ON ph.id = s.phase_id
             JOIN projects p ON p.id = ph.project_id
             WHERE (?1 IS NULL OR p.id = ?1) AND ({name_clause})
             ORDER BY p.name ASC, ph.\"order\" ASC, s.\"order\" ASC"
        );

        let mut values: Vec<Option<&str>> = Vec::with_capacity(patterns.len() + 1);
        values.push(project_id);
        values.extend(patterns.iter().map(|p| Some(*p)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), |row| {
            Ok(SubphaseMatch {
                subphase: map_subphase_row(row)?,
                phase_name: row.get(7)?,
                phase_order: row.get(8)?,
                project_id: row.get(9)?,
                project_name: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ==================
    // People
    // ==================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_user(&self, id: &str) -> Result<Option<Person>> {
        let person = self
            .conn
            .query_row(
                "SELECT id, first_name, last_name FROM users WHERE id = ?1",
                [id],
                map_person_row,
            )
            .optional()?;
        Ok(person)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_lead(&self, id: &str) -> Result<Option<Person>> {
        let person = self
            .conn
            .query_row(
                "SELECT id, first_name, last_name FROM leads WHERE id = ?1",
                [id],
                map_person_row,
            )
            .optional()?;
        Ok(person)
    }

    // ==================
    // Per-project Records
    // ==================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_budget(&self, project_id: &str) -> Result<Option<Budget>> {
        let budget = self
            .conn
            .query_row(
                "SELECT project_id, total_budget, spent, currency FROM budgets WHERE project_id = ?1",
                [project_id],
                map_budget_row,
            )
            .optional()?;
        Ok(budget)
    }

    /// Every budget with its project's name, ordered by project name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_budgets(&self) -> Result<Vec<(String, Budget)>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.project_id, b.total_budget, b.spent, b.currency, p.name
             FROM budgets b JOIN projects p ON p.id = b.project_id
             ORDER BY p.name ASC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(4)?, map_budget_row(row)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_tasks(&self, project_id: &str) -> Result<Vec<ProjectTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, priority, due_date, assigned_to
             FROM tasks WHERE project_id = ?1
             ORDER BY due_date ASC NULLS LAST, title ASC",
        )?;
        let rows = stmt.query_map([project_id], map_project_task_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_milestones(&self, project_id: &str) -> Result<Vec<Milestone>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, target_date, completion_date
             FROM milestones WHERE project_id = ?1
             ORDER BY target_date ASC NULLS LAST, title ASC",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            Ok(Milestone {
                id: row.get(0)?,
                project_id: row.get(1)?,
                title: row.get(2)?,
                status: row.get(3)?,
                target_date: row.get(4)?,
                completion_date: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_issues(&self, project_id: &str) -> Result<Vec<ProjectIssue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, priority, reported_date, resolved_date
             FROM issues WHERE project_id = ?1
             ORDER BY reported_date DESC NULLS LAST, title ASC",
        )?;
        let rows = stmt.query_map([project_id], map_issue_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_documents(&self, project_id: &str) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, name, doc_type, url, uploaded_at
             FROM documents WHERE project_id = ?1
             ORDER BY uploaded_at DESC NULLS LAST, name ASC",
        )?;
        let rows = stmt.query_map([project_id], map_document_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Project tasks whose title contains `term`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_tasks(&self, term: &str) -> Result<Vec<ProjectTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, priority, due_date, assigned_to
             FROM tasks WHERE title LIKE ?1 ESCAPE '\\'
             ORDER BY title ASC",
        )?;
        let rows = stmt.query_map([like_contains(term)], map_project_task_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Issues whose title contains `term`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_issues(&self, term: &str) -> Result<Vec<ProjectIssue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, priority, reported_date, resolved_date
             FROM issues WHERE title LIKE ?1 ESCAPE '\\'
             ORDER BY title ASC",
        )?;
        let rows = stmt.query_map([like_contains(term)], map_issue_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Documents whose name contains `term`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_documents(&self, term: &str) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, name, doc_type, url, uploaded_at
             FROM documents WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([like_contains(term)], map_document_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

/// `%fragment%` with LIKE metacharacters escaped by `\`.
fn like_contains(fragment: &str) -> String {
    let escaped = fragment
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        percent_complete: row.get(3)?,
        designer_id: row.get(4)?,
        junior_designer_id: row.get(5)?,
        developer_id: row.get(6)?,
        client_id: row.get(7)?,
        warranty_mode: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_phase_row(row: &rusqlite::Row) -> rusqlite::Result<Phase> {
    Ok(Phase {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        status: WorkStatus::parse(&row.get::<_, String>(3)?),
        order: row.get(4)?,
        start_date: row.get(5)?,
        target_end_date: row.get(6)?,
        actual_end_date: row.get(7)?,
    })
}

fn map_subphase_row(row: &rusqlite::Row) -> rusqlite::Result<Subphase> {
    Ok(Subphase {
        id: row.get(0)?,
        phase_id: row.get(1)?,
        name: row.get(2)?,
        status: WorkStatus::parse(&row.get::<_, String>(3)?),
        order: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
    })
}

fn map_phase_task_row(row: &rusqlite::Row) -> rusqlite::Result<PhaseTask> {
    Ok(PhaseTask {
        id: row.get(0)?,
        subphase_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: WorkStatus::parse(&row.get::<_, String>(4)?),
        due_date: row.get(5)?,
        completion_date: row.get(6)?,
        assigned_to: row.get(7)?,
    })
}

fn map_person_row(row: &rusqlite::Row) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
    })
}

fn map_budget_row(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    Ok(Budget {
        project_id: row.get(0)?,
        total_budget: row.get(1)?,
        spent: row.get(2)?,
        currency: row.get(3)?,
    })
}

fn map_project_task_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectTask> {
    Ok(ProjectTask {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        due_date: row.get(5)?,
        assigned_to: row.get(6)?,
    })
}

fn map_issue_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectIssue> {
    Ok(ProjectIssue {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        reported_date: row.get(5)?,
        resolved_date: row.get(6)?,
    })
}

fn map_document_row(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        doc_type: row.get(3)?,
        url: row.get(4)?,
        uploaded_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn insert_project(storage: &mut SqliteStorage, id: &str, name: &str, updated_at: i64) {
        storage
            .mutate("test_insert", |tx| {
                tx.execute(
                    "INSERT INTO projects (id, name, percent_complete, created_at, updated_at)
                     VALUES (?1, ?2, 0, ?3, ?3)",
                    params![id, name, updated_at],
                )?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_applies_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sq.db");
        let storage = SqliteStorage::open(&path).unwrap();
        assert!(storage.list_projects(None).unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_project_lookup_by_name_ignores_case() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_project(&mut storage, "p1", "CABOT-1B", 10);

        let found = storage.get_project_by_name("cabot-1b").unwrap();
        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));
        assert!(storage.get_project_by_name("cabot").unwrap().is_none());
    }

    #[test]
    fn test_partial_name_prefers_recent() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_project(&mut storage, "a", "CABOT-1A", 100);
        insert_project(&mut storage, "b", "CABOT-1B", 200);

        let found = storage.find_project_by_partial_name("cabot").unwrap().unwrap();
        assert_eq!(found.name, "CABOT-1B");

        storage
            .conn()
            .execute("UPDATE projects SET updated_at = 300 WHERE id = 'a'", [])
            .unwrap();
        let found = storage.find_project_by_partial_name("cabot").unwrap().unwrap();
        assert_eq!(found.name, "CABOT-1A");
    }

    #[test]
    fn test_like_metacharacters_are_literal() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_project(&mut storage, "a", "JAIN-1B", 1);
        assert!(storage.find_project_by_partial_name("%").unwrap().is_none());
        assert!(storage.find_project_by_partial_name("_AIN").unwrap().is_none());
        assert_eq!(like_contains(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn test_list_projects_orders_and_limits() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_project(&mut storage, "a", "Old", 1);
        insert_project(&mut storage, "b", "New", 2);

        let all = storage.list_projects(None).unwrap();
        assert_eq!(all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["New", "Old"]);
        assert_eq!(storage.list_projects(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_find_subphases_by_name_scopes_to_project() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        insert_project(&mut storage, "a", "Alpha", 1);
        insert_project(&mut storage, "b", "Beta", 2);
        storage
            .mutate("seed", |tx| {
                tx.execute_batch(
                    "INSERT INTO phases (id, project_id, name, status, \"order\") VALUES
                        ('ph-a', 'a', 'Design', 'Progress', 1),
                        ('ph-b', 'b', 'Design', 'Progress', 1);
                     INSERT INTO subphases (id, phase_id, name, status, \"order\") VALUES
                        ('s1', 'ph-a', 'Tile Selection', 'Todo', 2),
                        ('s2', 'ph-a', 'Framing', 'Todo', 1),
                        ('s3', 'ph-b', 'Lighting Selections', 'Review', 1);",
                )?;
                Ok(())
            })
            .unwrap();

        let all = storage.find_subphases_by_name(&["%selection%"], None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].project_name, "Alpha");

        let scoped = storage.find_subphases_by_name(&["%selection%"], Some("b")).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].subphase.status, WorkStatus::Review);
        assert_eq!(scoped[0].phase_name, "Design");
    }

    #[test]
    fn test_mutate_rolls_back_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result: Result<()> = storage.mutate("failing", |tx| {
            tx.execute(
                "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('x', 'X', 0, 0)",
                [],
            )?;
            Err(crate::error::Error::Other("abort".into()))
        });
        assert!(result.is_err());
        assert!(storage.get_project("x").unwrap().is_none());
    }
}
