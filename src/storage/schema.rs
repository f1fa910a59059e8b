//! Database schema definitions.
//!
//! The schema mirrors the project-management system SiteQuery reads from:
//! a project → phase → subphase → task hierarchy plus per-project budgets,
//! tasks, milestones, issues and documents. Dates are ISO `YYYY-MM-DD`
//! text; row timestamps are INTEGER Unix milliseconds.

use rusqlite::{Connection, Result};

/// The complete SQL schema for the SiteQuery database.
pub const SCHEMA_SQL: &str = r#"
-- ====================
-- People
-- ====================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    first_name TEXT,
    last_name TEXT,
    email TEXT
);

-- Leads: prospective and signed clients
CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    first_name TEXT,
    last_name TEXT
);

-- ====================
-- Projects and work breakdown
-- ====================

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    start_date TEXT,
    percent_complete REAL NOT NULL DEFAULT 0,
    designer_id TEXT,
    junior_designer_id TEXT,
    developer_id TEXT,
    client_id TEXT,
    warranty_mode INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_projects_updated ON projects(updated_at);

CREATE TABLE IF NOT EXISTS phases (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Todo',
    "order" INTEGER NOT NULL DEFAULT 0,
    start_date TEXT,
    target_end_date TEXT,
    actual_end_date TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_phases_project ON phases(project_id, "order");

CREATE TABLE IF NOT EXISTS subphases (
    id TEXT PRIMARY KEY,
    phase_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Todo',
    "order" INTEGER NOT NULL DEFAULT 0,
    start_date TEXT,
    end_date TEXT,
    FOREIGN KEY (phase_id) REFERENCES phases(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_subphases_phase ON subphases(phase_id, "order");

CREATE TABLE IF NOT EXISTS phase_tasks (
    id TEXT PRIMARY KEY,
    subphase_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Todo',
    due_date TEXT,
    completion_date TEXT,
    assigned_to TEXT,
    FOREIGN KEY (subphase_id) REFERENCES subphases(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_phase_tasks_subphase ON phase_tasks(subphase_id);

-- ====================
-- Per-project records
-- ====================

CREATE TABLE IF NOT EXISTS budgets (
    project_id TEXT PRIMARY KEY,
    total_budget REAL NOT NULL DEFAULT 0,
    spent REAL NOT NULL DEFAULT 0,
    currency TEXT NOT NULL DEFAULT 'USD',
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Todo',
    priority TEXT,
    due_date TEXT,
    assigned_to TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS milestones (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Pending',
    target_date TEXT,
    completion_date TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_milestones_project ON milestones(project_id);

CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open',
    priority TEXT,
    reported_date TEXT,
    resolved_date TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,
    doc_type TEXT,
    url TEXT,
    uploaded_at TEXT,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project_id);
"#;

/// Apply the schema to a connection. Safe to call repeatedly.
///
/// # Errors
///
/// Returns an error if a pragma or statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Render every table with its columns as plain text.
///
/// Used as the schema summary in the classification prompt.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub fn describe_schema(conn: &Connection) -> Result<String> {
    let tables: Vec<String> = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>>>()?;

    let mut summary = String::new();
    for table in tables {
        summary.push_str(&format!("Table: {table}\nColumns:\n"));
        let mut stmt = conn.prepare("SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1)")?;
        let columns = stmt.query_map([&table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        for column in columns {
            let (name, ty, not_null, default) = column?;
            let nullability = if not_null { "NOT NULL" } else { "NULL" };
            match default {
                Some(d) => summary.push_str(&format!("  - {name} ({ty}) {nullability} DEFAULT {d}\n")),
                None => summary.push_str(&format!("  - {name} ({ty}) {nullability}\n")),
            }
        }
        summary.push('\n');
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "budgets",
            "documents",
            "issues",
            "leads",
            "milestones",
            "phase_tasks",
            "phases",
            "projects",
            "subphases",
            "tasks",
            "users",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_describe_schema_lists_columns() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let summary = describe_schema(&conn).unwrap();
        assert!(summary.contains("Table: projects"));
        assert!(summary.contains("  - percent_complete (REAL) NOT NULL DEFAULT 0"));
        assert!(summary.contains("  - end_date (TEXT) NULL"));
    }
}
