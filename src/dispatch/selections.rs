//! Client selections.
//!
//! Selections are not a table of their own: they are subphases whose name
//! mentions choosing something ("Tile Selection", "Choose Flooring").

use chrono::NaiveDate;
use serde::Serialize;

use super::{count_noun, parse_date, Dispatcher};
use crate::error::Result;
use crate::model::{QueryAnalysis, ResultEnvelope, SubphaseMatch, WorkStatus};
use crate::validate::normalize_selection_status;

const SELECTION_PATTERNS: [&str; 5] = ["%selection%", "%choose%", "%decide%", "%pick%", "%select%"];

/// Look-ahead when the question names no window.
const DEFAULT_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Serialize)]
struct Selection {
    id: String,
    name: String,
    status: &'static str,
    project_id: String,
    project_name: String,
    phase_name: String,
    start_date: Option<String>,
    due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_overdue: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_until_due: Option<i64>,
}

impl Selection {
    fn from_match(m: SubphaseMatch) -> Self {
        Self {
            status: selection_status(&m.subphase.status),
            id: m.subphase.id,
            name: m.subphase.name,
            project_id: m.project_id,
            project_name: m.project_name,
            phase_name: m.phase_name,
            start_date: m.subphase.start_date,
            due_date: m.subphase.end_date,
            days_overdue: None,
            days_until_due: None,
        }
    }

    fn is_completed(&self) -> bool {
        self.status == "Completed"
    }

    fn due(&self) -> Option<NaiveDate> {
        parse_date(self.due_date.as_deref())
    }

    /// Whole days past due; 0 when not overdue, completed or undated.
    fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_completed() {
            return 0;
        }
        self.due().map_or(0, |due| (today - due).num_days().max(0))
    }
}

fn selection_status(status: &WorkStatus) -> &'static str {
    match status {
        WorkStatus::Completed => "Completed",
        WorkStatus::Progress => "In Progress",
        WorkStatus::Review => "Under Review",
        WorkStatus::Todo | WorkStatus::Other(_) => "Open",
    }
}

fn load_selections(d: &Dispatcher<'_>, project_id: Option<&str>) -> Result<Vec<Selection>> {
    Ok(d
        .storage()
        .find_subphases_by_name(&SELECTION_PATTERNS, project_id)?
        .into_iter()
        .map(Selection::from_match)
        .collect())
}

pub(super) fn list_selections(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let filters = &analysis.filters;
    let reference = filters
        .project_reference()
        .or_else(|| filters.str("search_term"));
    let project = match d.optional_reference(reference)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let requested = filters.status().unwrap_or("Open");
    let status = normalize_selection_status(requested);

    let mut selections = load_selections(d, project.as_ref().map(|p| p.id.as_str()))?;
    if let Some(status) = &status {
        selections.retain(|s| s.status.eq_ignore_ascii_case(status));
    }

    let label = status.as_deref().unwrap_or("All");
    let message = match &project {
        Some(p) => format!("{} {label} selection items for project '{}'", selections.len(), p.name),
        None => format!("{} {label} selection items", selections.len()),
    };
    Ok(ResultEnvelope::from_data(&selections, message))
}

pub(super) fn selection_overdue(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.optional_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };
    let today = d.today();
    let selections = load_selections(d, project.as_ref().map(|p| p.id.as_str()))?;

    if let Some(name) = analysis.filters.str("selection_name") {
        let needle = name.to_lowercase();
        let Some(mut selection) = selections
            .into_iter()
            .find(|s| s.name.to_lowercase().contains(&needle))
        else {
            return Ok(ResultEnvelope::fail(format!("Selection '{name}' not found")));
        };

        let days = selection.days_overdue(today);
        selection.days_overdue = Some(days);
        let message = if days > 0 {
            format!("Selection '{}' is {days} days overdue", selection.name)
        } else {
            format!("Selection '{}' is not overdue", selection.name)
        };
        return Ok(ResultEnvelope::from_data(&selection, message));
    }

    let mut overdue: Vec<Selection> = selections
        .into_iter()
        .filter_map(|mut s| {
            let days = s.days_overdue(today);
            (days > 0).then(|| {
                s.days_overdue = Some(days);
                s
            })
        })
        .collect();
    overdue.sort_by_key(|s| std::cmp::Reverse(s.days_overdue));

    let message = format!("{} overdue", count_noun(overdue.len(), "selection item"));
    Ok(ResultEnvelope::from_data(&overdue, message))
}

pub(super) fn upcoming_selections(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.optional_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let window = window_days(analysis);
    let today = d.today();
    let mut upcoming: Vec<Selection> = load_selections(d, project.as_ref().map(|p| p.id.as_str()))?
        .into_iter()
        .filter(|s| !s.is_completed())
        .filter_map(|mut s| {
            let days = (s.due()? - today).num_days();
            (0..=window).contains(&days).then(|| {
                s.days_until_due = Some(days);
                s
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.days_until_due.cmp(&b.days_until_due).then_with(|| a.name.cmp(&b.name)));

    let message = format!(
        "{} due in the next {window} days",
        count_noun(upcoming.len(), "selection item")
    );
    Ok(ResultEnvelope::from_data(&upcoming, message))
}

/// `timeframe`, then a forward `time_period`, then the default window.
fn window_days(analysis: &QueryAnalysis) -> i64 {
    if let Some(timeframe) = analysis.filters.timeframe() {
        return timeframe.days();
    }
    analysis
        .filters
        .time_period()
        .filter(|p| p.relative != "last")
        .map_or(DEFAULT_WINDOW_DAYS, |p| p.span_days())
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{seeded_storage, today};
    use super::*;
    use crate::model::Intent;
    use crate::storage::SqliteStorage;
    use serde_json::{json, Value};

    fn run(storage: &SqliteStorage, analysis: &QueryAnalysis) -> ResultEnvelope {
        Dispatcher::new(storage).with_today(today()).execute(analysis)
    }

    fn names(env: &ResultEnvelope) -> Vec<String> {
        env.data
            .as_ref()
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_list_defaults_to_open() {
        let storage = seeded_storage();
        let env = run(&storage, &QueryAnalysis::new(Intent::ListSelections));
        assert!(env.success);
        assert_eq!(names(&env), vec!["Tile Selection", "Choose Flooring"]);
        assert_eq!(env.message, "2 Open selection items");
    }

    #[test]
    fn test_list_status_synonyms_and_all() {
        let storage = seeded_storage();
        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::ListSelections)
                .with_filter("project_name", "CABOT-1B")
                .with_filter("status", "active"),
        );
        assert_eq!(names(&env), vec!["Fixture Selections"]);

        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::ListSelections)
                .with_filter("search_term", "CABOT-1B")
                .with_filter("status", "All"),
        );
        assert_eq!(names(&env).len(), 3);
        assert!(env.message.starts_with("3 All selection items for project 'CABOT-1B'"));
    }

    #[test]
    fn test_list_unknown_project_fails() {
        let storage = seeded_storage();
        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::ListSelections).with_filter("project_name", "Nowhere"),
        );
        assert!(!env.success);
        assert_eq!(env.message, "Project 'Nowhere' not found");
    }

    #[test]
    fn test_overdue_by_name() {
        let storage = seeded_storage();
        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::SelectionOverdue).with_filter("selection_name", "tile"),
        );
        assert_eq!(env.message, "Selection 'Tile Selection' is 5 days overdue");
        assert_eq!(env.data.unwrap()["days_overdue"], 5);

        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::SelectionOverdue).with_filter("selection_name", "cabinet"),
        );
        assert_eq!(env.message, "Selection 'Cabinet Selection' is not overdue");
        assert_eq!(env.data.unwrap()["days_overdue"], 0);
    }

    #[test]
    fn test_overdue_listing_sorted_by_lateness() {
        let storage = seeded_storage();
        let env = run(&storage, &QueryAnalysis::new(Intent::SelectionOverdue));
        assert_eq!(names(&env), vec!["Choose Flooring", "Tile Selection"]);
        assert_eq!(env.message, "2 selection items overdue");
    }

    #[test]
    fn test_upcoming_window() {
        let storage = seeded_storage();
        let env = run(&storage, &QueryAnalysis::new(Intent::UpcomingSelections));
        assert_eq!(names(&env), vec!["Fixture Selections"]);
        assert_eq!(env.data.as_ref().unwrap()[0]["days_until_due"], 5);

        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::UpcomingSelections)
                .with_filter("timeframe", json!({"number": 7, "unit": "weeks"})),
        );
        assert_eq!(names(&env), vec!["Fixture Selections", "Cabinet Selection"]);

        let env = run(
            &storage,
            &QueryAnalysis::new(Intent::UpcomingSelections)
                .with_filter("time_period", json!({"relative": "next", "unit": "week"})),
        );
        assert_eq!(names(&env), vec!["Fixture Selections"]);
        assert_eq!(env.message, "1 selection item due in the next 7 days");
    }
}
