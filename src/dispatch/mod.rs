//! Operation dispatcher.
//!
//! Maps a resolved [`QueryAnalysis`] onto read operations against storage
//! and packages the outcome as a [`ResultEnvelope`].
//!
//! # Handler groups
//!
//! - [`projects`] - general project questions (details, budget, team, ...)
//! - [`phases`] - current phase and its pending tasks
//! - [`selections`] - client selections tracked as subphases
//! - [`walkthroughs`] - PD and client walkthroughs
//! - [`procurement`] - trades still waiting on a purchase order
//! - [`financial`] - payment milestones and billing
//!
//! [`Dispatcher::execute`] never fails: storage errors, missing projects
//! and unsupported intents all come back as `success = false` envelopes.

mod chart;
mod financial;
mod identity;
mod phases;
mod procurement;
mod projects;
mod selections;
mod walkthroughs;

pub use chart::{ChartPayload, ChartSeries};
pub use identity::{resolve_project, similar_project_names};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{Filters, Intent, Project, QueryAnalysis, ResultEnvelope};
use crate::storage::SqliteStorage;

/// A handler turns an analysis into an envelope.
///
/// `Err` is reserved for storage failures; "not found" and validation
/// problems are returned as failed envelopes.
type Handler = fn(&Dispatcher<'_>, &QueryAnalysis) -> Result<ResultEnvelope>;

/// Executes analyses against a storage handle.
pub struct Dispatcher<'a> {
    storage: &'a SqliteStorage,
    today: NaiveDate,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage) -> Self {
        Self {
            storage,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Pin "today" for due-date arithmetic.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Execute `analysis`.
    #[must_use]
    pub fn execute(&self, analysis: &QueryAnalysis) -> ResultEnvelope {
        let Some(handler) = handler_for(&analysis.intent) else {
            debug!(intent = %analysis.intent, "No handler for intent");
            return ResultEnvelope::fail(format!("Unsupported intent: {}", analysis.intent));
        };

        debug!(intent = %analysis.intent, filters = analysis.filters.len(), "Dispatching");
        match handler(self, analysis) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(intent = %analysis.intent, error = %e, "Operation failed");
                ResultEnvelope::fail(format!("Error: {e}"))
            }
        }
    }

    pub(crate) fn storage(&self) -> &SqliteStorage {
        self.storage
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.today
    }

    /// The project a handler is scoped to, or the envelope explaining why
    /// there is none.
    pub(crate) fn require_project(
        &self,
        filters: &Filters,
    ) -> Result<std::result::Result<Project, ResultEnvelope>> {
        let Some(reference) = filters.project_reference() else {
            return Ok(Err(ResultEnvelope::fail("Project ID or name is required")));
        };
        self.lookup(reference)
    }

    /// Like [`Self::require_project`], but no reference at all means
    /// "every project".
    pub(crate) fn optional_project(
        &self,
        filters: &Filters,
    ) -> Result<std::result::Result<Option<Project>, ResultEnvelope>> {
        self.optional_reference(filters.project_reference())
    }

    pub(crate) fn optional_reference(
        &self,
        reference: Option<&str>,
    ) -> Result<std::result::Result<Option<Project>, ResultEnvelope>> {
        match reference {
            Some(reference) => Ok(self.lookup(reference)?.map(Some)),
            None => Ok(Ok(None)),
        }
    }

    fn lookup(&self, reference: &str) -> Result<std::result::Result<Project, ResultEnvelope>> {
        if let Some(project) = resolve_project(self.storage, reference)? {
            return Ok(Ok(project));
        }

        let similar = similar_project_names(self.storage, reference)?;
        let message = if similar.is_empty() {
            format!("Project '{reference}' not found")
        } else {
            format!(
                "Project '{reference}' not found (did you mean: {}?)",
                similar.join(", ")
            )
        };
        Ok(Err(ResultEnvelope::fail(message)))
    }
}

/// The dispatch table.
fn handler_for(intent: &Intent) -> Option<Handler> {
    let handler: Handler = match intent {
        Intent::ListProjects => projects::list_projects,
        Intent::ProjectDetails => projects::project_details,
        Intent::ProjectStatus => projects::project_status,
        Intent::BudgetInfo => projects::budget_info,
        Intent::ProjectTasks => projects::project_tasks,
        Intent::ProjectTimeline => projects::project_timeline,
        Intent::ProjectMilestones => projects::project_milestones,
        Intent::ProjectTeam => projects::project_team,
        Intent::ProjectIssues => projects::project_issues,
        Intent::ProjectDocuments => projects::project_documents,
        Intent::SearchProjects => projects::search_projects,
        Intent::GeneralSearch => projects::general_search,
        Intent::GenerateReport => projects::generate_report,

        Intent::ListSelections => selections::list_selections,
        Intent::SelectionOverdue => selections::selection_overdue,
        Intent::UpcomingSelections => selections::upcoming_selections,

        Intent::ProjectPhaseStatus => phases::project_phase_status,
        Intent::PhasePendingTasks => phases::phase_pending_tasks,

        Intent::PdWalkthroughsNeeded => walkthroughs::pd_walkthroughs_needed,
        Intent::ClientWalkthroughsNeeded => walkthroughs::client_walkthroughs_needed,
        Intent::RecentWalkthroughStatus => walkthroughs::recent_walkthrough_status,

        Intent::TradesNeedingPo => procurement::trades_needing_po,

        Intent::CurrentPaymentMilestone => financial::current_payment_milestone,
        Intent::BillableProjects => financial::billable_projects,
        Intent::PaymentMilestoneStatus => financial::payment_milestone_status,

        Intent::Unknown | Intent::Unsupported(_) => return None,
    };
    Some(handler)
}

/// Parse the date part of a stored date or timestamp.
pub(crate) fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// "1 item" / "3 items".
pub(crate) fn count_noun(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_intent_has_a_handler() {
        for intent in &Intent::SUPPORTED {
            assert!(handler_for(intent).is_some(), "missing handler for {intent}");
        }
        assert!(handler_for(&Intent::Unknown).is_none());
    }

    #[test]
    fn test_unsupported_intent_message() {
        let storage = SqliteStorage::open_memory().unwrap();
        let dispatcher = Dispatcher::new(&storage);

        let env = dispatcher.execute(&QueryAnalysis::new(Intent::parse("project_resources")));
        assert!(!env.success);
        assert_eq!(env.message, "Unsupported intent: project_resources");

        let env = dispatcher.execute(&QueryAnalysis::new(Intent::Unknown));
        assert_eq!(env.message, "Unsupported intent: unknown");
    }

    #[test]
    fn test_missing_reference_and_not_found() {
        let storage = fixtures::seeded_storage();
        let dispatcher = Dispatcher::new(&storage);

        let env = dispatcher.execute(&QueryAnalysis::new(Intent::ProjectStatus));
        assert!(!env.success);
        assert_eq!(env.message, "Project ID or name is required");

        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_name", "ZZZZ-9Z"),
        );
        assert_eq!(env.message, "Project 'ZZZZ-9Z' not found");

        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_id", "JAIN-2C"),
        );
        assert!(env.message.starts_with("Project 'JAIN-2C' not found (did you mean: "));
        assert!(env.message.contains("JAIN-1B"));
    }

    #[test]
    fn test_project_id_preferred_over_name() {
        let storage = fixtures::seeded_storage();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::ProjectStatus)
                .with_filter("project_id", "JAIN-1B")
                .with_filter("project_name", "CABOT-1B"),
        );
        assert!(env.success);
        assert_eq!(env.data.unwrap()["project_name"], "JAIN-1B");
    }

    #[test]
    fn test_storage_failure_becomes_error_envelope() {
        let storage = fixtures::seeded_storage();
        storage
            .conn()
            .execute_batch("DROP TABLE phase_tasks; DROP TABLE subphases;")
            .unwrap();
        let dispatcher = Dispatcher::new(&storage);

        let env = dispatcher.execute(&QueryAnalysis::new(Intent::TradesNeedingPo));
        assert!(!env.success);
        assert!(env.message.starts_with("Error: "), "{}", env.message);
        assert!(env.data.is_none());

        // Phase progress degrades to an empty aggregate instead.
        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_id", "CABOT-1B"),
        );
        assert!(env.success, "{}", env.message);
        assert_eq!(env.data.unwrap()["overall_progress"], 0.0);
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(
            parse_date(Some("2024-06-10T12:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 6, 10)
        );
        assert_eq!(parse_date(Some("06/10/2024")), None);
        assert_eq!(parse_date(None), None);
    }
}
