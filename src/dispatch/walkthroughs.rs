//! PD and client walkthroughs, tracked as subphases.

use serde::Serialize;
use serde_json::Value;

use super::Dispatcher;
use crate::error::Result;
use crate::model::{QueryAnalysis, ResultEnvelope, SubphaseMatch, WorkStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkthroughKind {
    Pd,
    Client,
}

impl WalkthroughKind {
    fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pd") {
            Self::Pd
        } else {
            Self::Client
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Pd => "PD",
            Self::Client => "Client",
        }
    }

    const fn pattern(self) -> &'static str {
        match self {
            Self::Pd => "%pd%walkthrough%",
            Self::Client => "%client%walkthrough%",
        }
    }
}

#[derive(Debug, Serialize)]
struct Walkthrough {
    id: String,
    name: String,
    walkthrough_type: &'static str,
    status: &'static str,
    project_id: String,
    project_name: String,
    phase_name: String,
    scheduled_date: Option<String>,
    completed_date: Option<String>,
}

impl Walkthrough {
    fn from_match(kind: WalkthroughKind, m: SubphaseMatch) -> Self {
        let status = match m.subphase.status {
            WorkStatus::Completed => "Completed",
            WorkStatus::Progress => "Scheduled",
            _ => "Not Scheduled",
        };
        let completed_date = (status == "Completed")
            .then(|| m.subphase.end_date.clone().or_else(|| m.subphase.start_date.clone()))
            .flatten();
        Self {
            id: m.subphase.id,
            name: m.subphase.name,
            walkthrough_type: kind.label(),
            status,
            project_id: m.project_id,
            project_name: m.project_name,
            phase_name: m.phase_name,
            scheduled_date: m.subphase.start_date,
            completed_date,
        }
    }
}

fn load(d: &Dispatcher<'_>, kind: WalkthroughKind, project_id: Option<&str>) -> Result<Vec<Walkthrough>> {
    Ok(d
        .storage()
        .find_subphases_by_name(&[kind.pattern()], project_id)?
        .into_iter()
        .map(|m| Walkthrough::from_match(kind, m))
        .collect())
}

fn walkthroughs_needed(
    d: &Dispatcher<'_>,
    analysis: &QueryAnalysis,
    kind: WalkthroughKind,
) -> Result<ResultEnvelope> {
    let project = match d.optional_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };
    // A status word in the question ("pending", "done") does not narrow
    // this list; needed always means not yet scheduled.
    let needed: Vec<Walkthrough> = load(d, kind, project.as_ref().map(|p| p.id.as_str()))?
        .into_iter()
        .filter(|w| w.status == "Not Scheduled")
        .collect();

    let message = match &project {
        Some(p) => format!(
            "{} {} walkthroughs need to be scheduled for project '{}'",
            needed.len(),
            kind.label(),
            p.name
        ),
        None => format!("{} {} walkthroughs need to be scheduled", needed.len(), kind.label()),
    };
    Ok(ResultEnvelope::from_data(&needed, message))
}

pub(super) fn pd_walkthroughs_needed(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    walkthroughs_needed(d, analysis, WalkthroughKind::Pd)
}

pub(super) fn client_walkthroughs_needed(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    walkthroughs_needed(d, analysis, WalkthroughKind::Client)
}

pub(super) fn recent_walkthrough_status(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.require_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };
    let kind = WalkthroughKind::parse(analysis.filters.str("walkthrough_type").unwrap_or("Client"));

    // Latest start date wins; undated ones only when nothing is dated.
    // Ties go to the later subphase.
    let recent = load(d, kind, Some(&project.id))?
        .into_iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then_with(|| ia.cmp(ib))
        })
        .map(|(_, w)| w);

    let Some(walkthrough) = recent else {
        return Ok(ResultEnvelope::ok(
            Value::Null,
            format!("No {} walkthroughs found for project '{}'", kind.label(), project.name),
        ));
    };

    let message = if walkthrough.status == "Completed" {
        format!(
            "The most recent {} walkthrough for project '{}' was completed on {}",
            kind.label(),
            project.name,
            walkthrough.completed_date.as_deref().unwrap_or("an unrecorded date")
        )
    } else {
        format!(
            "The most recent {} walkthrough for project '{}' has not been completed. Current status: {}",
            kind.label(),
            project.name,
            walkthrough.status
        )
    };
    Ok(ResultEnvelope::from_data(&walkthrough, message))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::seeded_storage;
    use super::*;
    use crate::intent::IntentResolver;
    use crate::model::Intent;
    use crate::oracle::{BoxedOracle, ScriptedOracle};

    #[test]
    fn test_needed_lists_unscheduled() {
        let storage = seeded_storage();
        let dispatcher = Dispatcher::new(&storage);

        let env = dispatcher.execute(&QueryAnalysis::new(Intent::PdWalkthroughsNeeded));
        assert_eq!(env.message, "1 PD walkthroughs need to be scheduled");
        assert_eq!(env.data.unwrap()[0]["project_name"], "JAIN-1B");

        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::ClientWalkthroughsNeeded).with_filter("status", "Not Scheduled"),
        );
        let data = env.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["project_name"], "CABOT-1B");
        assert_eq!(data[0]["walkthrough_type"], "Client");
    }

    #[tokio::test]
    async fn test_needed_ignores_extracted_status_word() {
        let storage = seeded_storage();
        let oracle = ScriptedOracle::replying(r#"{"intent":"pd_walkthroughs_needed","filters":{}}"#);
        let resolver = IntentResolver::new(Some(BoxedOracle::new(oracle)));

        let analysis = resolver
            .resolve("Are there any pending PD walkthroughs?", "", None)
            .await;
        assert_eq!(analysis.filters.status(), Some("Pending"));

        let env = Dispatcher::new(&storage).execute(&analysis);
        assert_eq!(env.message, "1 PD walkthroughs need to be scheduled");
        assert_eq!(env.data.unwrap()[0]["project_name"], "JAIN-1B");

        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::PdWalkthroughsNeeded).with_filter("status", "Completed"),
        );
        assert_eq!(env.data.unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_recent_walkthrough_status() {
        let storage = seeded_storage();
        let dispatcher = Dispatcher::new(&storage);

        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::RecentWalkthroughStatus).with_filter("project_name", "CABOT-1B"),
        );
        assert!(env.success);
        assert_eq!(
            env.message,
            "The most recent Client walkthrough for project 'CABOT-1B' has not been completed. Current status: Not Scheduled"
        );

        let env = dispatcher.execute(
            &QueryAnalysis::new(Intent::RecentWalkthroughStatus)
                .with_filter("project_name", "CABOT-1B")
                .with_filter("walkthrough_type", "PD"),
        );
        assert_eq!(
            env.message,
            "The most recent PD walkthrough for project 'CABOT-1B' was completed on 2024-02-01"
        );
    }

    #[test]
    fn test_recent_walkthrough_none_recorded() {
        let storage = seeded_storage();
        let env = Dispatcher::new(&storage).execute(
            &QueryAnalysis::new(Intent::RecentWalkthroughStatus).with_filter("project_id", "CABOT-1A"),
        );
        assert!(env.success);
        assert_eq!(env.data, Some(Value::Null));
        assert_eq!(env.message, "No Client walkthroughs found for project 'CABOT-1A'");
    }
}
