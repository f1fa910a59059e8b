//! Payment milestones and billing.
//!
//! Payment milestones are subphases naming a payment, invoice or billing
//! step. Their sequence number comes from a `#N` token in the name, or
//! from their position when there is none.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::{count_noun, Dispatcher};
use crate::error::Result;
use crate::intent::literal_regex;
use crate::model::{QueryAnalysis, ResultEnvelope, SubphaseMatch, WorkStatus};

const PAYMENT_PATTERNS: [&str; 3] = ["%payment%", "%invoice%", "%billing%"];

static SEQUENCE: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"#\s*(\d+)"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum PaymentStatus {
    Paid,
    Invoiced,
    #[serde(rename = "Ready for Billing")]
    ReadyForBilling,
    #[serde(rename = "Not Started")]
    NotStarted,
}

impl PaymentStatus {
    fn from_work(status: &WorkStatus) -> Self {
        match status {
            WorkStatus::Completed => Self::Paid,
            WorkStatus::Progress => Self::Invoiced,
            WorkStatus::Review => Self::ReadyForBilling,
            WorkStatus::Todo | WorkStatus::Other(_) => Self::NotStarted,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Invoiced => "Invoiced",
            Self::ReadyForBilling => "Ready for Billing",
            Self::NotStarted => "Not Started",
        }
    }

    const fn is_issued(self) -> bool {
        matches!(self, Self::Invoiced | Self::Paid)
    }
}

#[derive(Debug, Clone, Serialize)]
struct PaymentMilestone {
    sequence: i64,
    title: String,
    status: PaymentStatus,
    issued: bool,
    project_id: String,
    project_name: String,
    phase_name: String,
    due_date: Option<String>,
}

impl PaymentMilestone {
    fn new(position: usize, m: SubphaseMatch) -> Self {
        let sequence = SEQUENCE
            .captures(&m.subphase.name)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or_else(|| i64::try_from(position + 1).unwrap_or(i64::MAX));
        let status = PaymentStatus::from_work(&m.subphase.status);
        Self {
            sequence,
            title: m.subphase.name,
            status,
            issued: status.is_issued(),
            project_id: m.project_id,
            project_name: m.project_name,
            phase_name: m.phase_name,
            due_date: m.subphase.end_date,
        }
    }

    fn issued_phrase(&self) -> &'static str {
        if self.issued {
            "has been issued"
        } else {
            "has not been issued yet"
        }
    }
}

#[derive(Debug, Serialize)]
struct BillableProject {
    project_id: String,
    project_name: String,
    milestones: Vec<PaymentMilestone>,
}

/// A project's payment milestones in sequence order.
fn project_milestones(d: &Dispatcher<'_>, project_id: &str) -> Result<Vec<PaymentMilestone>> {
    let mut milestones: Vec<PaymentMilestone> = d
        .storage()
        .find_subphases_by_name(&PAYMENT_PATTERNS, Some(project_id))?
        .into_iter()
        .enumerate()
        .map(|(i, m)| PaymentMilestone::new(i, m))
        .collect();
    milestones.sort_by_key(|m| m.sequence);
    Ok(milestones)
}

/// First milestone not yet paid, else the last one.
fn current(milestones: &[PaymentMilestone]) -> Option<&PaymentMilestone> {
    milestones
        .iter()
        .find(|m| m.status != PaymentStatus::Paid)
        .or_else(|| milestones.last())
}

pub(super) fn current_payment_milestone(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.require_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let milestones = project_milestones(d, &project.id)?;
    let Some(milestone) = current(&milestones) else {
        return Ok(ResultEnvelope::ok(
            Value::Null,
            format!("No payment milestones found for project '{}'", project.name),
        ));
    };

    let message = format!(
        "Current payment milestone for project '{}' is: {} (Status: {})",
        project.name,
        milestone.title,
        milestone.status.as_str()
    );
    Ok(ResultEnvelope::from_data(milestone, message))
}

pub(super) fn billable_projects(d: &Dispatcher<'_>, _analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let matches = d.storage().find_subphases_by_name(&PAYMENT_PATTERNS, None)?;

    // Positions restart per project.
    let mut per_project: BTreeMap<(String, String), Vec<PaymentMilestone>> = BTreeMap::new();
    for m in matches {
        let entry = per_project
            .entry((m.project_name.clone(), m.project_id.clone()))
            .or_default();
        let position = entry.len();
        entry.push(PaymentMilestone::new(position, m));
    }

    let billable: Vec<BillableProject> = per_project
        .into_iter()
        .filter_map(|((project_name, project_id), milestones)| {
            let ready: Vec<PaymentMilestone> = milestones
                .into_iter()
                .filter(|m| m.status == PaymentStatus::ReadyForBilling)
                .collect();
            (!ready.is_empty()).then_some(BillableProject {
                project_id,
                project_name,
                milestones: ready,
            })
        })
        .collect();

    let verb = if billable.len() == 1 { "is" } else { "are" };
    let message = format!("{} {verb} ready to be billed", count_noun(billable.len(), "project"));
    Ok(ResultEnvelope::from_data(&billable, message))
}

pub(super) fn payment_milestone_status(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.require_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };
    let milestones = project_milestones(d, &project.id)?;

    if let Some(number) = analysis.filters.milestone_number() {
        let Some(milestone) = milestones.iter().find(|m| m.sequence == number) else {
            return Ok(ResultEnvelope::ok(
                Value::Null,
                format!("Payment milestone #{number} not found for project '{}'", project.name),
            ));
        };
        let message = format!(
            "Payment milestone #{number} ({}) for project '{}' {}. Current status: {}",
            milestone.title,
            project.name,
            milestone.issued_phrase(),
            milestone.status.as_str()
        );
        return Ok(ResultEnvelope::from_data(milestone, message));
    }

    if let Some(name) = analysis.filters.str("milestone_name") {
        let needle = name.to_lowercase();
        let Some(milestone) = milestones
            .iter()
            .find(|m| m.title.to_lowercase().contains(&needle))
        else {
            return Ok(ResultEnvelope::ok(
                Value::Null,
                format!(
                    "No payment milestones matching '{name}' found for project '{}'",
                    project.name
                ),
            ));
        };
        let message = format!(
            "Payment milestone '{}' for project '{}' {}. Current status: {}",
            milestone.title,
            project.name,
            milestone.issued_phrase(),
            milestone.status.as_str()
        );
        return Ok(ResultEnvelope::from_data(milestone, message));
    }

    let Some(milestone) = current(&milestones) else {
        return Ok(ResultEnvelope::ok(
            Value::Null,
            format!("No payment milestones found for project '{}'", project.name),
        ));
    };
    let message = format!(
        "Current payment milestone for project '{}' is: {} and {}. Status: {}",
        project.name,
        milestone.title,
        milestone.issued_phrase(),
        milestone.status.as_str()
    );
    Ok(ResultEnvelope::from_data(milestone, message))
}
