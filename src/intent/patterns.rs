//! Deterministic pattern classifier.
//!
//! An ordered rule table consulted when the oracle gives no usable answer.
//! Rules run top to bottom on the lower-cased question and the first match
//! wins. Order is priority: a question about open selections "for the
//! project" also mentions projects, and must not fall through to the
//! generic project rules further down.

use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

use super::literal_regex;
use crate::model::{AnalysisSource, ChartType, Intent, QueryAnalysis};

/// One classification rule: every pattern in `when` must match.
struct Rule {
    when: Vec<Regex>,
    build: fn(&str) -> QueryAnalysis,
}

impl Rule {
    fn new(when: &[&str], build: fn(&str) -> QueryAnalysis) -> Self {
        Self {
            when: when.iter().map(|p| literal_regex(p)).collect(),
            build,
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.when.iter().all(|re| re.is_match(query))
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Selections
        Rule::new(&[r"open selection(s| item| items| tasks)?"], open_selections),
        Rule::new(&[r"(how )?overdue is .* selection"], overdue_selection),
        Rule::new(
            &[r"selection.* (coming|due|upcoming).*(\d+)?\s+(week|day)"],
            upcoming_selections,
        ),
        // Phases
        Rule::new(&[r"(what|which) (stage|phase) is"], phase_status),
        Rule::new(
            &[
                r"(what|which) items.*(need|pending|remaining).*(complete|finish)",
                r"(current|this) (phase|stage)",
            ],
            phase_pending_tasks,
        ),
        // Walkthroughs
        Rule::new(&[r"(any )?pd walkthrough.*(need|schedule|due)"], pd_walkthroughs),
        Rule::new(&[r"(any )?client walkthrough.*(need|schedule|due)"], client_walkthroughs),
        Rule::new(
            &[r"(recent|last) client walkthrough.*(complete|finish)"],
            recent_walkthrough,
        ),
        // Procurement
        Rule::new(&[r"(what|which) (still )?need.*(buy|purchase|bought|order|\bpo\b)"], trades_needing_po),
        Rule::new(&[r"trades.*(need|missing).*(\bpo\b|purchase order)"], trades_needing_po),
        // Financial
        Rule::new(
            &[r"(what|which) payment milestone.*(currently|now) at"],
            current_payment_milestone,
        ),
        Rule::new(&[r"(what|which) project.*bill.*(this|next) week"], billable_projects),
        Rule::new(
            &[r"(has|have|is) payment milestone.*(issue|invoice)"],
            payment_milestone_status,
        ),
        // Generic project questions
        Rule::new(&[r"(who|what) is the (designer|developer|client) (for|of)"], team_role),
        Rule::new(&[r"(what('s| is) the |current )status (of|for)"], project_status),
        Rule::new(&[r"(progress|complete|percent|completion).*\b(of|for)\b"], project_progress),
        Rule::new(
            &[r"(what('s| is) the |current |show me )(subphase|sub-phase|task)"],
            current_task,
        ),
        Rule::new(
            &[r"(show|list|get) (me |all )?(the |active |completed )?(projects|project list)"],
            list_projects,
        ),
    ]
});

static FOR_PROJECT: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"\bfor (?:project |the )?([\w\s-]+)(?:\?|$)"));

static OF_OR_FOR_PROJECT: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"\b(?:of|for) (?:project |the )?([\w\s-]+)(?:\?|$)"));

static PHASE_PROJECT: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"(?:stage|phase) is (?:project |the )?([\w\s-]+?)(?:\s+in)?\s*(?:\?|$)")
});

static OVERDUE_SELECTION: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"overdue is (?:the )?([\w\s-]+?) selection"));

static NEXT_WINDOW: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"next\s+(?:(\d+)\s+)?(week|day)"));

static MILESTONE_PROJECT: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"\b(?:is|for) (?:project |the )?([\w\s-]+?) (?:currently|now) at")
});

static MILESTONE_NUMBER: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"milestone #?(\d+)"));

static MILESTONE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"milestone ([a-z][a-z\s-]*?) (?:been|was|is|has)\b")
});

static ROLE: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"(designer|developer|client)"));

static CHART_WORD: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"\b(chart|graph|visual)"));

/// Classify `text` with the rule table. Returns `None` when no rule matches.
#[must_use]
pub fn classify(text: &str) -> Option<QueryAnalysis> {
    let query = text.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    RULES
        .iter()
        .find(|rule| rule.matches(&query))
        .map(|rule| (rule.build)(&query).with_source(AnalysisSource::Pattern))
}

/// Last-resort keyword heuristics, tried in this order:
/// "list" + "project", "status" + "project", "budget".
#[must_use]
pub fn keyword_fallback(text: &str) -> Option<QueryAnalysis> {
    let query = text.to_lowercase();
    let has = |word: &str| query.contains(word);

    let analysis = if has("list") && has("project") {
        QueryAnalysis::new(Intent::ListProjects)
            .with_tables(&["projects"])
            .with_explanation("Listing projects based on query keywords")
    } else if has("status") && has("project") {
        QueryAnalysis::new(Intent::ProjectStatus)
            .with_tables(&["projects"])
            .with_explanation("Getting project status based on query keywords")
    } else if has("budget") {
        QueryAnalysis::new(Intent::BudgetInfo)
            .with_tables(&["budgets"])
            .with_explanation("Getting budget information based on query keywords")
    } else {
        return None;
    };

    Some(analysis.with_source(AnalysisSource::Keyword))
}

// ── Capture helpers ───────────────────────────────────────────

/// Group 1 of `re` in `query`, trimmed, without a trailing "project".
/// Empty captures count as absent.
fn capture(re: &Regex, query: &str) -> Option<String> {
    let raw = re.captures(query)?.get(1)?.as_str().trim();
    let cleaned = raw
        .strip_suffix(" project")
        .map_or(raw, str::trim_end);
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn with_project(mut analysis: QueryAnalysis, re: &Regex, query: &str) -> QueryAnalysis {
    if let Some(name) = capture(re, query) {
        analysis.filters.insert("project_name", name);
    }
    analysis
}

// ── Rule builders ─────────────────────────────────────────────

fn open_selections(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::ListSelections)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("status", "Open")
        .with_explanation("Listing open selection items");
    with_project(analysis, &FOR_PROJECT, query)
}

fn overdue_selection(query: &str) -> QueryAnalysis {
    let mut analysis = QueryAnalysis::new(Intent::SelectionOverdue)
        .with_tables(&["subphases", "phases", "projects"])
        .with_explanation("Checking how overdue selection items are");
    if let Some(name) = capture(&OVERDUE_SELECTION, query) {
        analysis.filters.insert("selection_name", name);
    }
    with_project(analysis, &FOR_PROJECT, query)
}

fn upcoming_selections(query: &str) -> QueryAnalysis {
    let (number, unit) = NEXT_WINDOW.captures(query).map_or((2, "week".to_string()), |caps| {
        let number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(1);
        (number, caps[2].to_string())
    });
    let plural = if number == 1 { "" } else { "s" };

    let analysis = QueryAnalysis::new(Intent::UpcomingSelections)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("timeframe", json!({"number": number, "unit": unit}))
        .with_explanation(format!("Listing selection items due in the next {number} {unit}{plural}"));
    with_project(analysis, &FOR_PROJECT, query)
}

fn phase_status(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::ProjectPhaseStatus)
        .with_tables(&["projects", "phases", "subphases"])
        .with_explanation("Retrieving the current phase and stage of a project");
    with_project(analysis, &PHASE_PROJECT, query)
}

fn phase_pending_tasks(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::PhasePendingTasks)
        .with_tables(&["projects", "phases", "subphases", "phase_tasks"])
        .with_explanation("Listing remaining tasks in the current phase");
    with_project(analysis, &FOR_PROJECT, query)
}

fn pd_walkthroughs(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::PdWalkthroughsNeeded)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("walkthrough_type", "PD")
        .with_filter("status", "Not Scheduled")
        .with_explanation("Checking for PD walkthroughs that need scheduling");
    with_project(analysis, &FOR_PROJECT, query)
}

fn client_walkthroughs(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::ClientWalkthroughsNeeded)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("walkthrough_type", "Client")
        .with_filter("status", "Not Scheduled")
        .with_explanation("Checking for client walkthroughs that need scheduling");
    with_project(analysis, &FOR_PROJECT, query)
}

fn recent_walkthrough(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::RecentWalkthroughStatus)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("walkthrough_type", "Client")
        .with_explanation("Checking whether the most recent client walkthrough is complete");
    with_project(analysis, &FOR_PROJECT, query)
}

fn trades_needing_po(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::TradesNeedingPo)
        .with_tables(&["subphases", "phases", "projects"])
        .with_explanation("Listing trades that still need purchase orders");
    with_project(analysis, &FOR_PROJECT, query)
}

fn current_payment_milestone(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::CurrentPaymentMilestone)
        .with_tables(&["subphases", "phases", "projects"])
        .with_explanation("Retrieving the current payment milestone of a project");
    with_project(analysis, &MILESTONE_PROJECT, query)
}

fn billable_projects(query: &str) -> QueryAnalysis {
    let relative = if query.contains("next week") { "next" } else { "this" };
    QueryAnalysis::new(Intent::BillableProjects)
        .with_tables(&["subphases", "phases", "projects"])
        .with_filter("status", "Ready for Billing")
        .with_filter("time_period", json!({"relative": relative, "unit": "week"}))
        .with_explanation("Listing projects that can be billed")
}

fn payment_milestone_status(query: &str) -> QueryAnalysis {
    let mut analysis = QueryAnalysis::new(Intent::PaymentMilestoneStatus)
        .with_tables(&["subphases", "phases", "projects"])
        .with_explanation("Checking whether a payment milestone has been issued");

    let number = MILESTONE_NUMBER
        .captures(query)
        .and_then(|c| c[1].parse::<i64>().ok());
    match number {
        Some(n) => analysis.filters.insert("milestone_number", n),
        None => {
            if let Some(name) = capture(&MILESTONE_NAME, query) {
                analysis.filters.insert("milestone_name", name);
            }
        }
    }
    with_project(analysis, &FOR_PROJECT, query)
}

fn team_role(query: &str) -> QueryAnalysis {
    let mut analysis = QueryAnalysis::new(Intent::ProjectDetails)
        .with_tables(&["projects", "users", "leads"]);
    let role = ROLE.captures(query).map(|c| c[1].to_string());
    if let Some(role) = &role {
        analysis.filters.insert("requested_role", role.as_str());
    }
    let analysis = with_project(analysis, &OF_OR_FOR_PROJECT, query);
    let explanation = format!(
        "Getting {} information for project {}",
        role.as_deref().unwrap_or("team"),
        analysis.filters.project_name().unwrap_or("unspecified")
    );
    analysis.with_explanation(explanation)
}

fn project_status(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::ProjectStatus)
        .with_tables(&["projects", "phases"])
        .with_explanation("Getting project status information");
    with_project(analysis, &OF_OR_FOR_PROJECT, query)
}

/// Progress questions are details, unless a chart is asked for.
fn project_progress(query: &str) -> QueryAnalysis {
    let wants_chart = CHART_WORD.is_match(query);
    let intent = if wants_chart { Intent::ProjectStatus } else { Intent::ProjectDetails };

    let mut analysis = QueryAnalysis::new(intent)
        .with_tables(&["projects", "phases"])
        .with_explanation("Getting progress information for a project");
    analysis.generate_chart = wants_chart;
    analysis.chart_type = Some(ChartType::PhaseProgress);
    with_project(analysis, &OF_OR_FOR_PROJECT, query)
}

fn current_task(query: &str) -> QueryAnalysis {
    let analysis = QueryAnalysis::new(Intent::ProjectDetails)
        .with_tables(&["projects", "phases", "subphases"])
        .with_filter("detail_type", "current_task")
        .with_explanation("Getting current subphase and task information");
    with_project(analysis, &FOR_PROJECT, query)
}

fn list_projects(query: &str) -> QueryAnalysis {
    let mut analysis = QueryAnalysis::new(Intent::ListProjects)
        .with_tables(&["projects"])
        .with_explanation("Listing projects with optional status filter");
    if query.contains("active") {
        analysis.filters.insert("status", "active");
    } else if query.contains("completed") {
        analysis.filters.insert("status", "Completed");
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timeframe;

    fn intent_of(text: &str) -> Intent {
        classify(text).map_or(Intent::Unknown, |a| a.intent)
    }

    #[test]
    fn test_phase_question() {
        let analysis = classify("What phase is CABOT-1B in?").unwrap();
        assert_eq!(analysis.intent, Intent::ProjectPhaseStatus);
        assert_eq!(analysis.filters.project_name(), Some("cabot-1b"));
        assert_eq!(analysis.source, AnalysisSource::Pattern);

        let analysis = classify("which stage is the jain project in").unwrap();
        assert_eq!(analysis.filters.project_name(), Some("jain"));
    }

    #[test]
    fn test_rule_order_beats_generic_listing() {
        assert_eq!(
            intent_of("List the open selections for the Cabot project"),
            Intent::ListSelections
        );
        assert_eq!(intent_of("list all projects"), Intent::ListProjects);
        assert_eq!(
            intent_of("show me the current status of all projects"),
            Intent::ProjectStatus
        );
    }

    #[test]
    fn test_open_selections_project_capture() {
        let analysis = classify("What are the open selection items for project Elmgrove?").unwrap();
        assert_eq!(analysis.filters.status(), Some("Open"));
        assert_eq!(analysis.filters.project_name(), Some("elmgrove"));

        let analysis = classify("any open selections").unwrap();
        assert!(analysis.filters.project_name().is_none());
    }

    #[test]
    fn test_upcoming_selection_timeframes() {
        let analysis = classify("which selections are due in the next 3 weeks").unwrap();
        assert_eq!(analysis.intent, Intent::UpcomingSelections);
        assert_eq!(
            analysis.filters.timeframe(),
            Some(Timeframe { number: 3, unit: "week".into() })
        );

        let analysis = classify("selections coming up next week").unwrap();
        assert_eq!(
            analysis.filters.timeframe(),
            Some(Timeframe { number: 1, unit: "week".into() })
        );

        let analysis = classify("selections due in a few weeks").unwrap();
        assert_eq!(
            analysis.filters.timeframe(),
            Some(Timeframe { number: 2, unit: "week".into() })
        );
    }

    #[test]
    fn test_pending_phase_tasks_needs_both_patterns() {
        assert_eq!(
            intent_of("What items need to be completed in the current phase for Jain?"),
            Intent::PhasePendingTasks
        );
        assert_ne!(
            intent_of("What items need to be completed for Jain?"),
            Intent::PhasePendingTasks
        );
    }

    #[test]
    fn test_walkthrough_rules() {
        let analysis = classify("Are there any PD walkthroughs that need scheduling?").unwrap();
        assert_eq!(analysis.intent, Intent::PdWalkthroughsNeeded);
        assert_eq!(analysis.filters.str("walkthrough_type"), Some("PD"));

        assert_eq!(
            intent_of("any client walkthroughs due"),
            Intent::ClientWalkthroughsNeeded
        );
        let analysis = classify("Was the last client walkthrough completed for McKiernan?").unwrap();
        assert_eq!(analysis.intent, Intent::RecentWalkthroughStatus);
        assert_eq!(analysis.filters.project_name(), Some("mckiernan"));
    }

    #[test]
    fn test_procurement_rules() {
        assert_eq!(
            intent_of("What still needs to be bought for Cabot?"),
            Intent::TradesNeedingPo
        );
        assert_eq!(
            intent_of("Which trades are missing a PO?"),
            Intent::TradesNeedingPo
        );
    }

    #[test]
    fn test_payment_milestone_rules() {
        let analysis = classify("What payment milestone is CABOT-1B currently at?").unwrap();
        assert_eq!(analysis.intent, Intent::CurrentPaymentMilestone);
        assert_eq!(analysis.filters.project_name(), Some("cabot-1b"));

        let analysis = classify("Has payment milestone #3 been invoiced for Jain?").unwrap();
        assert_eq!(analysis.intent, Intent::PaymentMilestoneStatus);
        assert_eq!(analysis.filters.milestone_number(), Some(3));
        assert!(!analysis.filters.contains("milestone_name"));
        assert_eq!(analysis.filters.project_name(), Some("jain"));

        let analysis = classify("Has payment milestone framing complete been issued?").unwrap();
        assert_eq!(analysis.filters.str("milestone_name"), Some("framing complete"));
        assert!(analysis.filters.milestone_number().is_none());

        let analysis = classify("Which projects can we bill this week?").unwrap();
        assert_eq!(analysis.intent, Intent::BillableProjects);
        assert_eq!(analysis.filters.status(), Some("Ready for Billing"));
    }

    #[test]
    fn test_generic_project_rules() {
        let analysis = classify("Who is the designer for the Cabot project?").unwrap();
        assert_eq!(analysis.intent, Intent::ProjectDetails);
        assert_eq!(analysis.filters.str("requested_role"), Some("designer"));
        assert_eq!(analysis.filters.project_name(), Some("cabot"));

        let analysis = classify("What's the status of Jain?").unwrap();
        assert_eq!(analysis.intent, Intent::ProjectStatus);
        assert_eq!(analysis.filters.project_name(), Some("jain"));

        let analysis = classify("show the progress of elmgrove").unwrap();
        assert_eq!(analysis.intent, Intent::ProjectDetails);
        assert!(!analysis.generate_chart);

        let analysis = classify("chart the progress of elmgrove").unwrap();
        assert_eq!(analysis.intent, Intent::ProjectStatus);
        assert!(analysis.generate_chart);
        assert_eq!(analysis.chart_type, Some(ChartType::PhaseProgress));
    }

    #[test]
    fn test_list_projects_status() {
        let analysis = classify("list active projects").unwrap();
        assert_eq!(analysis.filters.status(), Some("active"));
        let analysis = classify("get completed projects").unwrap();
        assert_eq!(analysis.filters.status(), Some("Completed"));
    }

    #[test]
    fn test_no_rule_matches() {
        assert!(classify("hello there").is_none());
        assert!(classify("   ").is_none());
    }

    #[test]
    fn test_keyword_fallback_order() {
        assert_eq!(
            keyword_fallback("can you list every project status").unwrap().intent,
            Intent::ListProjects
        );
        assert_eq!(
            keyword_fallback("project status please").unwrap().intent,
            Intent::ProjectStatus
        );
        let analysis = keyword_fallback("budget?").unwrap();
        assert_eq!(analysis.intent, Intent::BudgetInfo);
        assert_eq!(analysis.source, AnalysisSource::Keyword);
        assert!(keyword_fallback("good morning").is_none());
    }
}
