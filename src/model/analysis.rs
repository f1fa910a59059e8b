//! Structured form of a user question.
//!
//! A [`QueryAnalysis`] is built fresh for every question by the intent
//! resolver and consumed by the dispatcher. It is never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Intent ────────────────────────────────────────────────────

/// Classified purpose of a question.
///
/// Unrecognised intent strings are kept as [`Intent::Unsupported`] so the
/// dispatcher can report them by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    // General project
    ListProjects,
    ProjectDetails,
    ProjectStatus,
    BudgetInfo,
    ProjectTasks,
    ProjectTimeline,
    ProjectMilestones,
    ProjectTeam,
    ProjectIssues,
    ProjectDocuments,
    SearchProjects,
    GeneralSearch,
    GenerateReport,

    // Selections
    ListSelections,
    SelectionOverdue,
    UpcomingSelections,

    // Phases
    ProjectPhaseStatus,
    PhasePendingTasks,

    // Walkthroughs
    PdWalkthroughsNeeded,
    ClientWalkthroughsNeeded,
    RecentWalkthroughStatus,

    // Procurement
    TradesNeedingPo,

    // Financial
    CurrentPaymentMilestone,
    BillableProjects,
    PaymentMilestoneStatus,

    Unknown,
    Unsupported(String),
}

impl Intent {
    /// Every intent the dispatcher has a handler for.
    pub const SUPPORTED: [Self; 25] = [
        Self::ListProjects,
        Self::ProjectDetails,
        Self::ProjectStatus,
        Self::BudgetInfo,
        Self::ProjectTasks,
        Self::ProjectTimeline,
        Self::ProjectMilestones,
        Self::ProjectTeam,
        Self::ProjectIssues,
        Self::ProjectDocuments,
        Self::SearchProjects,
        Self::GeneralSearch,
        Self::GenerateReport,
        Self::ListSelections,
        Self::SelectionOverdue,
        Self::UpcomingSelections,
        Self::ProjectPhaseStatus,
        Self::PhasePendingTasks,
        Self::PdWalkthroughsNeeded,
        Self::ClientWalkthroughsNeeded,
        Self::RecentWalkthroughStatus,
        Self::TradesNeedingPo,
        Self::CurrentPaymentMilestone,
        Self::BillableProjects,
        Self::PaymentMilestoneStatus,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ListProjects => "list_projects",
            Self::ProjectDetails => "project_details",
            Self::ProjectStatus => "project_status",
            Self::BudgetInfo => "budget_info",
            Self::ProjectTasks => "project_tasks",
            Self::ProjectTimeline => "project_timeline",
            Self::ProjectMilestones => "project_milestones",
            Self::ProjectTeam => "project_team",
            Self::ProjectIssues => "project_issues",
            Self::ProjectDocuments => "project_documents",
            Self::SearchProjects => "search_projects",
            Self::GeneralSearch => "general_search",
            Self::GenerateReport => "generate_report",
            Self::ListSelections => "list_selections",
            Self::SelectionOverdue => "selection_overdue",
            Self::UpcomingSelections => "upcoming_selections",
            Self::ProjectPhaseStatus => "project_phase_status",
            Self::PhasePendingTasks => "phase_pending_tasks",
            Self::PdWalkthroughsNeeded => "pd_walkthroughs_needed",
            Self::ClientWalkthroughsNeeded => "client_walkthroughs_needed",
            Self::RecentWalkthroughStatus => "recent_walkthrough_status",
            Self::TradesNeedingPo => "trades_needing_po",
            Self::CurrentPaymentMilestone => "current_payment_milestone",
            Self::BillableProjects => "billable_projects",
            Self::PaymentMilestoneStatus => "payment_milestone_status",
            Self::Unknown => "unknown",
            Self::Unsupported(raw) => raw,
        }
    }

    /// Parse an intent name. Blank input is `Unknown`; anything
    /// unrecognised is preserved as `Unsupported`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() || normalized == "unknown" {
            return Self::Unknown;
        }
        Self::SUPPORTED
            .iter()
            .find(|intent| intent.as_str() == normalized)
            .cloned()
            .unwrap_or_else(|| Self::Unsupported(s.trim().to_string()))
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Intent {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_str().to_string()
    }
}

// ── Chart type ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    PhaseProgress,
    Budget,
    Other(String),
}

impl ChartType {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bar" => Self::Bar,
            "pie" => Self::Pie,
            "line" => Self::Line,
            "phase_progress" | "progress" => Self::PhaseProgress,
            "budget" => Self::Budget,
            _ => Self::Other(s.trim().to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::PhaseProgress => "phase_progress",
            Self::Budget => "budget",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ChartType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ChartType> for String {
    fn from(c: ChartType) -> Self {
        c.as_str().to_string()
    }
}

// ── Filter values ─────────────────────────────────────────────

/// Relative time window, e.g. "next month". Not resolved to dates here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub relative: String,
    pub unit: String,
}

impl TimePeriod {
    /// Length of the window in days, for forward-looking queries.
    #[must_use]
    pub fn span_days(&self) -> i64 {
        let unit = self.unit.trim().to_lowercase();
        match unit.trim_end_matches('s') {
            "day" => 1,
            "week" => 7,
            "month" => 30,
            "quarter" => 91,
            "year" => 365,
            _ => 14,
        }
    }
}

/// Explicit look-ahead window, e.g. "next 3 weeks".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub number: u32,
    pub unit: String,
}

impl Timeframe {
    #[must_use]
    pub fn days(&self) -> i64 {
        let n = i64::from(self.number);
        if self.unit.starts_with("week") { n * 7 } else { n }
    }
}

/// Filter mapping of a [`QueryAnalysis`].
///
/// Keys are open-ended; typed accessors tolerate missing keys and
/// loosely typed values (numbers written as strings and so on).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, dropping `null` and `"null"` entries.
    #[must_use]
    pub fn from_json_object(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, v)| !is_null_like(v))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Insert only when `key` is absent. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        self.0.insert(key.to_string(), value.into());
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Non-blank string value, trimmed.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.str("project_id")
    }

    #[must_use]
    pub fn project_name(&self) -> Option<&str> {
        self.str("project_name")
    }

    /// `project_id` if present, else `project_name`.
    #[must_use]
    pub fn project_reference(&self) -> Option<&str> {
        self.project_id().or_else(|| self.project_name())
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.str("status")
    }

    /// Integer value, also accepting numeric strings like `"3"` or `"#3"`.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn milestone_number(&self) -> Option<i64> {
        self.integer("milestone_number")
    }

    /// Structured `time_period`, also accepting the "next week" string form.
    #[must_use]
    pub fn time_period(&self) -> Option<TimePeriod> {
        match self.0.get("time_period")? {
            Value::String(s) => {
                let mut parts = s.split_whitespace();
                let relative = parts.next()?.to_lowercase();
                let unit = parts.next()?.trim_end_matches('s').to_lowercase();
                Some(TimePeriod { relative, unit })
            }
            v => serde_json::from_value(v.clone()).ok(),
        }
    }

    #[must_use]
    pub fn timeframe(&self) -> Option<Timeframe> {
        self.0
            .get("timeframe")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn is_null_like(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().eq_ignore_ascii_case("null"),
        _ => false,
    }
}

// ── QueryAnalysis ─────────────────────────────────────────────

/// Which resolution tier produced an analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Oracle,
    Pattern,
    Keyword,
    #[default]
    Unknown,
}

/// Structured analysis of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    #[serde(default)]
    pub tables: BTreeSet<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub generate_chart: bool,
    #[serde(default)]
    pub chart_type: Option<ChartType>,
    #[serde(default)]
    pub comparison: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub source: AnalysisSource,
}

impl QueryAnalysis {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            tables: BTreeSet::new(),
            filters: Filters::new(),
            generate_chart: false,
            chart_type: None,
            comparison: false,
            explanation: String::new(),
            source: AnalysisSource::Unknown,
        }
    }

    /// The terminal "could not classify" result.
    pub fn unknown(explanation: impl Into<String>) -> Self {
        Self::new(Intent::Unknown).with_explanation(explanation)
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|t| (*t).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: AnalysisSource) -> Self {
        self.source = source;
        self
    }

    /// Read an oracle reply leniently.
    ///
    /// Any JSON object is accepted: a missing `intent` becomes `unknown`,
    /// `tables` may be a list or a single string, and null-valued filters
    /// are dropped. Returns `None` for non-object values.
    #[must_use]
    pub fn from_oracle_value(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };

        let intent = obj
            .get("intent")
            .and_then(Value::as_str)
            .map_or(Intent::Unknown, Intent::parse);

        let tables = match obj.remove("tables") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                std::iter::once(s.trim().to_string()).collect()
            }
            _ => BTreeSet::new(),
        };

        let filters = match obj.remove("filters") {
            Some(Value::Object(map)) => Filters::from_json_object(map),
            _ => Filters::new(),
        };

        let generate_chart = match obj.get("generate_chart") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        let chart_type = obj
            .get("chart_type")
            .filter(|v| !is_null_like(v))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(ChartType::parse);

        let comparison = obj
            .get("comparison")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let explanation = obj
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            intent,
            tables,
            filters,
            generate_chart,
            chart_type,
            comparison,
            explanation,
            source: AnalysisSource::Oracle,
        })
    }
}
