//! Entity extraction.
//!
//! Adds structured filters found in the raw text to an analysis. A filter
//! is only added when the analysis does not already carry that key, so
//! values supplied by the oracle always win.

use regex::{Regex, RegexBuilder};
use serde_json::json;
use std::sync::LazyLock;

use super::literal_regex;
use crate::model::{ChartType, QueryAnalysis};

/// Project codes recognised without any configuration.
pub const DEFAULT_PROJECT_CODES: [&str; 4] = ["CABOT-1B", "JAIN-1B", "ELMGROVE-1B", "MCKIERNAN-1B"];

/// Date formats, in priority order: `MM/DD/YYYY`, `MM-DD-YYYY`, `YYYY-MM-DD`.
static DATE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        literal_regex(r"\b(\d{1,2}/\d{1,2}/\d{4})\b"),
        literal_regex(r"\b(\d{1,2}-\d{1,2}-\d{4})\b"),
        literal_regex(r"\b(\d{4}-\d{1,2}-\d{1,2})\b"),
    ]
});

static TIME_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?i)\b(this|next|last) (week|month|quarter|year)\b"));

static STATUS_WORD: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"(?i)\b(completed|in progress|todo|pending|active|done)\b")
});

static CHART_WORD: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"(?i)\b(chart|graph|visual)"));

static CHART_KIND: LazyLock<[(Regex, ChartType); 5]> = LazyLock::new(|| {
    [
        (literal_regex(r"(?i)\bbar\b"), ChartType::Bar),
        (literal_regex(r"(?i)\bpie\b"), ChartType::Pie),
        (literal_regex(r"(?i)\bline\b"), ChartType::Line),
        (literal_regex(r"(?i)\bprogress\b"), ChartType::PhaseProgress),
        (literal_regex(r"(?i)\bbudget\b"), ChartType::Budget),
    ]
});

static COMPARISON_WORD: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?i)\b(compare|comparison|versus|vs)\b"));

/// Regex-driven filter enrichment.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    project_code: Option<Regex>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl EntityExtractor {
    /// Build an extractor recognising the built-in project codes plus `extra_codes`.
    #[must_use]
    pub fn new(extra_codes: &[String]) -> Self {
        let mut codes: Vec<String> = DEFAULT_PROJECT_CODES.iter().map(|c| (*c).to_string()).collect();
        for code in extra_codes {
            let code = code.trim().to_uppercase();
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }

        // Longest first so a code never shadows a longer one it prefixes.
        codes.sort_by_key(|c| std::cmp::Reverse(c.len()));
        let alternation = codes.iter().map(|c| regex::escape(c)).collect::<Vec<_>>().join("|");
        let project_code = RegexBuilder::new(&format!(r"\b({alternation})\b"))
            .case_insensitive(true)
            .build()
            .ok();

        Self { project_code }
    }

    /// First known project code in `text`, upper-cased.
    #[must_use]
    pub fn project_code(&self, text: &str) -> Option<String> {
        self.project_code
            .as_ref()?
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    /// Enrich `analysis` with filters found in `text`.
    #[must_use]
    pub fn enrich(&self, mut analysis: QueryAnalysis, text: &str) -> QueryAnalysis {
        let filters = &mut analysis.filters;

        if let Some(code) = self.project_code(text) {
            filters.insert_if_absent("project_id", code);
        }

        if let Some(date) = DATE_PATTERNS
            .iter()
            .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        {
            filters.insert_if_absent("date", date.as_str());
        }

        if let Some(caps) = TIME_PERIOD.captures(text) {
            filters.insert_if_absent(
                "time_period",
                json!({
                    "relative": caps[1].to_lowercase(),
                    "unit": caps[2].to_lowercase(),
                }),
            );
        }

        if let Some(caps) = STATUS_WORD.captures(text) {
            filters.insert_if_absent("status", title_case(&caps[1]));
        }

        if CHART_WORD.is_match(text) {
            analysis.generate_chart = true;
            if analysis.chart_type.is_none() {
                let kind = CHART_KIND
                    .iter()
                    .find(|(re, _)| re.is_match(text))
                    .map_or(ChartType::PhaseProgress, |(_, kind)| kind.clone());
                analysis.chart_type = Some(kind);
            }
        }

        if COMPARISON_WORD.is_match(text) {
            analysis.comparison = true;
        }

        analysis
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Intent, TimePeriod};

    fn enrich(text: &str) -> QueryAnalysis {
        EntityExtractor::default().enrich(QueryAnalysis::new(Intent::Unknown), text)
    }

    #[test]
    fn test_project_code_is_uppercased() {
        let analysis = enrich("what phase is cabot-1b in?");
        assert_eq!(analysis.filters.project_id(), Some("CABOT-1B"));
    }

    #[test]
    fn test_configured_codes_are_recognised() {
        let extractor = EntityExtractor::new(&["oak-2a".to_string()]);
        assert_eq!(extractor.project_code("Budget for OAK-2A please").as_deref(), Some("OAK-2A"));
        assert_eq!(extractor.project_code("status of jain-1b").as_deref(), Some("JAIN-1B"));
        assert_eq!(extractor.project_code("status of oak"), None);
    }

    #[test]
    fn test_oracle_values_are_not_overwritten() {
        let analysis = QueryAnalysis::new(Intent::ProjectStatus)
            .with_filter("project_id", "ELMGROVE-1B")
            .with_filter("status", "Review");
        let enriched = EntityExtractor::default().enrich(analysis, "is JAIN-1B completed?");
        assert_eq!(enriched.filters.project_id(), Some("ELMGROVE-1B"));
        assert_eq!(enriched.filters.status(), Some("Review"));
    }

    #[test]
    fn test_date_format_priority() {
        let analysis = enrich("anything due 2024-03-01 or 04/15/2024?");
        assert_eq!(analysis.filters.str("date"), Some("04/15/2024"));

        let analysis = enrich("due on 2024-03-01");
        assert_eq!(analysis.filters.str("date"), Some("2024-03-01"));
    }

    #[test]
    fn test_time_period_is_structured() {
        let analysis = enrich("What is due Next Month?");
        assert_eq!(
            analysis.filters.time_period(),
            Some(TimePeriod { relative: "next".into(), unit: "month".into() })
        );
    }

    #[test]
    fn test_status_is_title_cased() {
        assert_eq!(enrich("show in progress projects").filters.status(), Some("In Progress"));
        assert_eq!(enrich("list DONE items").filters.status(), Some("Done"));
        assert_eq!(enrich("undone work").filters.status(), None);
    }

    #[test]
    fn test_chart_detection() {
        let analysis = enrich("show a pie chart of the budget");
        assert!(analysis.generate_chart);
        assert_eq!(analysis.chart_type, Some(ChartType::Pie));

        let analysis = enrich("visualize the schedule");
        assert!(analysis.generate_chart);
        assert_eq!(analysis.chart_type, Some(ChartType::PhaseProgress));

        let analysis = enrich("what is the budget");
        assert!(!analysis.generate_chart);
        assert_eq!(analysis.chart_type, None);
    }

    #[test]
    fn test_comparison_flag() {
        assert!(enrich("compare CABOT-1B vs JAIN-1B").comparison);
        assert!(!enrich("canvas survey").comparison);
    }
}
