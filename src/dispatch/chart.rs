//! Chart payloads.
//!
//! Rendering happens elsewhere; the dispatcher only describes the chart
//! as JSON and stores the string in `ResultEnvelope::chart`.

use serde::Serialize;

use crate::model::ChartType;
use crate::progress::PhaseInfo;
use crate::model::Budget;

/// Renderer-agnostic chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub chart_type: String,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl ChartPayload {
    fn single(kind: &str, title: String, name: &str, points: Vec<(String, f64)>) -> Self {
        let (labels, values) = points.into_iter().unzip();
        Self {
            chart_type: kind.to_string(),
            title,
            labels,
            series: vec![ChartSeries {
                name: name.to_string(),
                values,
            }],
        }
    }

    /// Serialized form, `None` when there is nothing to plot.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }
}

/// Phase progress as a bar chart, or a line chart when asked for.
pub(crate) fn phase_progress(
    project_name: &str,
    info: &PhaseInfo,
    requested: Option<&ChartType>,
) -> ChartPayload {
    let kind = match requested {
        Some(ChartType::Line) => "line",
        _ => "bar",
    };
    ChartPayload::single(
        kind,
        format!("Phase progress for {project_name}"),
        "Progress (%)",
        info.phases
            .iter()
            .map(|p| (p.name.clone(), p.progress))
            .collect(),
    )
}

/// One project's budget split.
pub(crate) fn budget_breakdown(project_name: &str, budget: &Budget) -> ChartPayload {
    ChartPayload::single(
        "pie",
        format!("Budget for {project_name}"),
        budget.currency.as_str(),
        vec![
            ("Total Budget".to_string(), budget.total_budget),
            ("Spent".to_string(), budget.spent),
            ("Remaining".to_string(), budget.remaining()),
        ],
    )
}

/// Total budget per project.
pub(crate) fn budget_overview(budgets: &[(String, Budget)]) -> ChartPayload {
    ChartPayload::single(
        "bar",
        "Project Budgets".to_string(),
        "Total Budget",
        budgets
            .iter()
            .map(|(name, b)| (name.clone(), b.total_budget))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_breakdown_slices() {
        let budget = Budget {
            project_id: "p".into(),
            total_budget: 100.0,
            spent: 30.0,
            currency: "USD".into(),
        };
        let chart = budget_breakdown("CABOT-1B", &budget);
        assert_eq!(chart.chart_type, "pie");
        assert_eq!(chart.labels, vec!["Total Budget", "Spent", "Remaining"]);
        assert_eq!(chart.series[0].values, vec![100.0, 30.0, 70.0]);

        let rendered = chart.render().unwrap();
        assert!(rendered.contains("\"title\":\"Budget for CABOT-1B\""));
    }

    #[test]
    fn test_empty_chart_does_not_render() {
        let chart = phase_progress("X", &PhaseInfo::default(), None);
        assert!(chart.render().is_none());
        assert_eq!(phase_progress("X", &PhaseInfo::default(), Some(&ChartType::Line)).chart_type, "line");
    }
}
