//! Run an operation from a hand-built analysis.

use super::{open_storage, print_envelope};
use crate::cli::RunArgs;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::model::{ChartType, Intent, QueryAnalysis};
use serde_json::Value;
use std::path::PathBuf;

/// Parse `key=value`. Values that read as JSON (numbers, booleans,
/// objects) keep that type; anything else is a string.
fn parse_filter(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("Invalid filter '{raw}': expected key=value")))?;

    let value = serde_json::from_str::<Value>(value)
        .ok()
        .filter(|v| !v.is_string())
        .unwrap_or_else(|| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Build the analysis described by the arguments.
///
/// # Errors
///
/// Returns an error if a filter is malformed.
pub fn build_analysis(args: &RunArgs) -> Result<QueryAnalysis> {
    let mut analysis = QueryAnalysis::new(Intent::parse(&args.intent));
    for raw in &args.filters {
        let (key, value) = parse_filter(raw)?;
        analysis.filters.insert(&key, value);
    }
    analysis.generate_chart = args.chart;
    analysis.chart_type = args.chart_type.as_deref().map(ChartType::parse);
    Ok(analysis)
}

/// Execute `sq run`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a filter is
/// malformed.
pub fn execute(args: &RunArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let analysis = build_analysis(args)?;
    let storage = open_storage(db_path)?;
    let envelope = Dispatcher::new(&storage).execute(&analysis);
    print_envelope(&envelope, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(intent: &str, filters: &[&str]) -> RunArgs {
        RunArgs {
            intent: intent.to_string(),
            filters: filters.iter().map(|f| (*f).to_string()).collect(),
            chart: false,
            chart_type: None,
        }
    }

    #[test]
    fn test_filters_keep_json_types() {
        let analysis = build_analysis(&args(
            "upcoming_selections",
            &["project_name=CABOT-1B", "milestone_number=2", r#"timeframe={"number":3,"unit":"weeks"}"#],
        ))
        .unwrap();

        assert_eq!(analysis.intent, Intent::UpcomingSelections);
        assert_eq!(analysis.filters.project_name(), Some("CABOT-1B"));
        assert_eq!(analysis.filters.get("milestone_number"), Some(&json!(2)));
        assert_eq!(analysis.filters.timeframe().unwrap().days(), 21);
    }

    #[test]
    fn test_malformed_filter_is_rejected() {
        let result = build_analysis(&args("budget_info", &["project_name"]));
        assert!(matches!(result, Err(Error::InvalidArgument(msg)) if msg.contains("filter")));

        let result = build_analysis(&args("budget_info", &["=x"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_intent_is_preserved() {
        let analysis = build_analysis(&args("project_resources", &[])).unwrap();
        assert_eq!(analysis.intent.as_str(), "project_resources");
    }
}
