//! Oracle prompt text.

use crate::model::ConversationContext;

/// Longest schema summary sent to the oracle, in characters.
pub const MAX_SCHEMA_CHARS: usize = 4000;

/// System prompt for query classification.
pub const QUERY_ANALYSIS_PROMPT: &str = r#"You classify questions about residential construction projects so that a
program can look up the answer in a database.

Reply with exactly one JSON object and nothing else:
{
  "intent": "<one intent name from the list below, or \"unknown\">",
  "tables": ["tables the answer needs"],
  "filters": {
    "project_id": "<project code such as CABOT-1B, if mentioned>",
    "project_name": "<project name as written, if mentioned>",
    "search_term": "<text to search for, for search intents>",
    "status": "<status word, if the question filters by status>",
    "milestone_number": <payment milestone number, if mentioned>,
    "milestone_name": "<payment milestone name, if mentioned>",
    "time_period": {"relative": "this|next|last", "unit": "week|month|quarter|year"}
  },
  "generate_chart": <true if the user asks for a chart, graph or visual>,
  "chart_type": "<bar|pie|line|phase_progress|budget, or null>",
  "explanation": "<one short sentence>"
}
Omit filters that do not apply. Never invent project codes.

Intents:

General project
- list_projects: list projects, optionally by status
- project_details: everything about one project, including team and current phase
- project_status: status and phase progress of one project
- budget_info: budget, spend and remaining budget of one project or all projects
- project_tasks: tasks of a project
- project_timeline: start date, phase dates and milestones of a project
- project_milestones: milestones of a project
- project_team: designer, developer and client of a project
- project_issues: open and resolved issues of a project
- project_documents: documents attached to a project
- search_projects: find projects whose name matches a search term
- general_search: search projects, tasks, issues and documents for a term
- generate_report: full report on one project

Selections (finish and fixture choices the client must make)
- list_selections: open selection items, optionally for one project
- selection_overdue: how overdue selection items are
- upcoming_selections: selection items due soon

Phases
- project_phase_status: which phase and stage a project is in
- phase_pending_tasks: items still needed to finish the current phase

Walkthroughs
- pd_walkthroughs_needed: PD walkthroughs that still need scheduling
- client_walkthroughs_needed: client walkthroughs that still need scheduling
- recent_walkthrough_status: whether the latest client walkthrough is complete

Procurement
- trades_needing_po: trades that still need a purchase order

Financial
- current_payment_milestone: which payment milestone a project is at
- billable_projects: projects with a milestone ready for billing
- payment_milestone_status: whether a given payment milestone has been issued
"#;

/// Build the user prompt: the question, a truncated schema summary and,
/// when present, the previous turn of the conversation.
#[must_use]
pub fn build_user_prompt(
    text: &str,
    schema_summary: &str,
    context: Option<&ConversationContext>,
) -> String {
    let schema: String = schema_summary.chars().take(MAX_SCHEMA_CHARS).collect();
    let mut prompt = format!("User query: {}\n\nDatabase schema summary:\n{schema}", text.trim());

    if let Some(ctx) = context {
        prompt.push_str("\n\nConversation context:\n");
        prompt.push_str(&ctx.to_prompt_json().to_string());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Intent, QueryAnalysis};

    #[test]
    fn test_prompt_lists_every_supported_intent() {
        for intent in &Intent::SUPPORTED {
            assert!(
                QUERY_ANALYSIS_PROMPT.contains(&format!("- {}:", intent.as_str())),
                "prompt is missing {intent}"
            );
        }
    }

    #[test]
    fn test_schema_is_truncated() {
        let schema = "x".repeat(MAX_SCHEMA_CHARS * 2);
        let prompt = build_user_prompt("hi", &schema, None);
        assert!(prompt.len() < MAX_SCHEMA_CHARS + 100);
        assert!(!prompt.contains("Conversation context"));
    }

    #[test]
    fn test_context_is_appended() {
        let analysis = QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_id", "JAIN-1B");
        let ctx = ConversationContext::from_analysis(&analysis);
        let prompt = build_user_prompt("and the budget?", "Table: projects", Some(&ctx));
        assert!(prompt.starts_with("User query: and the budget?"));
        assert!(prompt.contains("Conversation context:"));
        assert!(prompt.contains("JAIN-1B"));
    }
}
